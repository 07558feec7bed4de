//! Request-level negotiation.
//!
//! A [`Negotiator`] runs one round of the UMA grant:
//!
//! ```text
//! no-ticket ──initialize──┐
//!                         ├─> claims folded in ─> resolve ─┬─> resolved (token)
//! ticket ──take (1 use)───┘                                ├─> need_info (new ticket)
//!                                                          └─> denied
//! ```
//!
//! [`BaseNegotiator`] issues tokens over the granted permissions;
//! [`ContractNegotiator`] additionally binds them to an agreement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::Permission;
use crate::verifier::ClaimToken;

pub mod base;
pub mod contract;

pub use base::BaseNegotiator;
pub use contract::{
    Constraint, Contract, ContractNegotiator, ContractPermission, ContractStore,
    InMemoryContractStore,
};

/// Claim tokens as they appear in a token request.
///
/// Either one token whose format sits in the sibling `claim_token_format`
/// field, or a list of self-describing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimTokens {
    /// A single token.
    Single(String),
    /// Several tokens, each with its own format.
    Many(Vec<ClaimToken>),
}

/// A token request.
///
/// Exactly one of `ticket` and `permissions` must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationInput {
    /// Ticket returned by an earlier `need_info` round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,

    /// Pushed claim tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<ClaimTokens>,

    /// Format of a single `claim_token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token_format: Option<String>,

    /// Permissions of a fresh request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<Permission>>,

    /// Space-separated scope string. Accepted but not used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl NegotiationInput {
    /// A fresh request for `permissions`.
    #[must_use]
    pub fn for_permissions(permissions: Vec<Permission>) -> Self {
        Self {
            permissions: Some(permissions),
            ..Default::default()
        }
    }

    /// A follow-up request on `ticket`.
    #[must_use]
    pub fn for_ticket(ticket: impl Into<String>) -> Self {
        Self {
            ticket: Some(ticket.into()),
            ..Default::default()
        }
    }

    /// Appends a claim token.
    #[must_use]
    pub fn with_claim_token(mut self, token: impl Into<String>, format: impl Into<String>) -> Self {
        let token = ClaimToken::new(token, format);
        self.claim_token = match self.claim_token.take() {
            None => Some(ClaimTokens::Many(vec![token])),
            Some(ClaimTokens::Many(mut tokens)) => {
                tokens.push(token);
                Some(ClaimTokens::Many(tokens))
            }
            Some(ClaimTokens::Single(single)) => {
                let first = ClaimToken::new(single, self.claim_token_format.take().unwrap_or_default());
                Some(ClaimTokens::Many(vec![first, token]))
            }
        };
        self
    }

    /// Parses a request body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if the body has the wrong shape.
    pub fn from_json(body: Value) -> AuthResult<Self> {
        let input: Self = serde_json::from_value(body)
            .map_err(|e| AuthError::invalid_request(format!("Malformed token request: {}", e)))?;
        input.validate()?;
        Ok(input)
    }

    /// Checks the request discriminator and claim token pairing.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] describing the first problem.
    pub fn validate(&self) -> AuthResult<()> {
        match (&self.ticket, &self.permissions) {
            (Some(_), Some(_)) => {
                return Err(AuthError::invalid_request(
                    "A request carries either a ticket or permissions, not both",
                ));
            }
            (None, None) => {
                return Err(AuthError::invalid_request(
                    "A request needs a ticket or permissions",
                ));
            }
            (None, Some(permissions)) if permissions.is_empty() => {
                return Err(AuthError::invalid_request("No permissions requested"));
            }
            _ => {}
        }

        self.claim_tokens().map(|_| ())
    }

    /// The claim tokens in push order.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRequest`] if a single token has no format.
    pub fn claim_tokens(&self) -> AuthResult<Vec<ClaimToken>> {
        match &self.claim_token {
            None => Ok(Vec::new()),
            Some(ClaimTokens::Many(tokens)) => Ok(tokens.clone()),
            Some(ClaimTokens::Single(token)) => {
                let format = self.claim_token_format.as_ref().ok_or_else(|| {
                    AuthError::invalid_request("claim_token requires claim_token_format")
                })?;
                Ok(vec![ClaimToken::new(token.clone(), format.clone())])
            }
        }
    }
}

/// A successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationResponse {
    /// The issued access token.
    pub access_token: String,

    /// The token type.
    pub token_type: String,

    /// Synthetic id under which a downstream server can request derivation
    /// access to the granted resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_resource_id: Option<String>,
}

/// Runs negotiation rounds.
#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Runs one round for `input`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRequest`] for malformed input
    /// - [`AuthError::InvalidTicket`] for unknown, expired or consumed tickets
    /// - [`AuthError::NeedInfo`] when more claims could still help
    /// - [`AuthError::RequestDenied`] when nothing could help
    /// - collaborator errors as they occur
    async fn negotiate(&self, input: NegotiationInput) -> AuthResult<NegotiationResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_claim_token() {
        let input = NegotiationInput::from_json(json!({
            "ticket": "t1",
            "claim_token": "https://alice",
            "claim_token_format": "urn:solidlab:uma:claims:formats:webid",
        }))
        .unwrap();

        let tokens = input.claim_tokens().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, "https://alice");
    }

    #[test]
    fn test_claim_token_list() {
        let input = NegotiationInput::from_json(json!({
            "permissions": [{ "resource_id": "r1", "resource_scopes": ["read"] }],
            "claim_token": [
                { "claim_token": "a", "claim_token_format": "f1" },
                { "claim_token": "b", "claim_token_format": "f2" },
            ],
            "scope": "read",
        }))
        .unwrap();

        let formats: Vec<_> = input
            .claim_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.format)
            .collect();
        assert_eq!(formats, vec!["f1", "f2"]);
    }

    #[test]
    fn test_discriminator_required() {
        for body in [
            json!({}),
            json!({ "ticket": "t1", "permissions": [] }),
            json!({ "permissions": [] }),
        ] {
            assert!(matches!(
                NegotiationInput::from_json(body),
                Err(AuthError::InvalidRequest { .. })
            ));
        }
    }

    #[test]
    fn test_wrong_types_rejected() {
        let result = NegotiationInput::from_json(json!({ "ticket": 42 }));
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[test]
    fn test_single_token_needs_format() {
        let result = NegotiationInput::from_json(json!({ "ticket": "t1", "claim_token": "x" }));
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }

    #[test]
    fn test_builder_accumulates_tokens() {
        let input = NegotiationInput::for_ticket("t1")
            .with_claim_token("a", "f1")
            .with_claim_token("b", "f2");
        assert_eq!(input.claim_tokens().unwrap().len(), 2);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_response_omits_missing_derivation_id() {
        let response = NegotiationResponse {
            access_token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            derivation_resource_id: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "access_token": "tok", "token_type": "Bearer" })
        );
    }
}
