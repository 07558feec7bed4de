//! The base negotiator.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::{AuthError, RequiredClaims};
use crate::negotiator::{NegotiationInput, NegotiationResponse, Negotiator};
use crate::storage::TicketStore;
use crate::strategy::TicketingStrategy;
use crate::token::{AccessToken, TokenFactory};
use crate::types::{MissingClaims, Outcome, Permission, Ticket, scopes};
use crate::verifier::Verifier;

/// A ticket that resolved, with what it resolved to.
pub(crate) struct Resolved {
    pub(crate) ticket: Ticket,
    pub(crate) granted: Vec<Permission>,
}

/// Negotiator issuing a token over the granted permissions.
pub struct BaseNegotiator {
    verifier: Arc<dyn Verifier>,
    tickets: Arc<dyn TicketStore>,
    strategy: Arc<dyn TicketingStrategy>,
    tokens: Arc<dyn TokenFactory>,
}

impl BaseNegotiator {
    /// Creates a negotiator from its collaborators.
    #[must_use]
    pub fn new(
        verifier: Arc<dyn Verifier>,
        tickets: Arc<dyn TicketStore>,
        strategy: Arc<dyn TicketingStrategy>,
        tokens: Arc<dyn TokenFactory>,
    ) -> Self {
        Self {
            verifier,
            tickets,
            strategy,
            tokens,
        }
    }

    /// Runs the round up to resolution.
    ///
    /// Fails with `NeedInfo` or `RequestDenied` when the ticket does not
    /// resolve.
    pub(crate) async fn resolve(&self, input: &NegotiationInput) -> AuthResult<Resolved> {
        input.validate()?;
        let claim_tokens = input.claim_tokens()?;

        if let Some(scope) = &input.scope {
            tracing::debug!(scope = %scope, "Ignoring scope parameter");
        }

        let mut ticket = match (&input.ticket, &input.permissions) {
            (Some(id), _) => self.tickets.take(id).await?.ok_or_else(|| {
                tracing::debug!(ticket = %id, "Unknown or consumed ticket");
                AuthError::invalid_ticket("The provided ticket is not valid.")
            })?,
            (None, Some(permissions)) => {
                self.strategy.initialize_ticket(permissions.clone()).await?
            }
            (None, None) => {
                return Err(AuthError::invalid_request("A request needs a ticket or permissions"));
            }
        };

        for claim_token in &claim_tokens {
            let claims = self.verifier.verify(claim_token).await.inspect_err(|e| {
                tracing::warn!(format = %claim_token.format, error = %e, "Claim verification failed");
            })?;
            self.strategy.validate_claims(&mut ticket, &claims).await?;
        }

        match self.strategy.resolve_ticket(&ticket).await? {
            Outcome::Success(granted) => {
                tracing::debug!(permissions = granted.len(), "Ticket resolved");
                Ok(Resolved { ticket, granted })
            }
            Outcome::Failure(missing) => Err(self.unresolved(ticket, missing).await),
        }
    }

    /// Issues the token and builds the response.
    pub(crate) async fn issue(&self, token: AccessToken) -> AuthResult<NegotiationResponse> {
        let derivation_resource_id = token
            .permissions
            .iter()
            .find(|p| p.has_scope(scopes::DERIVATION_READ))
            .map(|p| p.resource_id.clone());

        let serialized = self.tokens.serialize(&token).await?;
        Ok(NegotiationResponse {
            access_token: serialized.token,
            token_type: serialized.token_type,
            derivation_resource_id,
        })
    }

    /// Turns an unresolved ticket into `NeedInfo` or `RequestDenied`.
    async fn unresolved(&self, ticket: Ticket, missing: Vec<MissingClaims>) -> AuthError {
        let derivations: Vec<_> = missing
            .iter()
            .filter_map(MissingClaims::as_derivation)
            .cloned()
            .collect();

        if ticket.required.is_empty() && derivations.is_empty() {
            tracing::warn!("No claims can satisfy the request, denying");
            return AuthError::RequestDenied;
        }

        let id = uuid::Uuid::new_v4().to_string();
        let required_claims = RequiredClaims {
            claim_token_format: ticket.outstanding_claim_types(),
            derivations,
        };

        if let Err(e) = self.tickets.put(&id, ticket).await {
            return e;
        }

        tracing::debug!(
            ticket = %id,
            alternatives = required_claims.claim_token_format.len(),
            derivations = required_claims.derivations.len(),
            "Ticket needs more claims"
        );
        AuthError::need_info(id, required_claims)
    }
}

#[async_trait]
impl Negotiator for BaseNegotiator {
    async fn negotiate(&self, input: NegotiationInput) -> AuthResult<NegotiationResponse> {
        let resolved = self.resolve(&input).await?;
        self.issue(AccessToken::new(resolved.granted)).await
    }
}
