//! Verifier for access tokens used as claims.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::TokenFactory;
use crate::types::{ClaimSet, claim_types};
use crate::verifier::{ClaimToken, Verifier};

/// Verifies an access token through a [`TokenFactory`] and exposes its
/// permissions as an `access` claim.
///
/// This is how a requesting party proves derivation access: the upstream
/// authorization server's token becomes the `access` claim the aggregator
/// inspects.
pub struct AccessTokenVerifier {
    tokens: Arc<dyn TokenFactory>,
}

impl AccessTokenVerifier {
    /// Creates a verifier backed by `tokens`.
    #[must_use]
    pub fn new(tokens: Arc<dyn TokenFactory>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Verifier for AccessTokenVerifier {
    async fn verify(&self, token: &ClaimToken) -> AuthResult<ClaimSet> {
        let payload = self.tokens.deserialize(&token.token).await.map_err(|e| match e {
            AuthError::InvalidToken { message } => AuthError::verification(message),
            other => other,
        })?;

        let access = serde_json::to_value(&payload.permissions)
            .map_err(|e| AuthError::internal(format!("Failed to encode permissions: {}", e)))?;

        let mut claims = ClaimSet::new();
        claims.insert(claim_types::ACCESS.to_string(), access);
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{AccessToken, OpaqueTokenFactory};
    use crate::types::{Permission, claim_formats, scopes};

    #[tokio::test]
    async fn test_exposes_permissions_as_access_claim() {
        let tokens = Arc::new(OpaqueTokenFactory::new());
        let granted = vec![Permission::new("d1", [scopes::DERIVATION_READ])];
        let serialized = tokens
            .serialize(&AccessToken::new(granted.clone()))
            .await
            .unwrap();

        let verifier = AccessTokenVerifier::new(tokens);
        let claims = verifier
            .verify(&ClaimToken::new(serialized.token, claim_formats::ACCESS_TOKEN))
            .await
            .unwrap();

        let access: Vec<Permission> =
            serde_json::from_value(claims[claim_types::ACCESS].clone()).unwrap();
        assert_eq!(access, granted);
    }

    #[tokio::test]
    async fn test_invalid_token_fails_verification() {
        let verifier = AccessTokenVerifier::new(Arc::new(OpaqueTokenFactory::new()));
        let result = verifier
            .verify(&ClaimToken::new("bogus", claim_formats::ACCESS_TOKEN))
            .await;

        assert!(matches!(result, Err(AuthError::Verification { .. })));
    }
}
