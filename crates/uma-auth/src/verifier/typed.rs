//! Verifier dispatching on the claim token format.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::ClaimSet;
use crate::verifier::{ClaimToken, Verifier};

/// Routes each claim token to the verifier registered for its format.
#[derive(Default)]
pub struct TypedVerifier {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl TypedVerifier {
    /// Creates a verifier with no registered formats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `verifier` for `format`.
    #[must_use]
    pub fn with(mut self, format: impl Into<String>, verifier: Arc<dyn Verifier>) -> Self {
        self.verifiers.insert(format.into(), verifier);
        self
    }

    /// Returns `true` if `format` has a registered verifier.
    #[must_use]
    pub fn supports(&self, format: &str) -> bool {
        self.verifiers.contains_key(format)
    }
}

#[async_trait]
impl Verifier for TypedVerifier {
    async fn verify(&self, token: &ClaimToken) -> AuthResult<ClaimSet> {
        let Some(verifier) = self.verifiers.get(&token.format) else {
            tracing::debug!(format = %token.format, "No verifier for claim token format");
            return Err(AuthError::invalid_request(format!(
                "Unsupported claim token format: {}",
                token.format
            )));
        };
        verifier.verify(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{claim_formats, claim_types};
    use crate::verifier::UnsecureVerifier;

    #[tokio::test]
    async fn test_dispatches_by_format() {
        let verifier = TypedVerifier::new().with(
            claim_formats::UNSECURE_WEBID,
            Arc::new(UnsecureVerifier::new()),
        );
        assert!(verifier.supports(claim_formats::UNSECURE_WEBID));

        let claims = verifier
            .verify(&ClaimToken::new("https://alice", claim_formats::UNSECURE_WEBID))
            .await
            .unwrap();
        assert!(claims.contains_key(claim_types::WEBID));
    }

    #[tokio::test]
    async fn test_unknown_format_is_invalid_request() {
        let verifier = TypedVerifier::new().with(
            claim_formats::UNSECURE_WEBID,
            Arc::new(UnsecureVerifier::new()),
        );

        let result = verifier
            .verify(&ClaimToken::new("{}", claim_formats::UNSECURE_JSON))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }
}
