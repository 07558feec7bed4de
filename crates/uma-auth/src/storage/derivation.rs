//! Synthetic derivation id to upstream issuer mapping.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;

/// Storage of the upstream authorization server behind each derivation id.
#[async_trait]
pub trait DerivationIssuerStore: Send + Sync {
    /// Returns the issuer of `derivation_resource_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, derivation_resource_id: &str) -> AuthResult<Option<String>>;

    /// Records `issuer` for `derivation_resource_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set(&self, derivation_resource_id: &str, issuer: &str) -> AuthResult<()>;
}

/// In-memory derivation issuer store.
#[derive(Default)]
pub struct InMemoryDerivationIssuerStore {
    issuers: DashMap<String, String>,
}

impl InMemoryDerivationIssuerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DerivationIssuerStore for InMemoryDerivationIssuerStore {
    async fn get(&self, derivation_resource_id: &str) -> AuthResult<Option<String>> {
        Ok(self
            .issuers
            .get(derivation_resource_id)
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, derivation_resource_id: &str, issuer: &str) -> AuthResult<()> {
        self.issuers
            .insert(derivation_resource_id.to_string(), issuer.to_string());
        Ok(())
    }
}
