//! Trivial authorizers for development and testing.

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::{Authorizer, grant_query};
use crate::types::{ClaimSet, Permission, Requirements};

/// Grants everything to everyone.
pub struct AllAuthorizer {
    _private: (),
}

impl AllAuthorizer {
    /// Creates the authorizer, logging a warning.
    #[must_use]
    pub fn new() -> Self {
        tracing::warn!(
            "AllAuthorizer grants every permission to every requesting party; \
             do not use it in production"
        );
        Self { _private: () }
    }
}

impl Default for AllAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authorizer for AllAuthorizer {
    async fn permissions(
        &self,
        _claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        Ok(grant_query(query))
    }

    async fn credentials(
        &self,
        _permissions: &[Permission],
        _query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        Ok(vec![Requirements::new()])
    }
}

/// Grants nothing to anyone.
pub struct NoneAuthorizer {
    _private: (),
}

impl NoneAuthorizer {
    /// Creates the authorizer, logging a warning.
    #[must_use]
    pub fn new() -> Self {
        tracing::warn!("NoneAuthorizer denies every request; do not use it in production");
        Self { _private: () }
    }
}

impl Default for NoneAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authorizer for NoneAuthorizer {
    async fn permissions(
        &self,
        _claims: &ClaimSet,
        _query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        Ok(Vec::new())
    }

    async fn credentials(
        &self,
        _permissions: &[Permission],
        _query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        Ok(Vec::new())
    }
}
