//! WebID allow-list authorizer.

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::{Authorizer, grant_query};
use crate::types::{ClaimSet, Permission, Requirements, claim_types};

/// Grants full access to a fixed set of WebIDs.
pub struct WebIdAuthorizer {
    webids: Vec<String>,
}

impl WebIdAuthorizer {
    /// Creates an authorizer that trusts `webids`.
    #[must_use]
    pub fn new(webids: Vec<String>) -> Self {
        Self { webids }
    }

    fn is_allowed(&self, claims: &ClaimSet) -> bool {
        claims
            .get(claim_types::WEBID)
            .and_then(|v| v.as_str())
            .is_some_and(|webid| self.webids.iter().any(|w| w == webid))
    }
}

#[async_trait]
impl Authorizer for WebIdAuthorizer {
    async fn permissions(
        &self,
        claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        if !self.is_allowed(claims) {
            tracing::debug!("WebID missing or not in allow-list");
            return Ok(Vec::new());
        }
        Ok(grant_query(query))
    }

    async fn credentials(
        &self,
        _permissions: &[Permission],
        _query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        Ok(vec![
            Requirements::new().with_one_of(claim_types::WEBID, self.webids.clone()),
        ])
    }
}
