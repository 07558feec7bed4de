//! Per-namespace authorizer routing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::Authorizer;
use crate::storage::{DescriptionStore, resource_namespace};
use crate::types::{ClaimSet, Permission, Requirements};

/// Routes each request to the authorizer of its resources' namespace.
///
/// A request whose resources span several namespaces is refused: there is
/// no defined way to compose the policies of different namespaces.
pub struct NamespacedAuthorizer {
    authorizers: HashMap<String, Arc<dyn Authorizer>>,
    fallback: Arc<dyn Authorizer>,
    descriptions: Arc<dyn DescriptionStore>,
}

/// Where a set of permissions should be decided.
enum Route {
    Single(Arc<dyn Authorizer>),
    Mixed(BTreeSet<Option<String>>),
}

impl NamespacedAuthorizer {
    /// Creates a router; resources in unlisted namespaces go to `fallback`.
    #[must_use]
    pub fn new(
        authorizers: HashMap<String, Arc<dyn Authorizer>>,
        fallback: Arc<dyn Authorizer>,
        descriptions: Arc<dyn DescriptionStore>,
    ) -> Self {
        Self {
            authorizers,
            fallback,
            descriptions,
        }
    }

    async fn route(&self, permissions: &[Permission]) -> AuthResult<Route> {
        let mut namespaces = BTreeSet::new();
        for permission in permissions {
            namespaces
                .insert(resource_namespace(self.descriptions.as_ref(), &permission.resource_id).await?);
        }

        if namespaces.len() > 1 {
            return Ok(Route::Mixed(namespaces));
        }

        let authorizer = namespaces
            .into_iter()
            .next()
            .flatten()
            .and_then(|ns| self.authorizers.get(&ns).cloned())
            .unwrap_or_else(|| Arc::clone(&self.fallback));
        Ok(Route::Single(authorizer))
    }
}

#[async_trait]
impl Authorizer for NamespacedAuthorizer {
    async fn permissions(
        &self,
        claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        let Some(query) = query else {
            return self.fallback.permissions(claims, None).await;
        };

        match self.route(query).await? {
            Route::Single(authorizer) => authorizer.permissions(claims, Some(query)).await,
            Route::Mixed(namespaces) => {
                tracing::warn!(
                    namespaces = ?namespaces,
                    "Refusing permission query spanning several namespaces"
                );
                Ok(Vec::new())
            }
        }
    }

    async fn credentials(
        &self,
        permissions: &[Permission],
        query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        match self.route(permissions).await? {
            Route::Single(authorizer) => authorizer.credentials(permissions, query).await,
            Route::Mixed(namespaces) => {
                tracing::warn!(
                    namespaces = ?namespaces,
                    "Refusing credential query spanning several namespaces"
                );
                Ok(Vec::new())
            }
        }
    }
}
