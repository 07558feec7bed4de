//! Public namespace carve-out.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::Authorizer;
use crate::storage::{DescriptionStore, resource_namespace};
use crate::types::{ClaimSet, Permission, Requirements};

/// Grants resources in public namespaces unconditionally.
///
/// Everything outside the public namespaces is decided by the wrapped
/// authorizer, which never sees the public permissions.
pub struct PublicNamespaceAuthorizer {
    inner: Arc<dyn Authorizer>,
    namespaces: Vec<String>,
    descriptions: Arc<dyn DescriptionStore>,
}

impl PublicNamespaceAuthorizer {
    /// Wraps `inner`, treating `namespaces` as public.
    #[must_use]
    pub fn new(
        inner: Arc<dyn Authorizer>,
        namespaces: Vec<String>,
        descriptions: Arc<dyn DescriptionStore>,
    ) -> Self {
        Self {
            inner,
            namespaces,
            descriptions,
        }
    }

    async fn is_public(&self, resource_id: &str) -> AuthResult<bool> {
        let namespace = resource_namespace(self.descriptions.as_ref(), resource_id).await?;
        Ok(namespace.is_some_and(|ns| self.namespaces.contains(&ns)))
    }

    /// Splits `permissions` into (public, private).
    async fn partition(
        &self,
        permissions: &[Permission],
    ) -> AuthResult<(Vec<Permission>, Vec<Permission>)> {
        let mut public = Vec::new();
        let mut private = Vec::new();
        for permission in permissions {
            if self.is_public(&permission.resource_id).await? {
                public.push(permission.clone());
            } else {
                private.push(permission.clone());
            }
        }
        Ok((public, private))
    }
}

#[async_trait]
impl Authorizer for PublicNamespaceAuthorizer {
    async fn permissions(
        &self,
        claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        let Some(query) = query else {
            return self.inner.permissions(claims, None).await;
        };

        let (mut granted, private) = self.partition(query).await?;
        if !private.is_empty() {
            granted.extend(self.inner.permissions(claims, Some(&private)).await?);
        }
        Ok(granted)
    }

    async fn credentials(
        &self,
        permissions: &[Permission],
        query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        let (_, private) = self.partition(permissions).await?;
        if private.is_empty() {
            return Ok(vec![Requirements::new()]);
        }
        self.inner.credentials(&private, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::{NoneAuthorizer, WebIdAuthorizer};
    use crate::storage::InMemoryDescriptionStore;
    use std::sync::Mutex;

    const PUBLIC: &str = "https://pod.example/alice/public/photo";
    const PRIVATE: &str = "https://pod.example/alice/private/diary";

    /// Records what the wrapped authorizer is asked.
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Authorizer for Recording {
        async fn permissions(
            &self,
            _claims: &ClaimSet,
            query: Option<&[Permission]>,
        ) -> AuthResult<Vec<Permission>> {
            let query = query.unwrap_or_default();
            self.seen
                .lock()
                .unwrap()
                .extend(query.iter().map(|p| p.resource_id.clone()));
            Ok(Vec::new())
        }

        async fn credentials(
            &self,
            permissions: &[Permission],
            _query: Option<&Requirements>,
        ) -> AuthResult<Vec<Requirements>> {
            self.seen
                .lock()
                .unwrap()
                .extend(permissions.iter().map(|p| p.resource_id.clone()));
            Ok(Vec::new())
        }
    }

    fn wrap(inner: Arc<dyn Authorizer>) -> PublicNamespaceAuthorizer {
        PublicNamespaceAuthorizer::new(
            inner,
            vec!["public".to_string()],
            Arc::new(InMemoryDescriptionStore::new()),
        )
    }

    #[tokio::test]
    async fn test_public_granted_regardless_of_inner() {
        let authorizer = wrap(Arc::new(NoneAuthorizer::new()));
        let query = vec![
            Permission::new(PUBLIC, ["read"]),
            Permission::new(PRIVATE, ["read"]),
        ];

        let granted = authorizer
            .permissions(&ClaimSet::new(), Some(&query))
            .await
            .unwrap();
        assert_eq!(granted, vec![Permission::new(PUBLIC, ["read"])]);
    }

    #[tokio::test]
    async fn test_inner_only_sees_private() {
        let inner = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let authorizer = wrap(inner.clone());
        let query = vec![
            Permission::new(PUBLIC, ["read"]),
            Permission::new(PRIVATE, ["read"]),
        ];

        authorizer
            .permissions(&ClaimSet::new(), Some(&query))
            .await
            .unwrap();
        authorizer.credentials(&query, None).await.unwrap();

        let seen = inner.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![PRIVATE.to_string(), PRIVATE.to_string()]);
    }

    #[tokio::test]
    async fn test_all_public_needs_nothing() {
        let authorizer = wrap(Arc::new(WebIdAuthorizer::new(Vec::new())));
        let credentials = authorizer
            .credentials(&[Permission::new(PUBLIC, ["read"])], None)
            .await
            .unwrap();

        assert_eq!(credentials.len(), 1);
        assert!(credentials[0].is_solved());
    }

    #[tokio::test]
    async fn test_private_delegates_credentials() {
        let authorizer = wrap(Arc::new(WebIdAuthorizer::new(vec!["https://a".into()])));
        let credentials = authorizer
            .credentials(&[Permission::new(PRIVATE, ["read"])], None)
            .await
            .unwrap();

        assert_eq!(credentials[0].claim_types(), vec!["webid"]);
    }
}
