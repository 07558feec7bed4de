//! Registered resource descriptions.
//!
//! Resource servers register descriptions with the authorization server
//! (outside this crate). The negotiation engine only reads them: the
//! namespaced authorizers need a resource's name, the aggregator needs its
//! `derived_from` sources.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A resource as registered by its resource server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescription {
    /// The resource's name, usually its URL on the resource server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Scopes the resource supports.
    #[serde(default)]
    pub resource_scopes: Vec<String>,

    /// Upstream resources this resource is computed from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<DerivedFrom>,
}

impl ResourceDescription {
    /// Creates a description with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Adds an upstream source.
    #[must_use]
    pub fn derived_from(
        mut self,
        issuer: impl Into<String>,
        derivation_resource_id: impl Into<String>,
    ) -> Self {
        self.derived_from.push(DerivedFrom {
            issuer: issuer.into(),
            derivation_resource_id: derivation_resource_id.into(),
        });
        self
    }

    /// The second path segment of `name`, which names the namespace.
    ///
    /// `https://pod.example/alice/medical/record` lives in `medical`.
    #[must_use]
    pub fn namespace(&self) -> Option<String> {
        self.name.as_deref().and_then(namespace_of)
    }
}

/// An upstream resource a derived resource is computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedFrom {
    /// Authorization server protecting the upstream resource.
    pub issuer: String,
    /// Synthetic id the upstream server issued for the resource.
    pub derivation_resource_id: String,
}

/// Returns the second path segment of a resource URL.
#[must_use]
pub fn namespace_of(name: &str) -> Option<String> {
    let url = url::Url::parse(name).ok()?;
    url.path_segments()?
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Lookup of resource descriptions by resource id.
#[async_trait]
pub trait DescriptionStore: Send + Sync {
    /// Returns the description registered for `resource_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, resource_id: &str) -> AuthResult<Option<ResourceDescription>>;

    /// Registers or replaces the description for `resource_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn set(&self, resource_id: &str, description: ResourceDescription) -> AuthResult<()>;
}

/// In-memory description store.
#[derive(Default)]
pub struct InMemoryDescriptionStore {
    descriptions: DashMap<String, ResourceDescription>,
}

impl InMemoryDescriptionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DescriptionStore for InMemoryDescriptionStore {
    async fn get(&self, resource_id: &str) -> AuthResult<Option<ResourceDescription>> {
        Ok(self
            .descriptions
            .get(resource_id)
            .map(|entry| entry.value().clone()))
    }

    async fn set(&self, resource_id: &str, description: ResourceDescription) -> AuthResult<()> {
        self.descriptions.insert(resource_id.to_string(), description);
        Ok(())
    }
}

/// Resolves the namespace of `resource_id` through `store`.
///
/// Falls back to treating the id itself as a URL when nothing is registered.
///
/// # Errors
///
/// Returns an error if the store lookup fails.
pub async fn resource_namespace(
    store: &dyn DescriptionStore,
    resource_id: &str,
) -> AuthResult<Option<String>> {
    match store.get(resource_id).await? {
        Some(description) if description.name.is_some() => Ok(description.namespace()),
        _ => Ok(namespace_of(resource_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_of() {
        assert_eq!(
            namespace_of("https://pod.example/alice/medical/record"),
            Some("medical".to_string())
        );
        assert_eq!(namespace_of("https://pod.example/alice"), None);
        assert_eq!(namespace_of("https://pod.example/alice/"), None);
        assert_eq!(namespace_of("not a url"), None);
    }

    #[tokio::test]
    async fn test_resource_namespace_uses_registered_name() {
        let store = InMemoryDescriptionStore::new();
        store
            .set(
                "uuid-1",
                ResourceDescription::named("https://pod.example/bob/public/x"),
            )
            .await
            .unwrap();

        assert_eq!(
            resource_namespace(&store, "uuid-1").await.unwrap(),
            Some("public".to_string())
        );
        assert_eq!(
            resource_namespace(&store, "https://pod.example/bob/private/y")
                .await
                .unwrap(),
            Some("private".to_string())
        );
        assert_eq!(resource_namespace(&store, "uuid-2").await.unwrap(), None);
    }

    #[test]
    fn test_description_serialization() {
        let description = ResourceDescription::named("https://pod.example/a/b")
            .derived_from("https://as.example", "abc");
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(
            json["derived_from"][0]["issuer"],
            serde_json::json!("https://as.example")
        );
    }
}
