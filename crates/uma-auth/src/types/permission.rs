//! Permissions and the scope vocabulary.

use serde::{Deserialize, Serialize};

/// Sentinel resource id meaning "every resource".
pub const ANY_RESOURCE: &str = "urn:solidlab:uma:resources:any";

/// Sentinel scope meaning "every access mode".
pub const ANY_SCOPE: &str = "urn:solidlab:uma:scopes:any";

/// Internal access-mode scopes.
pub mod scopes {
    /// Read access.
    pub const READ: &str = "urn:example:css:modes:read";
    /// Append access.
    pub const APPEND: &str = "urn:example:css:modes:append";
    /// Create access.
    pub const CREATE: &str = "urn:example:css:modes:create";
    /// Delete access.
    pub const DELETE: &str = "urn:example:css:modes:delete";
    /// Write access.
    pub const WRITE: &str = "urn:example:css:modes:write";
    /// Read access on a synthetic derivation resource.
    pub const DERIVATION_READ: &str = "derivation-read";
}

/// One resource and the access modes requested or granted on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Registered resource id.
    pub resource_id: String,

    /// Access modes, in insertion order.
    #[serde(default)]
    pub resource_scopes: Vec<String>,

    /// Policies this permission was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,
}

impl Permission {
    /// Creates a permission on `resource_id` with the given scopes.
    #[must_use]
    pub fn new<I, S>(resource_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            resource_id: resource_id.into(),
            resource_scopes: scopes.into_iter().map(Into::into).collect(),
            policies: None,
        }
    }

    /// The wildcard permission: every scope on every resource.
    #[must_use]
    pub fn any() -> Self {
        Self::new(ANY_RESOURCE, [ANY_SCOPE])
    }

    /// Returns `true` if this permission covers every resource.
    #[must_use]
    pub fn is_any_resource(&self) -> bool {
        self.resource_id == ANY_RESOURCE
    }

    /// Returns `true` if `scope` is granted, directly or through [`ANY_SCOPE`].
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.resource_scopes
            .iter()
            .any(|s| s == scope || s == ANY_SCOPE)
    }

    /// Adds `scope` unless it is already present.
    pub fn add_scope(&mut self, scope: impl Into<String>) {
        let scope = scope.into();
        if !self.resource_scopes.contains(&scope) {
            self.resource_scopes.push(scope);
        }
    }

    /// Returns a copy restricted to the scopes `keep` accepts.
    #[must_use]
    pub fn retain_scopes(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            resource_id: self.resource_id.clone(),
            resource_scopes: self
                .resource_scopes
                .iter()
                .filter(|s| keep(s))
                .cloned()
                .collect(),
            policies: self.policies.clone(),
        }
    }
}

/// Returns `true` if every requested scope is granted on the same resource.
#[must_use]
pub fn covers(granted: &[Permission], requested: &Permission) -> bool {
    requested.resource_scopes.iter().all(|scope| {
        granted.iter().any(|g| {
            (g.resource_id == requested.resource_id || g.is_any_resource()) && g.has_scope(scope)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_serialization() {
        let permission = Permission::new("r1", [scopes::READ]);
        let json = serde_json::to_value(&permission).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "resource_id": "r1",
                "resource_scopes": ["urn:example:css:modes:read"]
            })
        );

        let parsed: Permission =
            serde_json::from_value(serde_json::json!({ "resource_id": "r2" })).unwrap();
        assert!(parsed.resource_scopes.is_empty());
    }

    #[test]
    fn test_add_scope_deduplicates() {
        let mut permission = Permission::new("r1", ["read"]);
        permission.add_scope("write");
        permission.add_scope("read");
        assert_eq!(permission.resource_scopes, vec!["read", "write"]);
    }

    #[test]
    fn test_wildcard_covers_everything() {
        let granted = vec![Permission::any()];
        assert!(covers(&granted, &Permission::new("r9", ["read", "write"])));
    }

    #[test]
    fn test_covers_requires_every_scope() {
        let granted = vec![Permission::new("r1", ["read"])];
        assert!(covers(&granted, &Permission::new("r1", ["read"])));
        assert!(!covers(&granted, &Permission::new("r1", ["read", "write"])));
        assert!(!covers(&granted, &Permission::new("r2", ["read"])));
    }
}
