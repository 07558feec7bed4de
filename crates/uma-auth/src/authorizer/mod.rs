//! Policy decision components.
//!
//! An [`Authorizer`] answers two questions:
//!
//! - [`permissions`](Authorizer::permissions): given these claims, what can be
//!   granted (optionally restricted to a query)?
//! - [`credentials`](Authorizer::credentials): given these permissions, which
//!   alternative claim requirements would each be sufficient to grant them?
//!
//! Authorizers never fail for "access denied"; they return fewer permissions
//! or no alternatives. Errors are reserved for malformed input and failing
//! collaborators.
//!
//! Decorators compose by wrapping another `Arc<dyn Authorizer>`:
//!
//! ```ignore
//! use std::sync::Arc;
//! use uma_auth::authorizer::{PublicNamespaceAuthorizer, WebIdAuthorizer};
//!
//! let private = Arc::new(WebIdAuthorizer::new(vec!["https://alice.example/#me".into()]));
//! let authorizer = PublicNamespaceAuthorizer::new(private, vec!["public".into()], descriptions);
//! ```

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{ClaimSet, Permission, Requirements};

pub mod all;
pub mod namespaced;
pub mod policy;
pub mod public;
pub mod webid;

pub use all::{AllAuthorizer, NoneAuthorizer};
pub use namespaced::NamespacedAuthorizer;
pub use policy::{PolicyAuthorizer, PolicyEvaluator, PolicyRequest, PolicyVerdict, ScopeVocabulary};
pub use public::PublicNamespaceAuthorizer;
pub use webid::WebIdAuthorizer;

/// A policy decision point.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Returns what can be granted given `claims`.
    ///
    /// With a `query`, the result is restricted to the queried resources and
    /// scopes. Without one, implementations may return
    /// [`Permission::any`] to denote everything they could ever grant.
    ///
    /// # Errors
    ///
    /// Returns an error only for unsupported input or collaborator failures.
    async fn permissions(
        &self,
        claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>>;

    /// Returns alternative requirement sets that would each grant `permissions`.
    ///
    /// An empty list means the permissions can never be granted; a list
    /// holding an empty [`Requirements`] means they are grantable already.
    ///
    /// # Errors
    ///
    /// Returns an error only for unsupported input or collaborator failures.
    async fn credentials(
        &self,
        permissions: &[Permission],
        query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>>;
}

/// Grants the full query, or the wildcard permission without one.
pub(crate) fn grant_query(query: Option<&[Permission]>) -> Vec<Permission> {
    match query {
        Some(query) => query.to_vec(),
        None => vec![Permission::any()],
    }
}
