//! Claim sets and claim requirements.
//!
//! A [`ClaimSet`] is what a requesting party has proven so far. A
//! [`Requirements`] value maps claim types to asynchronous predicates; a
//! predicate is removed once a presented claim satisfies it, so an *empty*
//! `Requirements` means "fully satisfied".

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde_json::Value;

/// Well-known claim types.
pub mod claim_types {
    /// WebID of the requesting party.
    pub const WEBID: &str = "webid";
    /// Client application identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// Declared purpose of the access.
    pub const PURPOSE: &str = "purpose";
    /// Permissions proven by a previously issued access token.
    pub const ACCESS: &str = "access";
}

/// Well-known claim token formats.
pub mod claim_formats {
    /// An access token issued by an authorization server.
    pub const ACCESS_TOKEN: &str = "urn:ietf:params:oauth:token-type:access_token";
    /// A bare WebID, accepted without proof.
    pub const UNSECURE_WEBID: &str = "urn:solidlab:uma:claims:formats:webid";
    /// A JSON object of claims, accepted without proof.
    pub const UNSECURE_JSON: &str = "urn:solidlab:uma:claims:formats:json";
}

/// Arbitrary claims keyed by claim type.
pub type ClaimSet = BTreeMap<String, Value>;

/// Asynchronous check of a single claim value.
pub type ClaimPredicate = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;

/// Claim types still required, each with the predicate its value must pass.
#[derive(Clone, Default)]
pub struct Requirements {
    predicates: BTreeMap<String, ClaimPredicate>,
}

impl Requirements {
    /// Creates an empty (already satisfied) requirement set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate for `claim_type`.
    #[must_use]
    pub fn with<F, Fut>(mut self, claim_type: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.insert(claim_type, predicate);
        self
    }

    /// Requires `claim_type` to be present with any value.
    #[must_use]
    pub fn with_any(self, claim_type: impl Into<String>) -> Self {
        self.with(claim_type, |_| async { true })
    }

    /// Requires `claim_type` to be a string contained in `allowed`.
    #[must_use]
    pub fn with_one_of(self, claim_type: impl Into<String>, allowed: Vec<String>) -> Self {
        let allowed = Arc::new(allowed);
        self.with(claim_type, move |value| {
            let allowed = Arc::clone(&allowed);
            async move {
                value
                    .as_str()
                    .is_some_and(|v| allowed.iter().any(|a| a == v))
            }
        })
    }

    /// Inserts or replaces the predicate for `claim_type`.
    pub fn insert<F, Fut>(&mut self, claim_type: impl Into<String>, predicate: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let predicate: ClaimPredicate = Arc::new(move |value| predicate(value).boxed());
        self.predicates.insert(claim_type.into(), predicate);
    }

    /// Returns the predicate for `claim_type`.
    #[must_use]
    pub fn predicate(&self, claim_type: &str) -> Option<ClaimPredicate> {
        self.predicates.get(claim_type).cloned()
    }

    /// Removes the predicate for `claim_type`, returning whether it existed.
    pub fn remove(&mut self, claim_type: &str) -> bool {
        self.predicates.remove(claim_type).is_some()
    }

    /// Returns `true` if `claim_type` is still required.
    #[must_use]
    pub fn contains(&self, claim_type: &str) -> bool {
        self.predicates.contains_key(claim_type)
    }

    /// Returns `true` when nothing is required anymore.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Number of claim types still required.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Returns `true` when nothing is required anymore.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_solved()
    }

    /// Claim types still required, in key order.
    #[must_use]
    pub fn claim_types(&self) -> Vec<String> {
        self.predicates.keys().cloned().collect()
    }

    /// Evaluates the predicate for `claim_type` against `value`.
    ///
    /// Returns `None` when this set has no predicate for `claim_type`.
    pub async fn check(&self, claim_type: &str, value: &Value) -> Option<bool> {
        let predicate = self.predicate(claim_type)?;
        Some(predicate(value.clone()).await)
    }
}

impl fmt::Debug for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.predicates.keys()).finish()
    }
}
