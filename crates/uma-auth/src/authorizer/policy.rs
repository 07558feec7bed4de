//! Authorizer backed by an external declarative policy evaluator.
//!
//! The evaluator (an ODRL ruleset engine, a usage-control policy engine, ...)
//! is a black box: for one subject, resource and action it returns a verdict.
//! This module translates scopes between the internal URN vocabulary and the
//! policy vocabulary and keeps only scopes whose verdict is
//! [`PolicyVerdict::ActivePermission`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::authorizer::Authorizer;
use crate::types::{ClaimSet, Permission, Requirements, claim_types, scopes};

/// Verdict of the policy evaluator for one (subject, resource, action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    /// A permission is active for the request.
    ActivePermission,
    /// A prohibition applies, or a permission exists but is not active.
    Prohibited,
    /// No policy applies.
    NotApplicable,
}

/// One question put to the policy evaluator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyRequest {
    /// The requesting party's WebID, if known.
    pub subject: Option<String>,
    /// Resource id.
    pub resource: String,
    /// Action in the policy vocabulary.
    pub action: String,
    /// All claims provided by the requesting party.
    pub claims: ClaimSet,
}

/// External policy decision engine.
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Evaluates `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the evaluator cannot be reached or fails.
    async fn evaluate(&self, request: &PolicyRequest) -> AuthResult<PolicyVerdict>;
}

/// Fixed bidirectional map between internal scopes and policy actions.
#[derive(Debug, Clone, Default)]
pub struct ScopeVocabulary {
    to_policy: BTreeMap<String, String>,
    to_internal: BTreeMap<String, String>,
}

impl ScopeVocabulary {
    /// ODRL action IRI prefix.
    pub const ODRL: &'static str = "http://www.w3.org/ns/odrl/2/";

    /// The internal access modes mapped onto ODRL actions.
    #[must_use]
    pub fn odrl() -> Self {
        [
            (scopes::READ, "read"),
            (scopes::APPEND, "append"),
            (scopes::CREATE, "create"),
            (scopes::DELETE, "delete"),
            (scopes::WRITE, "write"),
        ]
        .into_iter()
        .fold(Self::default(), |vocabulary, (internal, action)| {
            vocabulary.with(internal, format!("{}{}", Self::ODRL, action))
        })
    }

    /// Adds a mapping, replacing earlier mappings of either side.
    #[must_use]
    pub fn with(mut self, internal: impl Into<String>, policy: impl Into<String>) -> Self {
        let internal = internal.into();
        let policy = policy.into();
        if let Some(old) = self.to_policy.insert(internal.clone(), policy.clone()) {
            self.to_internal.remove(&old);
        }
        if let Some(old) = self.to_internal.insert(policy, internal.clone())
            && old != internal
        {
            self.to_policy.remove(&old);
        }
        self
    }

    /// Policy action for an internal scope.
    #[must_use]
    pub fn to_policy(&self, scope: &str) -> Option<&str> {
        self.to_policy.get(scope).map(String::as_str)
    }

    /// Internal scope for a policy action.
    #[must_use]
    pub fn to_internal(&self, action: &str) -> Option<&str> {
        self.to_internal.get(action).map(String::as_str)
    }
}

/// Authorizer delegating decisions to a [`PolicyEvaluator`].
pub struct PolicyAuthorizer {
    evaluator: Arc<dyn PolicyEvaluator>,
    vocabulary: Arc<ScopeVocabulary>,
}

impl PolicyAuthorizer {
    /// Creates an authorizer using the ODRL vocabulary.
    #[must_use]
    pub fn new(evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        Self::with_vocabulary(evaluator, ScopeVocabulary::odrl())
    }

    /// Creates an authorizer with a custom scope vocabulary.
    #[must_use]
    pub fn with_vocabulary(evaluator: Arc<dyn PolicyEvaluator>, vocabulary: ScopeVocabulary) -> Self {
        Self {
            evaluator,
            vocabulary: Arc::new(vocabulary),
        }
    }
}

/// Restricts each queried permission to its actively permitted scopes.
async fn evaluate_permissions(
    evaluator: &dyn PolicyEvaluator,
    vocabulary: &ScopeVocabulary,
    claims: &ClaimSet,
    query: &[Permission],
) -> AuthResult<Vec<Permission>> {
    let subject = claims
        .get(claim_types::WEBID)
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let mut granted = Vec::with_capacity(query.len());
    for permission in query {
        let mut result = permission.retain_scopes(|_| false);
        for scope in &permission.resource_scopes {
            let Some(action) = vocabulary.to_policy(scope) else {
                tracing::debug!(scope = %scope, "Scope has no policy action, dropping");
                continue;
            };

            let request = PolicyRequest {
                subject: subject.clone(),
                resource: permission.resource_id.clone(),
                action: action.to_string(),
                claims: claims.clone(),
            };
            let verdict = evaluator.evaluate(&request).await?;
            tracing::trace!(
                resource = %request.resource,
                action = %request.action,
                verdict = ?verdict,
                "Policy evaluated"
            );

            if verdict == PolicyVerdict::ActivePermission {
                result.add_scope(scope.clone());
            }
        }
        granted.push(result);
    }
    Ok(granted)
}

#[async_trait]
impl Authorizer for PolicyAuthorizer {
    async fn permissions(
        &self,
        claims: &ClaimSet,
        query: Option<&[Permission]>,
    ) -> AuthResult<Vec<Permission>> {
        let Some(query) = query else {
            tracing::debug!("Policy authorizer cannot enumerate permissions without a query");
            return Ok(Vec::new());
        };
        evaluate_permissions(self.evaluator.as_ref(), &self.vocabulary, claims, query).await
    }

    /// One alternative: a WebID for which every requested scope is active.
    async fn credentials(
        &self,
        permissions: &[Permission],
        _query: Option<&Requirements>,
    ) -> AuthResult<Vec<Requirements>> {
        let evaluator = Arc::clone(&self.evaluator);
        let vocabulary = Arc::clone(&self.vocabulary);
        let requested = Arc::new(permissions.to_vec());

        let requirements = Requirements::new().with(claim_types::WEBID, move |webid| {
            let evaluator = Arc::clone(&evaluator);
            let vocabulary = Arc::clone(&vocabulary);
            let requested = Arc::clone(&requested);
            async move {
                let mut claims = ClaimSet::new();
                claims.insert(claim_types::WEBID.to_string(), webid);

                match evaluate_permissions(evaluator.as_ref(), &vocabulary, &claims, &requested)
                    .await
                {
                    Ok(granted) => granted.iter().zip(requested.iter()).all(|(g, r)| {
                        r.resource_scopes.iter().all(|scope| g.has_scope(scope))
                    }),
                    Err(e) => {
                        tracing::warn!(error = %e, "Policy evaluation failed");
                        false
                    }
                }
            }
        });

        Ok(vec![requirements])
    }
}
