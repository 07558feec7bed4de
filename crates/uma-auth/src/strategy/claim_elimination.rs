//! Strategy that eliminates requirements as claims arrive.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::Authorizer;
use crate::strategy::TicketingStrategy;
use crate::types::{ClaimSet, MissingClaims, Outcome, Permission, Resolution, Ticket};

/// Freezes the authorizer's credential alternatives at ticket creation and
/// removes each requirement once a presented claim satisfies it.
///
/// The ticket resolves as soon as one alternative is empty. Unsatisfied
/// alternatives are never merged: a claim satisfying one alternative does
/// not count against the others unless their own predicate accepts it too.
pub struct ClaimEliminationStrategy {
    authorizer: Arc<dyn Authorizer>,
}

impl ClaimEliminationStrategy {
    /// Creates the strategy around `authorizer`.
    #[must_use]
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

#[async_trait]
impl TicketingStrategy for ClaimEliminationStrategy {
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> AuthResult<Ticket> {
        let required = self.authorizer.credentials(&permissions, None).await?;
        tracing::debug!(alternatives = required.len(), "Initialized ticket requirements");
        Ok(Ticket::new(permissions, required))
    }

    async fn validate_claims(&self, ticket: &mut Ticket, claims: &ClaimSet) -> AuthResult<()> {
        for (claim_type, value) in claims {
            ticket.provided.insert(claim_type.clone(), value.clone());

            for alternative in &mut ticket.required {
                if alternative.check(claim_type, value).await == Some(true) {
                    alternative.remove(claim_type);
                } else if alternative.contains(claim_type) {
                    tracing::debug!(claim_type = %claim_type, "Claim did not satisfy requirement");
                }
            }
        }
        Ok(())
    }

    async fn resolve_ticket(&self, ticket: &Ticket) -> AuthResult<Resolution> {
        if ticket.is_satisfied() {
            return Ok(Outcome::Success(ticket.permissions.clone()));
        }

        Ok(Outcome::Failure(
            ticket
                .required
                .iter()
                .cloned()
                .map(MissingClaims::Alternative)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::{NoneAuthorizer, WebIdAuthorizer};
    use crate::types::{Requirements, claim_types};
    use serde_json::json;

    /// Returns fixed alternatives from `credentials`.
    struct Fixed(Vec<Requirements>);

    #[async_trait]
    impl Authorizer for Fixed {
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
            Ok(self.0.clone())
        }
    }

    fn claims(pairs: &[(&str, serde_json::Value)]) -> ClaimSet {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn missing_types(resolution: Resolution) -> Vec<Vec<String>> {
        resolution
            .failure()
            .unwrap()
            .into_iter()
            .map(|m| match m {
                MissingClaims::Alternative(r) => r.claim_types(),
                MissingClaims::Derivation(_) => panic!("unexpected derivation"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_webid_requirement_eliminated() {
        let strategy = ClaimEliminationStrategy::new(Arc::new(WebIdAuthorizer::new(vec![
            "https://a".to_string(),
        ])));
        let mut ticket = strategy
            .initialize_ticket(vec![Permission::new("r1", ["read"])])
            .await
            .unwrap();

        let resolution = strategy.resolve_ticket(&ticket).await.unwrap();
        assert_eq!(missing_types(resolution), vec![vec!["webid".to_string()]]);

        strategy
            .validate_claims(&mut ticket, &claims(&[(claim_types::WEBID, json!("https://b"))]))
            .await
            .unwrap();
        assert!(strategy.resolve_ticket(&ticket).await.unwrap().is_failure());

        strategy
            .validate_claims(&mut ticket, &claims(&[(claim_types::WEBID, json!("https://a"))]))
            .await
            .unwrap();
        let granted = strategy
            .resolve_ticket(&ticket)
            .await
            .unwrap()
            .success()
            .unwrap();
        assert_eq!(granted, vec![Permission::new("r1", ["read"])]);
    }

    #[tokio::test]
    async fn test_disjunctive_alternatives() {
        let strategy = ClaimEliminationStrategy::new(Arc::new(Fixed(vec![
            Requirements::new()
                .with_any(claim_types::WEBID)
                .with_any(claim_types::CLIENT_ID),
            Requirements::new().with_any(claim_types::PURPOSE),
        ])));
        let mut ticket = strategy
            .initialize_ticket(vec![Permission::new("r1", ["read"])])
            .await
            .unwrap();

        strategy
            .validate_claims(&mut ticket, &claims(&[(claim_types::WEBID, json!("https://a"))]))
            .await
            .unwrap();
        let resolution = strategy.resolve_ticket(&ticket).await.unwrap();
        assert_eq!(
            missing_types(resolution),
            vec![vec!["client_id".to_string()], vec!["purpose".to_string()]]
        );

        strategy
            .validate_claims(&mut ticket, &claims(&[(claim_types::PURPOSE, json!("care"))]))
            .await
            .unwrap();
        assert!(strategy.resolve_ticket(&ticket).await.unwrap().is_success());
        assert_eq!(ticket.provided.len(), 2);
    }

    #[tokio::test]
    async fn test_elimination_is_monotonic() {
        let strategy = ClaimEliminationStrategy::new(Arc::new(Fixed(vec![
            Requirements::new()
                .with_one_of(claim_types::WEBID, vec!["https://a".to_string()])
                .with_any(claim_types::PURPOSE),
        ])));
        let mut ticket = strategy
            .initialize_ticket(vec![Permission::new("r1", ["read"])])
            .await
            .unwrap();

        let rounds = [
            claims(&[(claim_types::WEBID, json!("https://x"))]),
            claims(&[(claim_types::PURPOSE, json!("care"))]),
            claims(&[(claim_types::WEBID, json!("https://a"))]),
        ];
        let mut before = ticket.outstanding_claim_types();
        for round in &rounds {
            strategy.validate_claims(&mut ticket, round).await.unwrap();
            let after = ticket.outstanding_claim_types();
            for (b, a) in before.iter().zip(after.iter()) {
                assert!(a.iter().all(|t| b.contains(t)));
            }
            before = after;
        }
        assert!(ticket.is_satisfied());
    }

    #[tokio::test]
    async fn test_no_alternatives_fails_empty() {
        let strategy = ClaimEliminationStrategy::new(Arc::new(NoneAuthorizer::new()));
        let ticket = strategy
            .initialize_ticket(vec![Permission::new("r1", ["read"])])
            .await
            .unwrap();

        assert!(ticket.required.is_empty());
        let resolution = strategy.resolve_ticket(&ticket).await.unwrap();
        assert!(resolution.failure().unwrap().is_empty());
    }
}
