//! Negotiation bound to usage agreements.
//!
//! Every issued token references a [`Contract`]: an ODRL-style agreement
//! stating who (assignee) may do what (action) on which resource (target),
//! granted by whom (assigner), under which constraints. An existing live
//! contract covering the grant is reused; otherwise a new one is drawn up
//! and stored.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::negotiator::base::{BaseNegotiator, Resolved};
use crate::negotiator::{NegotiationInput, NegotiationResponse, Negotiator};
use crate::token::AccessToken;
use crate::types::{ClaimSet, Permission, claim_types};

/// Assignee used when the requesting party stayed anonymous.
pub const ANONYMOUS: &str = "urn:solidlab:uma:assignee:anonymous";

/// Constraint left operand for the agreed purpose.
pub const PURPOSE_OPERAND: &str = "purpose";

/// Constraint left operand for the expiry instant.
pub const EXPIRY_OPERAND: &str = "dateTime";

/// A condition attached to a contract permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// What is constrained.
    pub left_operand: String,
    /// Comparison operator (`eq`, `lt`, ...).
    pub operator: String,
    /// Value compared against.
    pub right_operand: Value,
}

impl Constraint {
    /// The grant is only valid for `purpose`.
    #[must_use]
    pub fn purpose(purpose: Value) -> Self {
        Self {
            left_operand: PURPOSE_OPERAND.to_string(),
            operator: "eq".to_string(),
            right_operand: purpose,
        }
    }

    /// The grant is only valid before `instant`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `instant` cannot be formatted.
    pub fn expires_at(instant: OffsetDateTime) -> AuthResult<Self> {
        let formatted = instant
            .format(&Rfc3339)
            .map_err(|e| AuthError::internal(format!("Failed to format expiry: {}", e)))?;
        Ok(Self {
            left_operand: EXPIRY_OPERAND.to_string(),
            operator: "lt".to_string(),
            right_operand: Value::String(formatted),
        })
    }

    /// The instant of an expiry constraint.
    #[must_use]
    pub fn expiry(&self) -> Option<OffsetDateTime> {
        if self.left_operand != EXPIRY_OPERAND {
            return None;
        }
        let value = self.right_operand.as_str()?;
        OffsetDateTime::parse(value, &Rfc3339).ok()
    }
}

/// One (assigner, assignee, target, action) grant of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPermission {
    /// Party granting access.
    pub assigner: String,
    /// Party receiving access.
    pub assignee: String,
    /// Resource id.
    pub target: String,
    /// Scope.
    pub action: String,
    /// Conditions on the grant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl ContractPermission {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.constraints
            .iter()
            .filter_map(Constraint::expiry)
            .all(|expiry| now < expiry)
    }

    fn purpose(&self) -> Option<&Value> {
        self.constraints
            .iter()
            .find(|c| c.left_operand == PURPOSE_OPERAND)
            .map(|c| &c.right_operand)
    }
}

/// An agreement bound to issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier, embedded in tokens.
    pub uid: String,
    /// When the contract was drawn up.
    #[serde(with = "time::serde::rfc3339")]
    pub issued: OffsetDateTime,
    /// The granted permissions.
    pub permissions: Vec<ContractPermission>,
}

impl Contract {
    /// Returns `true` if every scope of `granted` is covered by a live
    /// permission to `assignee` with a matching purpose.
    #[must_use]
    pub fn covers(
        &self,
        assignee: &str,
        purpose: Option<&Value>,
        granted: &[Permission],
        now: OffsetDateTime,
    ) -> bool {
        granted.iter().all(|permission| {
            permission.resource_scopes.iter().all(|scope| {
                self.permissions.iter().any(|p| {
                    p.assignee == assignee
                        && p.target == permission.resource_id
                        && &p.action == scope
                        && p.purpose() == purpose
                        && p.is_live(now)
                })
            })
        })
    }
}

/// Storage of contracts.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Returns the contract with `uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, uid: &str) -> AuthResult<Option<Contract>>;

    /// Stores `contract`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put(&self, contract: Contract) -> AuthResult<()>;

    /// Returns every contract with a permission assigned to `assignee`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn for_assignee(&self, assignee: &str) -> AuthResult<Vec<Contract>>;
}

/// In-memory contract store.
#[derive(Default)]
pub struct InMemoryContractStore {
    contracts: DashMap<String, Contract>,
}

impl InMemoryContractStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Returns `true` if no contract is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn get(&self, uid: &str) -> AuthResult<Option<Contract>> {
        Ok(self.contracts.get(uid).map(|entry| entry.value().clone()))
    }

    async fn put(&self, contract: Contract) -> AuthResult<()> {
        self.contracts.insert(contract.uid.clone(), contract);
        Ok(())
    }

    async fn for_assignee(&self, assignee: &str) -> AuthResult<Vec<Contract>> {
        Ok(self
            .contracts
            .iter()
            .filter(|entry| entry.permissions.iter().any(|p| p.assignee == assignee))
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Negotiator that binds every token to a contract.
pub struct ContractNegotiator {
    base: BaseNegotiator,
    contracts: Arc<dyn ContractStore>,
    assigner: String,
    lifetime: Duration,
}

impl ContractNegotiator {
    /// Default contract lifetime.
    pub const DEFAULT_LIFETIME: Duration = Duration::minutes(30);

    /// Creates a negotiator drawing up contracts on behalf of `assigner`.
    #[must_use]
    pub fn new(
        base: BaseNegotiator,
        contracts: Arc<dyn ContractStore>,
        assigner: impl Into<String>,
    ) -> Self {
        Self {
            base,
            contracts,
            assigner: assigner.into(),
            lifetime: Self::DEFAULT_LIFETIME,
        }
    }

    /// Sets how long new contracts stay valid.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    fn assignee(claims: &ClaimSet) -> String {
        [claim_types::WEBID, claim_types::CLIENT_ID]
            .iter()
            .find_map(|claim| claims.get(*claim).and_then(Value::as_str))
            .unwrap_or(ANONYMOUS)
            .to_string()
    }

    async fn contract_for(&self, resolved: &Resolved) -> AuthResult<Contract> {
        let now = OffsetDateTime::now_utc();
        let assignee = Self::assignee(&resolved.ticket.provided);
        let purpose = resolved.ticket.provided.get(claim_types::PURPOSE);

        if let Some(existing) = self
            .contracts
            .for_assignee(&assignee)
            .await?
            .into_iter()
            .find(|c| c.covers(&assignee, purpose, &resolved.granted, now))
        {
            tracing::debug!(contract = %existing.uid, assignee = %assignee, "Reusing contract");
            return Ok(existing);
        }

        let mut constraints = vec![Constraint::expires_at(now + self.lifetime)?];
        if let Some(purpose) = purpose {
            constraints.push(Constraint::purpose(purpose.clone()));
        }

        let mut permissions = Vec::new();
        for permission in &resolved.granted {
            for scope in &permission.resource_scopes {
                permissions.push(ContractPermission {
                    assigner: self.assigner.clone(),
                    assignee: assignee.clone(),
                    target: permission.resource_id.clone(),
                    action: scope.clone(),
                    constraints: constraints.clone(),
                });
            }
        }

        let contract = Contract {
            uid: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            issued: now,
            permissions,
        };
        self.contracts.put(contract.clone()).await?;
        tracing::info!(contract = %contract.uid, assignee = %assignee, "Drew up contract");
        Ok(contract)
    }
}

#[async_trait]
impl Negotiator for ContractNegotiator {
    async fn negotiate(&self, input: NegotiationInput) -> AuthResult<NegotiationResponse> {
        let resolved = self.base.resolve(&input).await?;
        let contract = self.contract_for(&resolved).await?;
        self.base
            .issue(AccessToken::new(resolved.granted).with_contract(contract.uid))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::AllAuthorizer;
    use crate::storage::InMemoryTicketStore;
    use crate::strategy::ImmediateAuthorizerStrategy;
    use crate::token::{OpaqueTokenFactory, TokenFactory};
    use crate::types::{claim_formats, scopes};
    use crate::verifier::UnsecureVerifier;
    use serde_json::json;

    struct Harness {
        negotiator: ContractNegotiator,
        contracts: Arc<InMemoryContractStore>,
        tokens: Arc<OpaqueTokenFactory>,
    }

    fn harness(lifetime: Duration) -> Harness {
        let contracts = Arc::new(InMemoryContractStore::new());
        let tokens = Arc::new(OpaqueTokenFactory::new());
        let base = BaseNegotiator::new(
            Arc::new(UnsecureVerifier::new()),
            Arc::new(InMemoryTicketStore::new()),
            Arc::new(ImmediateAuthorizerStrategy::new(Arc::new(AllAuthorizer::new()))),
            tokens.clone(),
        );
        Harness {
            negotiator: ContractNegotiator::new(base, contracts.clone(), "https://as.example")
                .with_lifetime(lifetime),
            contracts,
            tokens,
        }
    }

    fn request(claims: Value) -> NegotiationInput {
        NegotiationInput::for_permissions(vec![Permission::new("r1", [scopes::READ])])
            .with_claim_token(claims.to_string(), claim_formats::UNSECURE_JSON)
    }

    async fn contract_of(h: &Harness, response: &NegotiationResponse) -> Contract {
        let payload = h.tokens.deserialize(&response.access_token).await.unwrap();
        let uid = payload.contract.unwrap();
        h.contracts.get(&uid).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_contract_drawn_up_and_embedded() {
        let h = harness(Duration::hours(1));
        let response = h
            .negotiator
            .negotiate(request(json!({ "webid": "https://alice", "purpose": "research" })))
            .await
            .unwrap();

        let contract = contract_of(&h, &response).await;
        assert_eq!(contract.permissions.len(), 1);
        let permission = &contract.permissions[0];
        assert_eq!(permission.assigner, "https://as.example");
        assert_eq!(permission.assignee, "https://alice");
        assert_eq!(permission.target, "r1");
        assert_eq!(permission.action, scopes::READ);
        assert_eq!(permission.purpose(), Some(&json!("research")));
        assert!(permission.constraints.iter().any(|c| c.expiry().is_some()));
    }

    #[tokio::test]
    async fn test_contract_reused_for_same_assignee() {
        let h = harness(Duration::hours(1));
        let claims = json!({ "webid": "https://alice" });

        let first = h.negotiator.negotiate(request(claims.clone())).await.unwrap();
        let second = h.negotiator.negotiate(request(claims)).await.unwrap();

        assert_eq!(
            contract_of(&h, &first).await.uid,
            contract_of(&h, &second).await.uid
        );
        assert_eq!(h.contracts.len(), 1);
    }

    #[tokio::test]
    async fn test_new_contract_for_other_assignee_or_purpose() {
        let h = harness(Duration::hours(1));

        h.negotiator
            .negotiate(request(json!({ "webid": "https://alice" })))
            .await
            .unwrap();
        h.negotiator
            .negotiate(request(json!({ "webid": "https://bob" })))
            .await
            .unwrap();
        h.negotiator
            .negotiate(request(json!({ "webid": "https://alice", "purpose": "ads" })))
            .await
            .unwrap();

        assert_eq!(h.contracts.len(), 3);
    }

    #[tokio::test]
    async fn test_expired_contract_not_reused() {
        let h = harness(Duration::seconds(-1));
        let claims = json!({ "webid": "https://alice" });

        h.negotiator.negotiate(request(claims.clone())).await.unwrap();
        h.negotiator.negotiate(request(claims)).await.unwrap();
        assert_eq!(h.contracts.len(), 2);
    }

    #[tokio::test]
    async fn test_anonymous_assignee() {
        let h = harness(Duration::hours(1));
        let response = h
            .negotiator
            .negotiate(NegotiationInput::for_permissions(vec![Permission::new(
                "r1",
                [scopes::READ],
            )]))
            .await
            .unwrap();

        let contract = contract_of(&h, &response).await;
        assert_eq!(contract.permissions[0].assignee, ANONYMOUS);
    }

    #[test]
    fn test_contract_serialization() {
        let contract = Contract {
            uid: "urn:uuid:1".to_string(),
            issued: OffsetDateTime::UNIX_EPOCH,
            permissions: vec![ContractPermission {
                assigner: "a".to_string(),
                assignee: "b".to_string(),
                target: "r1".to_string(),
                action: "read".to_string(),
                constraints: vec![Constraint::purpose(json!("care"))],
            }],
        };

        let value = serde_json::to_value(&contract).unwrap();
        assert_eq!(value["issued"], json!("1970-01-01T00:00:00Z"));
        assert_eq!(
            value["permissions"][0]["constraints"][0]["leftOperand"],
            json!("purpose")
        );
    }
}
