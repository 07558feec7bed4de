//! Cross-server derivation handling.
//!
//! A resource registered as `derived_from` upstream resources can only be
//! released once the requesting party shows, for every upstream source, an
//! access token from the upstream authorization server granting
//! `derivation-read` on the synthetic id that server issued.
//!
//! Resources owned by this server are addressed by synthetic ids too when
//! requested for derivation: ids produced by [`DerivationIdCodec`] are
//! decoded before reaching the wrapped strategy and re-encoded on the way
//! out, so internal identifiers never leave this server.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{DerivationIssuerStore, DescriptionStore};
use crate::strategy::{DerivationIdCodec, TicketingStrategy};
use crate::types::{
    ClaimSet, DerivationClaim, MissingClaims, Outcome, Permission, Resolution, Ticket,
    claim_formats, claim_types, scopes,
};

/// Decorator adding derivation requirements to another strategy.
pub struct AggregatorStrategy {
    inner: Arc<dyn TicketingStrategy>,
    codec: Arc<DerivationIdCodec>,
    descriptions: Arc<dyn DescriptionStore>,
    issuers: Arc<dyn DerivationIssuerStore>,
}

impl AggregatorStrategy {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(
        inner: Arc<dyn TicketingStrategy>,
        codec: Arc<DerivationIdCodec>,
        descriptions: Arc<dyn DescriptionStore>,
        issuers: Arc<dyn DerivationIssuerStore>,
    ) -> Self {
        Self {
            inner,
            codec,
            descriptions,
            issuers,
        }
    }

    /// Grants carried by an `access` claim, if it has the expected shape.
    fn access_grants(value: &Value) -> Option<Vec<Permission>> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Maps granted permissions back to the external id vocabulary.
    fn encode_granted(&self, ticket: &Ticket, granted: Vec<Permission>) -> AuthResult<Vec<Permission>> {
        granted
            .into_iter()
            .map(|mut permission| -> AuthResult<Permission> {
                if let Some(alias) = ticket.aliases.get(&permission.resource_id) {
                    permission.resource_id = alias.clone();
                } else if permission.has_scope(scopes::DERIVATION_READ) {
                    permission.resource_id = self.codec.encode(&permission.resource_id)?;
                }
                Ok(permission)
            })
            .collect()
    }

    async fn outstanding_derivations(&self, ticket: &Ticket) -> AuthResult<Vec<MissingClaims>> {
        let mut missing = Vec::with_capacity(ticket.derived_ids.len());
        for id in &ticket.derived_ids {
            let issuer = self.issuers.get(id).await?.ok_or_else(|| {
                AuthError::internal(format!("No issuer recorded for derivation id {}", id))
            })?;
            missing.push(MissingClaims::Derivation(DerivationClaim {
                claim_token_format: claim_formats::ACCESS_TOKEN.to_string(),
                issuer,
                derivation_resource_id: id.clone(),
                resource_scopes: vec![scopes::DERIVATION_READ.to_string()],
            }));
        }
        Ok(missing)
    }
}

#[async_trait]
impl TicketingStrategy for AggregatorStrategy {
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> AuthResult<Ticket> {
        let mut aliases = BTreeMap::new();
        let permissions: Vec<Permission> = permissions
            .into_iter()
            .map(|mut permission| {
                if let Some(real) = self.codec.decode(&permission.resource_id) {
                    aliases.insert(real.clone(), permission.resource_id);
                    permission.resource_id = real;
                }
                permission
            })
            .collect();

        let mut ticket = self.inner.initialize_ticket(permissions.clone()).await?;
        ticket.aliases.extend(aliases);

        for permission in &permissions {
            let Some(description) = self.descriptions.get(&permission.resource_id).await? else {
                continue;
            };

            for source in description.derived_from {
                self.issuers
                    .set(&source.derivation_resource_id, &source.issuer)
                    .await?;
                if ticket.derived_ids.insert(source.derivation_resource_id.clone()) {
                    tracing::debug!(
                        resource = %permission.resource_id,
                        issuer = %source.issuer,
                        "Resource requires upstream derivation access"
                    );
                    ticket.permissions.push(Permission::new(
                        source.derivation_resource_id,
                        [scopes::DERIVATION_READ],
                    ));
                }
            }
        }

        Ok(ticket)
    }

    async fn validate_claims(&self, ticket: &mut Ticket, claims: &ClaimSet) -> AuthResult<()> {
        let mut claims = claims.clone();

        if let Some(access) = claims.get_mut(claim_types::ACCESS)
            && let Some(mut grants) = Self::access_grants(access)
        {
            for grant in &grants {
                if grant.has_scope(scopes::DERIVATION_READ)
                    && ticket.derived_ids.remove(&grant.resource_id)
                {
                    tracing::debug!(derivation = %grant.resource_id, "Derivation access proven");
                    ticket
                        .permissions
                        .retain(|p| p.resource_id != grant.resource_id);
                }
            }

            for grant in &mut grants {
                if let Some(real) = self.codec.decode(&grant.resource_id) {
                    grant.resource_id = real;
                }
            }
            *access = serde_json::to_value(grants)
                .map_err(|e| AuthError::internal(format!("Failed to encode grants: {}", e)))?;
        }

        self.inner.validate_claims(ticket, &claims).await
    }

    async fn resolve_ticket(&self, ticket: &Ticket) -> AuthResult<Resolution> {
        let mut view = ticket.clone();
        view.permissions = ticket.resource_permissions();
        view.derived_ids.clear();

        let resolution = self.inner.resolve_ticket(&view).await?;
        let derivations = self.outstanding_derivations(ticket).await?;

        Ok(match resolution {
            Outcome::Success(granted) if derivations.is_empty() => {
                Outcome::Success(self.encode_granted(ticket, granted)?)
            }
            Outcome::Success(_) => Outcome::Failure(derivations),
            Outcome::Failure(mut missing) => {
                missing.extend(derivations);
                Outcome::Failure(missing)
            }
        })
    }
}
