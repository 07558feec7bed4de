//! Strategy that asks the authorizer on every resolution.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::authorizer::Authorizer;
use crate::strategy::TicketingStrategy;
use crate::types::{ClaimSet, Outcome, Permission, Requirements, Resolution, Ticket};

/// Recomputes grantable permissions from all provided claims each time.
///
/// No requirement tracking happens: the ticket always carries one empty
/// alternative, and the authorizer is the sole judge on resolution.
pub struct ImmediateAuthorizerStrategy {
    authorizer: Arc<dyn Authorizer>,
}

impl ImmediateAuthorizerStrategy {
    /// Creates the strategy around `authorizer`.
    #[must_use]
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

#[async_trait]
impl TicketingStrategy for ImmediateAuthorizerStrategy {
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> AuthResult<Ticket> {
        Ok(Ticket::new(permissions, vec![Requirements::new()]))
    }

    async fn validate_claims(&self, ticket: &mut Ticket, claims: &ClaimSet) -> AuthResult<()> {
        ticket.provide(claims);
        Ok(())
    }

    async fn resolve_ticket(&self, ticket: &Ticket) -> AuthResult<Resolution> {
        let granted: Vec<Permission> = self
            .authorizer
            .permissions(&ticket.provided, Some(&ticket.permissions))
            .await?
            .into_iter()
            .filter(|p| !p.resource_scopes.is_empty())
            .collect();

        if granted.is_empty() {
            tracing::debug!("Authorizer granted nothing for ticket");
            return Ok(Outcome::Failure(Vec::new()));
        }

        Ok(Outcome::Success(granted))
    }
}
