//! Ticket lifecycle orchestration.
//!
//! A [`TicketingStrategy`] decides how a [`Ticket`] is created from a
//! permission request, how presented claims change it, and when it resolves:
//!
//! - [`ImmediateAuthorizerStrategy`] re-evaluates the authorizer on every
//!   resolution attempt.
//! - [`ClaimEliminationStrategy`] computes requirement alternatives once and
//!   eliminates them as claims arrive.
//! - [`AggregatorStrategy`] decorates another strategy with cross-server
//!   derivation handling.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{ClaimSet, Permission, Resolution, Ticket};

pub mod aggregator;
pub mod claim_elimination;
pub mod derivation_id;
pub mod immediate;

pub use aggregator::AggregatorStrategy;
pub use claim_elimination::ClaimEliminationStrategy;
pub use derivation_id::DerivationIdCodec;
pub use immediate::ImmediateAuthorizerStrategy;

/// Strategy driving the evolution of a ticket.
#[async_trait]
pub trait TicketingStrategy: Send + Sync {
    /// Creates a ticket for a fresh permission request.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails.
    async fn initialize_ticket(&self, permissions: Vec<Permission>) -> AuthResult<Ticket>;

    /// Absorbs verified `claims` into `ticket`.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails.
    async fn validate_claims(&self, ticket: &mut Ticket, claims: &ClaimSet) -> AuthResult<()>;

    /// Decides whether `ticket` resolves, without changing it.
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails.
    async fn resolve_ticket(&self, ticket: &Ticket) -> AuthResult<Resolution>;
}
