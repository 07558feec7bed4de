//! Storage traits for negotiation state.
//!
//! This module defines storage interfaces for:
//!
//! - Unresolved tickets (single-use, atomic take)
//! - Registered resource descriptions
//! - Derivation id issuers
//!
//! Each trait comes with an in-memory implementation backed by `DashMap`.

pub mod derivation;
pub mod description;
pub mod ticket;

pub use derivation::{DerivationIssuerStore, InMemoryDerivationIssuerStore};
pub use description::{
    DerivedFrom, DescriptionStore, InMemoryDescriptionStore, ResourceDescription, namespace_of,
    resource_namespace,
};
pub use ticket::{DEFAULT_TICKET_LIFETIME, InMemoryTicketStore, TicketStore};
