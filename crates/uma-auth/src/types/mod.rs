//! Core negotiation types.
//!
//! - [`Permission`] - a resource with requested or granted scopes
//! - [`ClaimSet`] and [`Requirements`] - what was proven and what is missing
//! - [`Ticket`] - the unit of negotiation state
//! - [`Outcome`] - tagged success/failure for expected outcomes

pub mod claims;
pub mod outcome;
pub mod permission;
pub mod ticket;

pub use claims::{ClaimPredicate, ClaimSet, Requirements, claim_formats, claim_types};
pub use outcome::Outcome;
pub use permission::{ANY_RESOURCE, ANY_SCOPE, Permission, covers, scopes};
pub use ticket::{DerivationClaim, MissingClaims, Resolution, Ticket};
