//! # uma-auth
//!
//! Negotiation engine of a UMA 2.0 authorization server.
//!
//! This crate provides:
//! - The ticket lifecycle state machine of the UMA grant
//! - Pluggable authorizers, including namespace delegation and policy engines
//! - Claim-requirement resolution over disjunctive alternatives
//! - Cross-server derivation with encrypted synthetic resource ids
//! - Signed and opaque access token issuance
//!
//! ## Overview
//!
//! A client requests permissions and receives either a token, a terminal
//! denial, or a `need_info` answer with a fresh ticket and the claims still
//! missing. It pushes claim tokens with the ticket until the request
//! resolves. Each ticket id is redeemable once.
//!
//! ## Modules
//!
//! - [`types`] - Permissions, claims, requirements and tickets
//! - [`authorizer`] - Policy decisions over claims and permissions
//! - [`strategy`] - How tickets are created, updated and resolved
//! - [`negotiator`] - The request-level state machine
//! - [`verifier`] - Claim token verification
//! - [`token`] - Access token issuance and introspection
//! - [`storage`] - Ticket, description and derivation issuer stores
//! - [`config`] - Engine configuration
//! - [`http`] - Token endpoint response mapping

pub mod authorizer;
pub mod config;
pub mod error;
pub mod http;
pub mod negotiator;
pub mod storage;
pub mod strategy;
pub mod token;
pub mod types;
pub mod verifier;

pub use authorizer::{
    AllAuthorizer, Authorizer, NamespacedAuthorizer, NoneAuthorizer, PolicyAuthorizer,
    PolicyEvaluator, PolicyRequest, PolicyVerdict, PublicNamespaceAuthorizer, ScopeVocabulary,
    WebIdAuthorizer,
};
pub use config::{ConfigError, UmaConfig};
pub use error::{AuthError, ErrorCategory, RequiredClaims};
pub use negotiator::{
    BaseNegotiator, Contract, ContractNegotiator, ContractStore, InMemoryContractStore,
    NegotiationInput, NegotiationResponse, Negotiator,
};
pub use storage::{
    DerivationIssuerStore, DescriptionStore, InMemoryDerivationIssuerStore,
    InMemoryDescriptionStore, InMemoryTicketStore, ResourceDescription, TicketStore,
};
pub use strategy::{
    AggregatorStrategy, ClaimEliminationStrategy, DerivationIdCodec, ImmediateAuthorizerStrategy,
    TicketingStrategy,
};
pub use token::{
    AccessToken, JwtTokenFactory, OpaqueTokenFactory, SerializedToken, SigningAlgorithm,
    SigningKeyHolder, TokenFactory,
};
pub use types::{
    ClaimSet, MissingClaims, Outcome, Permission, Requirements, Resolution, Ticket, claim_formats,
    claim_types, scopes,
};
pub use verifier::{
    AccessTokenVerifier, ClaimToken, TypedVerifier, UnsecureVerifier, Verifier,
};

/// Type alias for negotiation results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use uma_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::authorizer::Authorizer;
    pub use crate::error::{AuthError, RequiredClaims};
    pub use crate::negotiator::{NegotiationInput, NegotiationResponse, Negotiator};
    pub use crate::storage::{DescriptionStore, TicketStore};
    pub use crate::strategy::TicketingStrategy;
    pub use crate::token::{AccessToken, TokenFactory};
    pub use crate::types::{ClaimSet, Permission, Requirements, Ticket};
    pub use crate::verifier::{ClaimToken, Verifier};
}
