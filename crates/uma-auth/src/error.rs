//! Negotiation error types.
//!
//! Expected negotiation outcomes (a ticket that still misses claims, a policy
//! that grants nothing) are reported as [`Outcome`](crate::types::Outcome)
//! values by the authorizer and strategy layers. The variants below are what
//! reaches the caller of [`Negotiator::negotiate`](crate::negotiator::Negotiator).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DerivationClaim;

/// Errors that can occur while negotiating an access token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token request is malformed or misses its discriminator.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The ticket id is unknown, expired or already consumed.
    #[error("Invalid ticket: {message}")]
    InvalidTicket {
        /// Description of why the ticket is invalid.
        message: String,
    },

    /// No combination of claims could ever satisfy the request.
    #[error("Request denied")]
    RequestDenied,

    /// More claims are needed; the negotiation can continue with `ticket`.
    #[error("Need info: ticket {ticket}")]
    NeedInfo {
        /// Fresh ticket id under which the unsolved ticket was stored.
        ticket: String,
        /// The claims that would help resolve the ticket.
        required_claims: RequiredClaims,
    },

    /// A claim token could not be verified.
    #[error("Claim verification failed: {message}")]
    Verification {
        /// Description of the verifier failure.
        message: String,
    },

    /// An access token could not be deserialized or is not valid.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// An error occurred while storing or retrieving negotiation state.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The server configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTicket` error.
    #[must_use]
    pub fn invalid_ticket(message: impl Into<String>) -> Self {
        Self::InvalidTicket {
            message: message.into(),
        }
    }

    /// Creates a new `NeedInfo` error.
    #[must_use]
    pub fn need_info(ticket: impl Into<String>, required_claims: RequiredClaims) -> Self {
        Self::NeedInfo {
            ticket: ticket.into(),
            required_claims,
        }
    }

    /// Creates a new `Verification` error.
    #[must_use]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::Verification {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidTicket { .. }
                | Self::RequestDenied
                | Self::NeedInfo { .. }
                | Self::InvalidToken { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Verification { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if the client may continue the negotiation.
    #[must_use]
    pub fn has_recourse(&self) -> bool {
        matches!(self, Self::NeedInfo { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::InvalidTicket { .. } => ErrorCategory::Ticket,
            Self::RequestDenied => ErrorCategory::Authorization,
            Self::NeedInfo { .. } => ErrorCategory::Authorization,
            Self::Verification { .. } => ErrorCategory::Collaborator,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the UMA/OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidTicket { .. } => "invalid_grant",
            Self::RequestDenied => "request_denied",
            Self::NeedInfo { .. } => "need_info",
            Self::Verification { .. } => "server_error",
            Self::InvalidToken { .. } => "invalid_token",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Claims a client still has to push, as reported in a `need_info` response.
///
/// `claim_token_format` holds one array per unresolved alternative, listing
/// the claim types that alternative still misses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredClaims {
    /// Remaining claim types, one array per alternative.
    pub claim_token_format: Vec<Vec<String>>,

    /// Upstream access tokens needed for derived resources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derivations: Vec<DerivationClaim>,
}

/// Categories of negotiation errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Unknown or consumed tickets.
    Ticket,
    /// Policy outcomes.
    Authorization,
    /// Token validation errors.
    Token,
    /// Failures of external collaborators (verifiers, evaluators).
    Collaborator,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Ticket => write!(f, "ticket"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Collaborator => write!(f, "collaborator"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
