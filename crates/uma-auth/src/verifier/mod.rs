//! Claim-token verification.
//!
//! A [`Verifier`] turns a pushed claim token into a [`ClaimSet`]. The
//! negotiator runs it on every claim token of a request before any claim
//! reaches the ticketing strategy.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::types::ClaimSet;

pub mod access_token;
pub mod typed;
pub mod unsecure;

pub use access_token::AccessTokenVerifier;
pub use typed::TypedVerifier;
pub use unsecure::UnsecureVerifier;

/// A claim token together with its declared format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimToken {
    /// The token as pushed by the client.
    #[serde(rename = "claim_token")]
    pub token: String,
    /// Format identifier of the token.
    #[serde(rename = "claim_token_format")]
    pub format: String,
}

impl ClaimToken {
    /// Creates a claim token.
    #[must_use]
    pub fn new(token: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            format: format.into(),
        }
    }
}

/// Verifies claim tokens.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verifies `token` and returns the claims it proves.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be verified or its format is not
    /// supported.
    async fn verify(&self, token: &ClaimToken) -> AuthResult<ClaimSet>;
}
