//! Access token issuance and introspection.
//!
//! - [`JwtTokenFactory`] - signed compact tokens with embedded permissions
//! - [`OpaqueTokenFactory`] - random reference tokens backed by a side table

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::types::Permission;

pub mod jwt;
pub mod opaque;

pub use jwt::{
    Jwk, JwkParams, Jwks, JwtError, JwtTokenFactory, SigningAlgorithm, SigningKeyHolder,
    SigningKeyPair, UmaTokenClaims,
};
pub use opaque::OpaqueTokenFactory;

/// Token type reported for every issued access token.
pub const BEARER: &str = "Bearer";

/// The payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Granted permissions.
    pub permissions: Vec<Permission>,

    /// Identifier of the agreement the grant is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl AccessToken {
    /// Creates a payload carrying `permissions`.
    #[must_use]
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self {
            permissions,
            contract: None,
        }
    }

    /// Binds the payload to a contract.
    #[must_use]
    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }
}

/// A serialized access token as handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedToken {
    /// The credential string.
    pub token: String,
    /// The OAuth token type.
    pub token_type: String,
}

/// Serializes granted permissions into bearer credentials and back.
#[async_trait]
pub trait TokenFactory: Send + Sync {
    /// Issues a credential for `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if signing or storage fails.
    async fn serialize(&self, token: &AccessToken) -> AuthResult<SerializedToken>;

    /// Recovers the payload of a credential issued by this factory.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`](crate::AuthError::InvalidToken) if
    /// the credential is unknown, expired or malformed.
    async fn deserialize(&self, token: &str) -> AuthResult<AccessToken>;
}
