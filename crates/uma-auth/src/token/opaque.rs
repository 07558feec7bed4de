//! Opaque reference tokens.
//!
//! The client receives 32 random bytes in hex. Only their SHA-256 hash is
//! kept, next to the payload and its expiry, so a leaked table does not leak
//! usable credentials.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::{AccessToken, BEARER, SerializedToken, TokenFactory};

struct StoredToken {
    payload: AccessToken,
    expires_at: OffsetDateTime,
}

/// Token factory issuing random reference tokens.
pub struct OpaqueTokenFactory {
    tokens: DashMap<String, StoredToken>,
    lifetime: Duration,
}

impl OpaqueTokenFactory {
    /// Default token lifetime.
    pub const DEFAULT_LIFETIME: Duration = Duration::minutes(30);

    /// Creates a factory with the default lifetime.
    #[must_use]
    pub fn new() -> Self {
        Self::with_lifetime(Self::DEFAULT_LIFETIME)
    }

    /// Creates a factory whose tokens expire after `lifetime`.
    #[must_use]
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            lifetime,
        }
    }

    /// Removes expired tokens, returning how many were dropped.
    pub fn cleanup_expired(&self) -> u64 {
        let now = OffsetDateTime::now_utc();
        let mut removed = 0u64;
        self.tokens.retain(|_, stored| {
            let live = stored.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });
        tracing::debug!(removed, "Swept expired opaque tokens");
        removed
    }

    fn hash(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }
}

impl Default for OpaqueTokenFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenFactory for OpaqueTokenFactory {
    async fn serialize(&self, token: &AccessToken) -> AuthResult<SerializedToken> {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let credential = hex::encode(bytes);

        self.tokens.insert(
            Self::hash(&credential),
            StoredToken {
                payload: token.clone(),
                expires_at: OffsetDateTime::now_utc() + self.lifetime,
            },
        );

        Ok(SerializedToken {
            token: credential,
            token_type: BEARER.to_string(),
        })
    }

    async fn deserialize(&self, token: &str) -> AuthResult<AccessToken> {
        let key = Self::hash(token);
        let Some(stored) = self.tokens.get(&key) else {
            return Err(AuthError::invalid_token("Unknown access token"));
        };

        if stored.expires_at <= OffsetDateTime::now_utc() {
            drop(stored);
            self.tokens.remove(&key);
            return Err(AuthError::invalid_token("Access token expired"));
        }

        Ok(stored.payload.clone())
    }
}
