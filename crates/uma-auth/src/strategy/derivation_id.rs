//! Reversible encryption of resource ids into synthetic derivation ids.
//!
//! A synthetic id is `nonce:tag:ciphertext` in lowercase hex, produced by
//! AES-256-GCM under a key held only by this process. Decoding needs no
//! lookup table and detects tampering.

use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce, Tag};

use crate::AuthResult;
use crate::error::AuthError;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Encoder/decoder for synthetic derivation ids.
pub struct DerivationIdCodec {
    cipher: Aes256Gcm,
}

impl DerivationIdCodec {
    /// Creates a codec with a fresh random key.
    ///
    /// Ids issued by one codec cannot be decoded by another, so a process
    /// restart invalidates every synthetic id handed out before.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }

    /// Creates a codec from existing key material.
    #[must_use]
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Encrypts `resource_id` under a fresh nonce.
    ///
    /// # Errors
    ///
    /// Returns an internal error if encryption fails.
    pub fn encode(&self, resource_id: &str) -> AuthResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut buffer = resource_id.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(&nonce, b"", &mut buffer)
            .map_err(|e| AuthError::internal(format!("Derivation id encryption failed: {}", e)))?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce),
            hex::encode(tag),
            hex::encode(buffer)
        ))
    }

    /// Decrypts a synthetic id.
    ///
    /// Returns `None` for anything this codec did not produce, including
    /// real ids that happen to look like synthetic ones.
    #[must_use]
    pub fn decode(&self, synthetic_id: &str) -> Option<String> {
        let mut parts = synthetic_id.split(':');
        let (nonce, tag, ciphertext) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let nonce = hex::decode(nonce).ok().filter(|n| n.len() == NONCE_LEN)?;
        let tag = hex::decode(tag).ok().filter(|t| t.len() == TAG_LEN)?;
        let mut buffer = hex::decode(ciphertext).ok()?;

        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                b"",
                &mut buffer,
                Tag::from_slice(&tag),
            )
            .ok()?;

        String::from_utf8(buffer).ok()
    }
}
