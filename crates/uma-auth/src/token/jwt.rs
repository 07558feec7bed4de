//! Signed access tokens.
//!
//! Tokens are compact JWTs carrying the granted permissions. They are signed
//! with the current key of a [`SigningKeyHolder`]; verification selects the
//! key by the `kid` header so tokens signed before a rotation stay valid
//! while their key is retained.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::SigningKey as EcSigningKey;
use p384::pkcs8::EncodePrivateKey as EcEncodePrivateKey;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::{AccessToken, BEARER, SerializedToken, TokenFactory};
use crate::types::Permission;

/// Why a signed token or a signing key could not be used.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token is malformed, forged, expired or addressed elsewhere.
    #[error("Token rejected: {0}")]
    Rejected(String),

    /// The token names a key that is no longer retained.
    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    /// Key generation or signing failed.
    #[error("Signing key failure: {0}")]
    Key(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Rejected(err.to_string())
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Rejected(_) | JwtError::UnknownKey(_) => {
                AuthError::invalid_token(err.to_string())
            }
            JwtError::Key(_) => AuthError::internal(err.to_string()),
        }
    }
}

fn key_error(err: impl fmt::Display) -> JwtError {
    JwtError::Key(err.to_string())
}

/// Algorithm used to sign access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// RSA with SHA-256.
    RS256,
    /// RSA with SHA-384.
    RS384,
    /// ECDSA over P-384.
    #[default]
    ES384,
}

impl SigningAlgorithm {
    fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Name as used in the `alg` header and JWK member.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }
}

/// Claims of a signed UMA access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UmaTokenClaims {
    /// Issuer (this authorization server).
    pub iss: String,

    /// Audience (the resource servers).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Unique identifier of this issuance.
    pub jti: String,

    /// Granted permissions.
    pub permissions: Vec<Permission>,

    /// Agreement the grant is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

/// Public keys resource servers use to verify access tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    /// Current key first, then retained keys.
    pub keys: Vec<Jwk>,
}

/// Public half of one signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key id, matched against the token's `kid` header.
    pub kid: String,

    /// Always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,

    /// Signing algorithm name.
    pub alg: String,

    /// Key material.
    #[serde(flatten)]
    pub params: JwkParams,
}

/// Key-type specific JWK members, base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum JwkParams {
    /// RSA modulus and exponent.
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },
    /// EC curve and point coordinates.
    #[serde(rename = "EC")]
    Ec { crv: String, x: String, y: String },
}

/// One signing key with its verification half.
pub struct SigningKeyPair {
    /// Key id.
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// When the key was created.
    pub created_at: OffsetDateTime,

    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    params: JwkParams,
}

impl SigningKeyPair {
    /// Generates a fresh key for `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Key` if key generation fails.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        let (encoding_key, decoding_key, params) = match algorithm {
            SigningAlgorithm::RS256 | SigningAlgorithm::RS384 => Self::rsa_keys()?,
            SigningAlgorithm::ES384 => Self::ec_keys()?,
        };

        Ok(Self {
            kid: uuid::Uuid::new_v4().to_string(),
            algorithm,
            created_at: OffsetDateTime::now_utc(),
            encoding_key,
            decoding_key,
            params,
        })
    }

    fn rsa_keys() -> Result<(EncodingKey, DecodingKey, JwkParams), JwtError> {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).map_err(key_error)?;
        let public_key = private_key.to_public_key();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(key_error)?;
        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(key_error)?;

        Ok((
            EncodingKey::from_rsa_pem(private_pem.as_bytes()).map_err(key_error)?,
            DecodingKey::from_rsa_pem(public_pem.as_bytes()).map_err(key_error)?,
            JwkParams::Rsa {
                n: URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                e: URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be()),
            },
        ))
    }

    fn ec_keys() -> Result<(EncodingKey, DecodingKey, JwkParams), JwtError> {
        let secret_key = EcSecretKey::random(&mut OsRng);
        let point = EcSigningKey::from(&secret_key)
            .verifying_key()
            .to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(JwtError::Key("P-384 public point is not affine".to_string()));
        };
        let x = URL_SAFE_NO_PAD.encode(x.as_slice());
        let y = URL_SAFE_NO_PAD.encode(y.as_slice());

        let private_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(key_error)?;

        Ok((
            EncodingKey::from_ec_pem(private_pem.as_bytes()).map_err(key_error)?,
            DecodingKey::from_ec_components(&x, &y).map_err(key_error)?,
            JwkParams::Ec {
                crv: "P-384".to_string(),
                x,
                y,
            },
        ))
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kid: self.kid.clone(),
            key_use: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            params: self.params.clone(),
        }
    }
}

struct KeyRing {
    current: Arc<SigningKeyPair>,
    previous: VecDeque<Arc<SigningKeyPair>>,
}

/// The current signing key plus a bounded history of retired keys.
///
/// Retired keys still verify tokens; only the current key signs.
pub struct SigningKeyHolder {
    algorithm: SigningAlgorithm,
    keys_to_keep: usize,
    ring: RwLock<KeyRing>,
}

impl SigningKeyHolder {
    /// Default number of retired keys kept for verification.
    pub const DEFAULT_KEYS_TO_KEEP: usize = 3;

    /// Creates a holder with a freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn generate(algorithm: SigningAlgorithm, keys_to_keep: usize) -> Result<Self, JwtError> {
        Ok(Self::from_key(SigningKeyPair::generate(algorithm)?, keys_to_keep))
    }

    /// Creates a holder around an existing key.
    #[must_use]
    pub fn from_key(key: SigningKeyPair, keys_to_keep: usize) -> Self {
        Self {
            algorithm: key.algorithm,
            keys_to_keep,
            ring: RwLock::new(KeyRing {
                current: Arc::new(key),
                previous: VecDeque::new(),
            }),
        }
    }

    /// The key used for signing.
    #[must_use]
    pub fn current(&self) -> Arc<SigningKeyPair> {
        Arc::clone(&self.ring.read().current)
    }

    /// Finds a current or retained key by id.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<Arc<SigningKeyPair>> {
        let ring = self.ring.read();
        std::iter::once(&ring.current)
            .chain(ring.previous.iter())
            .find(|key| key.kid == kid)
            .cloned()
    }

    /// Replaces the signing key, retiring the old one.
    ///
    /// Returns the new key id.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn rotate(&self) -> Result<String, JwtError> {
        let key = Arc::new(SigningKeyPair::generate(self.algorithm)?);
        let kid = key.kid.clone();

        let mut ring = self.ring.write();
        let retired = std::mem::replace(&mut ring.current, key);
        ring.previous.push_front(retired);
        ring.previous.truncate(self.keys_to_keep);

        tracing::info!(kid = %kid, retained = ring.previous.len(), "Rotated signing key");
        Ok(kid)
    }

    /// Public keys of every key that can still verify tokens.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        let ring = self.ring.read();
        Jwks {
            keys: std::iter::once(&ring.current)
                .chain(ring.previous.iter())
                .map(|key| key.to_jwk())
                .collect(),
        }
    }
}

/// Issues and verifies signed access tokens.
pub struct JwtTokenFactory {
    keys: Arc<SigningKeyHolder>,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl JwtTokenFactory {
    /// Default token audience.
    pub const DEFAULT_AUDIENCE: &'static str = "solid";

    /// Default token lifetime.
    pub const DEFAULT_LIFETIME: Duration = Duration::minutes(30);

    /// Creates a factory issuing tokens as `issuer`.
    #[must_use]
    pub fn new(keys: Arc<SigningKeyHolder>, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            audience: Self::DEFAULT_AUDIENCE.to_string(),
            lifetime: Self::DEFAULT_LIFETIME,
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Sets the token lifetime.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let key = self.keys.current();
        let mut header = Header::new(key.algorithm.jwt_algorithm());
        header.kid = Some(key.kid.clone());

        encode(&header, claims, &key.encoding_key).map_err(key_error)
    }

    fn verify(&self, token: &str) -> Result<UmaTokenClaims, JwtError> {
        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| JwtError::Rejected("token header has no kid".to_string()))?;
        let key = self.keys.find(&kid).ok_or(JwtError::UnknownKey(kid))?;

        let mut validation = Validation::new(key.algorithm.jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Ok(decode::<UmaTokenClaims>(token, &key.decoding_key, &validation)?.claims)
    }
}

#[async_trait]
impl TokenFactory for JwtTokenFactory {
    async fn serialize(&self, token: &AccessToken) -> AuthResult<SerializedToken> {
        let now = OffsetDateTime::now_utc();
        let claims = UmaTokenClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + self.lifetime).unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            permissions: token.permissions.clone(),
            contract: token.contract.clone(),
        };

        let token = self.sign(&claims)?;
        tracing::debug!(jti = %claims.jti, "Issued signed access token");
        Ok(SerializedToken {
            token,
            token_type: BEARER.to_string(),
        })
    }

    async fn deserialize(&self, token: &str) -> AuthResult<AccessToken> {
        let claims = self.verify(token).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
        })?;

        Ok(AccessToken {
            permissions: claims.permissions,
            contract: claims.contract,
        })
    }
}
