//! Negotiation engine configuration.
//!
//! Durations are written in humantime notation (`30m`, `1h`). Every section
//! has defaults, so an empty document plus an `issuer` is a valid config.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::authorizer::{Authorizer, PublicNamespaceAuthorizer, WebIdAuthorizer};
use crate::error::AuthError;
use crate::storage::{DescriptionStore, InMemoryTicketStore};
use crate::token::{
    JwtTokenFactory, OpaqueTokenFactory, SigningAlgorithm, SigningKeyHolder, TokenFactory,
};

/// Root configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://as.example.com"
///
/// [ticket]
/// lifetime = "30m"
///
/// [token]
/// format = "jwt"
/// lifetime = "30m"
/// audience = "solid"
///
/// [signing]
/// algorithm = "ES384"
/// keys_to_keep = 3
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UmaConfig {
    /// Issuer URL (used as the token `iss` claim and contract assigner).
    pub issuer: String,

    /// Ticket configuration.
    pub ticket: TicketConfig,

    /// Access token configuration.
    pub token: TokenConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Built-in policy configuration.
    pub policy: PolicyConfig,
}

/// Ticket configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TicketConfig {
    /// How long an unresolved ticket id stays redeemable.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(30 * 60),
        }
    }
}

/// Kind of access token issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// Signed JWT with embedded permissions.
    #[default]
    Jwt,
    /// Random reference token.
    Opaque,
}

/// Access token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Token kind.
    pub format: TokenFormat,

    /// Token lifetime.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,

    /// Audience of issued tokens.
    pub audience: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            format: TokenFormat::Jwt,
            lifetime: Duration::from_secs(30 * 60),
            audience: JwtTokenFactory::DEFAULT_AUDIENCE.to_string(),
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Number of retired keys kept for verification after rotation.
    pub keys_to_keep: usize,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::ES384,
            keys_to_keep: SigningKeyHolder::DEFAULT_KEYS_TO_KEEP,
        }
    }
}

/// Configuration of the built-in authorizers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Namespaces readable by anyone.
    pub public_namespaces: Vec<String>,

    /// WebIDs allowed by the WebID allow-list authorizer.
    pub webids: Vec<String>,
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::configuration(err.to_string())
    }
}

fn to_time(duration: Duration) -> time::Duration {
    time::Duration::try_from(duration).unwrap_or(time::Duration::MAX)
}

impl UmaConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the document does not parse,
    /// or any error of [`validate`](Self::validate).
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The issuer is not an absolute URL
    /// - A lifetime is zero
    /// - The token audience is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        if url::Url::parse(&self.issuer).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "issuer '{}' is not an absolute URL",
                self.issuer
            )));
        }

        if self.ticket.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "ticket.lifetime must be > 0".to_string(),
            ));
        }

        if self.token.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token.lifetime must be > 0".to_string(),
            ));
        }

        if self.token.audience.is_empty() {
            return Err(ConfigError::InvalidValue(
                "token.audience cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Ticket lifetime as a signed duration.
    #[must_use]
    pub fn ticket_lifetime(&self) -> time::Duration {
        to_time(self.ticket.lifetime)
    }

    /// Token lifetime as a signed duration.
    #[must_use]
    pub fn token_lifetime(&self) -> time::Duration {
        to_time(self.token.lifetime)
    }

    /// Builds the ticket store.
    #[must_use]
    pub fn ticket_store(&self) -> InMemoryTicketStore {
        InMemoryTicketStore::with_lifetime(self.ticket_lifetime())
    }

    /// Builds the configured authorizer: resources in `public_namespaces`
    /// are open to anyone, the rest to the listed WebIDs.
    #[must_use]
    pub fn authorizer(&self, descriptions: Arc<dyn DescriptionStore>) -> Arc<dyn Authorizer> {
        let private = Arc::new(WebIdAuthorizer::new(self.policy.webids.clone()));
        Arc::new(PublicNamespaceAuthorizer::new(
            private,
            self.policy.public_namespaces.clone(),
            descriptions,
        ))
    }

    /// Builds the token factory, generating a signing key when needed.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation fails.
    pub fn token_factory(&self) -> AuthResult<Arc<dyn TokenFactory>> {
        match self.token.format {
            TokenFormat::Opaque => Ok(Arc::new(OpaqueTokenFactory::with_lifetime(
                self.token_lifetime(),
            ))),
            TokenFormat::Jwt => {
                let keys =
                    SigningKeyHolder::generate(self.signing.algorithm, self.signing.keys_to_keep)?;
                Ok(Arc::new(
                    JwtTokenFactory::new(Arc::new(keys), self.issuer.clone())
                        .with_audience(self.token.audience.clone())
                        .with_lifetime(self.token_lifetime()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDescriptionStore;
    use crate::token::AccessToken;
    use crate::types::{ClaimSet, Permission, claim_types};
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = UmaConfig::default();
        assert_eq!(config.ticket.lifetime, Duration::from_secs(1800));
        assert_eq!(config.token.format, TokenFormat::Jwt);
        assert_eq!(config.token.audience, "solid");
        assert_eq!(config.signing.algorithm, SigningAlgorithm::ES384);
        assert_eq!(config.signing.keys_to_keep, 3);
    }

    #[test]
    fn test_default_needs_issuer() {
        let err = UmaConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_from_toml() {
        let config = UmaConfig::from_toml_str(
            r#"
            issuer = "https://as.example"

            [ticket]
            lifetime = "5m"

            [token]
            format = "opaque"
            lifetime = "1h"

            [signing]
            algorithm = "RS384"
            keys_to_keep = 1

            [policy]
            public_namespaces = ["public"]
            webids = ["https://alice"]
            "#,
        )
        .unwrap();

        assert_eq!(config.ticket_lifetime(), time::Duration::minutes(5));
        assert_eq!(config.token.format, TokenFormat::Opaque);
        assert_eq!(config.token_lifetime(), time::Duration::hours(1));
        assert_eq!(config.token.audience, "solid");
        assert_eq!(config.signing.algorithm, SigningAlgorithm::RS384);
        assert_eq!(config.policy.public_namespaces, vec!["public"]);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let err = UmaConfig::from_toml_str(
            r#"
            issuer = "https://as.example"
            [signing]
            algorithm = "HS256"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = UmaConfig {
            issuer: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        config.issuer = "https://as.example".to_string();
        config.ticket.lifetime = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ticket.lifetime"));

        config.ticket.lifetime = Duration::from_secs(60);
        config.token.audience = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("audience"));
    }

    #[tokio::test]
    async fn test_authorizer_from_policy_section() {
        let config = UmaConfig::from_toml_str(
            r#"
            issuer = "https://as.example"

            [policy]
            public_namespaces = ["public"]
            webids = ["https://alice"]
            "#,
        )
        .unwrap();
        let authorizer = config.authorizer(Arc::new(InMemoryDescriptionStore::new()));

        let public = vec![Permission::new("https://pod.example/bob/public/cv", ["read"])];
        let private = vec![Permission::new("https://pod.example/bob/private/diary", ["read"])];
        let anonymous = ClaimSet::new();
        let mut alice = ClaimSet::new();
        alice.insert(claim_types::WEBID.to_string(), json!("https://alice"));

        assert_eq!(
            authorizer.permissions(&anonymous, Some(&public)).await.unwrap(),
            public
        );
        assert!(
            authorizer
                .permissions(&anonymous, Some(&private))
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            authorizer.permissions(&alice, Some(&private)).await.unwrap(),
            private
        );
        assert!(authorizer.credentials(&public, None).await.unwrap()[0].is_solved());
        assert_eq!(
            authorizer.credentials(&private, None).await.unwrap()[0].claim_types(),
            vec!["webid"]
        );
    }

    #[tokio::test]
    async fn test_token_factories_from_config() {
        let mut config = UmaConfig {
            issuer: "https://as.example".to_string(),
            ..Default::default()
        };
        let token = AccessToken::new(vec![Permission::new("r1", ["read"])]);

        for format in [TokenFormat::Jwt, TokenFormat::Opaque] {
            config.token.format = format;
            let factory = config.token_factory().unwrap();
            let serialized = factory.serialize(&token).await.unwrap();
            assert_eq!(factory.deserialize(&serialized.token).await.unwrap(), token);
        }
    }
}
