//! Verifier that trusts whatever the client pushes.

use async_trait::async_trait;
use serde_json::Value;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{ClaimSet, claim_formats, claim_types};
use crate::verifier::{ClaimToken, Verifier};

/// Accepts claim tokens without any cryptographic check.
///
/// Two formats are understood: [`claim_formats::UNSECURE_WEBID`], where the
/// token is the WebID itself, and [`claim_formats::UNSECURE_JSON`], where the
/// token is a JSON object of claims. For development only.
pub struct UnsecureVerifier {
    _private: (),
}

impl UnsecureVerifier {
    /// Creates the verifier.
    #[must_use]
    pub fn new() -> Self {
        tracing::warn!("UnsecureVerifier accepts unverified claims; do not use in production");
        Self { _private: () }
    }
}

impl Default for UnsecureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Verifier for UnsecureVerifier {
    async fn verify(&self, token: &ClaimToken) -> AuthResult<ClaimSet> {
        match token.format.as_str() {
            claim_formats::UNSECURE_WEBID => {
                let mut claims = ClaimSet::new();
                claims.insert(
                    claim_types::WEBID.to_string(),
                    Value::String(token.token.clone()),
                );
                Ok(claims)
            }
            claim_formats::UNSECURE_JSON => {
                match serde_json::from_str::<Value>(&token.token) {
                    Ok(Value::Object(map)) => Ok(map.into_iter().collect()),
                    Ok(_) => Err(AuthError::verification(
                        "JSON claim token must be an object",
                    )),
                    Err(e) => Err(AuthError::verification(format!(
                        "JSON claim token is not valid JSON: {}",
                        e
                    ))),
                }
            }
            other => Err(AuthError::invalid_request(format!(
                "Unsupported claim token format: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_webid_format() {
        let verifier = UnsecureVerifier::new();
        let claims = verifier
            .verify(&ClaimToken::new("https://alice", claim_formats::UNSECURE_WEBID))
            .await
            .unwrap();

        assert_eq!(claims.get(claim_types::WEBID), Some(&json!("https://alice")));
    }

    #[tokio::test]
    async fn test_json_format() {
        let verifier = UnsecureVerifier::new();
        let claims = verifier
            .verify(&ClaimToken::new(
                r#"{"webid":"https://alice","purpose":"research"}"#,
                claim_formats::UNSECURE_JSON,
            ))
            .await
            .unwrap();

        assert_eq!(claims.len(), 2);
        assert_eq!(claims.get(claim_types::PURPOSE), Some(&json!("research")));
    }

    #[tokio::test]
    async fn test_json_must_be_object() {
        let verifier = UnsecureVerifier::new();
        for token in ["[1,2]", "{not json"] {
            let result = verifier
                .verify(&ClaimToken::new(token, claim_formats::UNSECURE_JSON))
                .await;
            assert!(matches!(result, Err(AuthError::Verification { .. })));
        }
    }

    #[tokio::test]
    async fn test_unknown_format_rejected() {
        let verifier = UnsecureVerifier::new();
        let result = verifier
            .verify(&ClaimToken::new("x", "urn:unknown"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidRequest { .. })));
    }
}
