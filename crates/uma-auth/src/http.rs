//! HTTP response mapping for the token endpoint.
//!
//! Formatting only: `need_info` becomes a 403 carrying the ticket and the
//! outstanding claims, a terminal denial an empty 403, other client errors
//! an OAuth `{error, error_description}` body.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::negotiator::NegotiationResponse;

/// Description sent for server errors; the detail only goes to the log.
const SERVER_ERROR_DESCRIPTION: &str = "The authorization server could not process the request.";

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_code(&self);

        match self {
            AuthError::NeedInfo {
                ticket,
                required_claims,
            } => (
                status,
                Json(json!({
                    "ticket": ticket,
                    "required_claims": required_claims,
                })),
            )
                .into_response(),
            AuthError::RequestDenied => status.into_response(),
            other => {
                let error = other.oauth_error_code();
                let description = if other.is_server_error() {
                    tracing::error!(error = %other, category = %other.category(), "Token request failed");
                    SERVER_ERROR_DESCRIPTION.to_string()
                } else {
                    other.to_string()
                };
                let mut headers = HeaderMap::new();
                if status == StatusCode::UNAUTHORIZED {
                    let challenge = format!(
                        "Bearer error=\"{}\", error_description=\"{}\"",
                        error,
                        description.replace('"', "\\\"")
                    );
                    if let Ok(value) = HeaderValue::from_str(&challenge) {
                        headers.insert(header::WWW_AUTHENTICATE, value);
                    }
                }

                (
                    status,
                    headers,
                    Json(json!({
                        "error": error,
                        "error_description": description,
                    })),
                )
                    .into_response()
            }
        }
    }
}

impl IntoResponse for NegotiationResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

fn status_code(error: &AuthError) -> StatusCode {
    match error {
        AuthError::NeedInfo { .. } | AuthError::RequestDenied => StatusCode::FORBIDDEN,
        AuthError::InvalidRequest { .. } | AuthError::InvalidTicket { .. } => {
            StatusCode::BAD_REQUEST
        }
        AuthError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Verification { .. }
        | AuthError::Storage { .. }
        | AuthError::Configuration { .. }
        | AuthError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequiredClaims;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_need_info_body_is_exact() {
        let error = AuthError::need_info(
            "t1",
            RequiredClaims {
                claim_token_format: vec![vec!["webid".to_string()], vec![]],
                derivations: Vec::new(),
            },
        );

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            json!({
                "ticket": "t1",
                "required_claims": { "claim_token_format": [["webid"], []] },
            })
        );
    }

    #[tokio::test]
    async fn test_denied_has_empty_body() {
        let response = AuthError::RequestDenied.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_ticket_is_invalid_grant() {
        let response =
            AuthError::invalid_ticket("The provided ticket is not valid.").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_grant");
        assert!(
            body["error_description"]
                .as_str()
                .unwrap()
                .contains("The provided ticket is not valid.")
        );
    }

    #[tokio::test]
    async fn test_invalid_token_challenge() {
        let response = AuthError::invalid_token("expired").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_server_errors() {
        for error in [
            AuthError::verification("identity provider down"),
            AuthError::storage("ticket table unreachable"),
            AuthError::internal("namespace medical misconfigured"),
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let body = body_json(response).await;
            assert_eq!(body["error"], "server_error");
            assert_eq!(body["error_description"], SERVER_ERROR_DESCRIPTION);
        }
    }

    #[tokio::test]
    async fn test_negotiation_response() {
        let response = NegotiationResponse {
            access_token: "tok".to_string(),
            token_type: "Bearer".to_string(),
            derivation_resource_id: Some("d1".to_string()),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "access_token": "tok", "token_type": "Bearer", "derivation_resource_id": "d1" })
        );
    }
}
