//! Bearer access token extractor.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::http::state::OAuthState;

/// Caller identified by a valid access token.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    /// Login of the token subject.
    pub user: String,
    /// API key the token was issued to.
    pub api_key: String,
}

/// Error returned when bearer authentication fails.
#[derive(Debug, Clone, Serialize)]
pub struct BearerAuthError {
    pub error: String,
    pub error_description: String,
}

impl BearerAuthError {
    fn new(error: &str, error_description: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            error_description: error_description.into(),
        }
    }
}

impl IntoResponse for BearerAuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(self),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    OAuthState: FromRef<S>,
{
    type Rejection = BearerAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let oauth = OAuthState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BearerAuthError::new("invalid_request", "Missing Authorization header"))?;

        let raw = parse_bearer(auth_header).ok_or_else(|| {
            BearerAuthError::new(
                "invalid_request",
                "Authorization header must start with 'Bearer '",
            )
        })?;

        let token = oauth
            .grants
            .authenticate_bearer(raw)
            .map_err(|e| BearerAuthError::new("invalid_token", e.to_string()))?;

        tracing::debug!(
            api_key = %token.api_key(),
            user = %token.user(),
            endpoint = %parts.uri.path(),
            method = %parts.method,
            "Bearer token accepted"
        );

        Ok(BearerAuth {
            user: token.user().to_string(),
            api_key: token.api_key().to_string(),
        })
    }
}

fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
