//! Refresh-token entry endpoints for bearer-authenticated callers.
//!
//! Both endpoints act on the entry of the (user, API key) pair named by the
//! presented access token.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AuthError;
use crate::extractors::BearerAuth;
use crate::http::error::{ErrorResponse, json_error, server_error_status};
use crate::http::state::OAuthState;

/// `GET /refresh/info`: counters of the caller's refresh-token entry.
pub async fn refresh_info_handler(State(state): State<OAuthState>, auth: BearerAuth) -> Response {
    match state
        .grants
        .refresh_tokens()
        .entry_info(&auth.user, &auth.api_key)
        .await
    {
        Ok(Some(info)) => Json(info).into_response(),
        Ok(None) => not_found(),
        Err(e) => storage_failure(&e),
    }
}

/// `DELETE /refresh`: drops the caller's refresh-token entry.
pub async fn refresh_revoke_handler(State(state): State<OAuthState>, auth: BearerAuth) -> Response {
    match state
        .grants
        .refresh_tokens()
        .revoke(&auth.user, &auth.api_key)
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(),
        Err(e) => storage_failure(&e),
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not_found".to_string(),
            error_description: "No refresh token has been issued for this user and api-key"
                .to_string(),
        }),
    )
        .into_response()
}

fn storage_failure(error: &AuthError) -> Response {
    json_error(server_error_status(error), error)
}
