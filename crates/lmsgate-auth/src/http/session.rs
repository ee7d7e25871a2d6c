//! Session exchange endpoint.
//!
//! ```ignore
//! POST /v1/oauth2/session/bearer
//! Content-Type: application/json
//!
//! {"api_key":"acme","user_id":6,"rtoken":"...","session_id":"..."}
//!
//! 200 {"status":"success","user":"alice","token":{"access_token":...}}
//! 401 {"status":"error","error":"login_failed","error_description":"..."}
//! ```
//!
//! Form-encoded bodies are accepted as well.

use axum::extract::{FromRequest, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde_json::json;

use crate::error::AuthError;
use crate::http::error::{ErrorResponse, authorization_error_status};
use crate::http::state::OAuthState;
use crate::http::token::NO_STORE_HEADERS;
use crate::oauth::session::SessionExchangeRequest;

/// `POST /session/bearer`.
pub async fn session_exchange_handler(
    State(state): State<OAuthState>,
    request: Request,
) -> Response {
    let req = match read_request(request).await {
        Ok(req) => req,
        Err(message) => return error_response(&AuthError::invalid_request(message)),
    };

    match state.grants.session_to_bearer(&req).await {
        Ok(exchange) => (
            StatusCode::OK,
            NO_STORE_HEADERS,
            Json(json!({
                "status": "success",
                "user": exchange.user,
                "token": exchange.token,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn read_request(request: Request) -> Result<SessionExchangeRequest, String> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"));

    if is_json {
        Json::<SessionExchangeRequest>::from_request(request, &())
            .await
            .map(|Json(req)| req)
            .map_err(|e| e.body_text())
    } else {
        Form::<SessionExchangeRequest>::from_request(request, &())
            .await
            .map(|Form(req)| req)
            .map_err(|e| e.body_text())
    }
}

fn error_response(error: &AuthError) -> Response {
    let status = authorization_error_status(error);
    if status.is_server_error() {
        tracing::error!(error = %error, category = %error.category(), "Session exchange failed");
    }
    let body = ErrorResponse::from(error);
    (
        status,
        NO_STORE_HEADERS,
        Json(json!({
            "status": "error",
            "error": body.error,
            "error_description": body.error_description,
        })),
    )
        .into_response()
}
