//! OAuth 2.0 Token endpoint handler.
//!
//! Supported grant types:
//!
//! - `password` - Resource Owner Password Credentials
//! - `client_credentials` - Machine-to-machine authentication
//! - `authorization_code` - Exchange an authorization code for tokens
//! - `refresh_token` - Redeem a refresh token
//!
//! Rejected credentials and policy failures answer with a bare 401; only
//! malformed or unreadable requests get a JSON error body.
//!
//! # Example
//!
//! ```ignore
//! POST /v1/oauth2/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=password&api_key=acme&username=alice&password=wonderland
//!
//! // API credentials may also come as HTTP Basic
//! POST /v1/oauth2/token
//! Authorization: Basic <base64(api_key:api_secret)>
//!
//! grant_type=client_credentials
//! ```

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AuthError;
use crate::http::error::{json_error, server_error_status};
use crate::http::state::OAuthState;
use crate::oauth::token::TokenRequest;
use crate::token::BearerToken;

pub(crate) const NO_STORE_HEADERS: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store"),
    (header::PRAGMA, "no-cache"),
];

/// `POST /token`.
pub async fn token_handler(
    State(state): State<OAuthState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let mut request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Unreadable token request");
            return token_error_response(&AuthError::invalid_request(rejection.body_text()));
        }
    };
    apply_basic_credentials(&headers, &mut request);

    tracing::debug!(
        grant_type = %request.grant_type,
        api_key = ?request.api_key,
        "Processing token request"
    );

    let grant = match request.into_grant() {
        Ok(grant) => grant,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected token request");
            return token_error_response(&e);
        }
    };
    let grant_type = grant.grant_type();

    match state.grants.exchange(grant).await {
        Ok(bearer) => token_success_response(bearer),
        Err(e) => {
            tracing::warn!(grant_type = grant_type, error = %e, "Token request failed");
            token_error_response(&e)
        }
    }
}

/// Fills `api_key`/`api_secret` from an HTTP Basic header when the form
/// does not carry them.
fn apply_basic_credentials(headers: &HeaderMap, request: &mut TokenRequest) {
    let Some((api_key, api_secret)) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_auth)
    else {
        return;
    };

    if request.api_key.is_none() {
        request.api_key = Some(api_key);
    }
    if request.api_secret.is_none() {
        request.api_secret = Some(api_secret);
    }
}

/// Parses `Basic base64(id:secret)`.
fn parse_basic_auth(header: &str) -> Option<(String, String)> {
    let credentials = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(credentials.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

fn token_success_response(bearer: BearerToken) -> Response {
    (StatusCode::OK, NO_STORE_HEADERS, Json(bearer)).into_response()
}

fn token_error_response(error: &AuthError) -> Response {
    match error {
        AuthError::UnsupportedGrantType { .. } | AuthError::InvalidRequest { .. } => {
            (NO_STORE_HEADERS, json_error(StatusCode::BAD_REQUEST, error)).into_response()
        }
        e if e.is_server_error() => {
            (NO_STORE_HEADERS, json_error(server_error_status(e), e)).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, NO_STORE_HEADERS).into_response(),
    }
}
