//! Token info endpoint.
//!
//! Describes any token minted by this server. The token is looked up in
//! this order:
//!
//! 1. `access_token` query parameter
//! 2. `access_token` form field
//! 3. `token` field of a JSON body
//! 4. `Authorization` header, either `Bearer <token>` or the token alone

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::AuthError;
use crate::http::error::json_error;
use crate::http::state::OAuthState;

/// Query parameters of the token info endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct TokenInfoQuery {
    /// Token to describe.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// `GET|POST /tokeninfo`.
pub async fn token_info_handler(
    State(state): State<OAuthState>,
    Query(query): Query<TokenInfoQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(raw) = find_token(&query, &headers, &body) else {
        let error = AuthError::invalid_request("No token provided");
        return json_error(StatusCode::BAD_REQUEST, &error);
    };

    match state.grants.token_info(&raw) {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "Token info rejected");
            json_error(StatusCode::BAD_REQUEST, &e)
        }
    }
}

fn find_token(query: &TokenInfoQuery, headers: &HeaderMap, body: &[u8]) -> Option<String> {
    non_empty(query.access_token.clone())
        .or_else(|| form_token(headers, body))
        .or_else(|| json_token(headers, body))
        .or_else(|| header_token(headers))
}

fn form_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if !content_type_is(headers, "application/x-www-form-urlencoded") {
        return None;
    }
    url::form_urlencoded::parse(body)
        .find(|(name, _)| name == "access_token")
        .and_then(|(_, value)| non_empty(Some(value.into_owned())))
}

fn json_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if !content_type_is(headers, "application/json") {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    non_empty(value.get("token")?.as_str().map(str::to_string))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let mut words = value.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Some(token.to_string())
        }
        (Some(token), None, None) => Some(token.to_string()),
        _ => None,
    }
}

fn content_type_is(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(';').next().is_some_and(|m| m.trim() == expected))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
