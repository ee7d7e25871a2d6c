//! OAuth 2.0 authorization endpoint handlers.
//!
//! The endpoint does not render pages itself. It answers with the page the
//! host should render next, or with a redirect once the flow completes.
//!
//! # Flow
//!
//! ```text
//! GET|POST /auth?api_key=...&redirect_uri=...&response_type=code|token
//!     ├─► Unknown api_key / disabled grant → 401 JSON
//!     ├─► Bad response_type → 400 JSON
//!     ├─► No credentials → 200 {"status":"showLogin", ...}
//!     ├─► username+password
//!     │   ├─► Wrong → 200 {"status":"showLogin","data":{"error_msg":...}}
//!     │   ├─► Consent required → 200 {"status":"showPermission", ...}
//!     │   └─► Otherwise → 302 redirect_uri?code=... | #access_token=...
//!     └─► authenticity_token → 302 redirect
//! ```

use axum::Form;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::http::error::{authorization_error_status, json_error};
use crate::http::state::OAuthState;
use crate::oauth::authorize::{AuthorizationOutcome, AuthorizationRequest};

/// `GET /auth` with query parameters.
pub async fn authorize_handler(
    State(state): State<OAuthState>,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    authorize(&state, request).await
}

/// `POST /auth` with form parameters (login and permission pages).
pub async fn authorize_form_handler(
    State(state): State<OAuthState>,
    Form(request): Form<AuthorizationRequest>,
) -> Response {
    authorize(&state, request).await
}

async fn authorize(state: &OAuthState, request: AuthorizationRequest) -> Response {
    tracing::debug!(
        api_key = %request.api_key,
        response_type = %request.response_type,
        "Processing authorization request"
    );

    match state.grants.authorize(&request).await {
        Ok(outcome) => outcome_response(outcome),
        Err(e) => json_error(authorization_error_status(&e), &e),
    }
}

fn outcome_response(outcome: AuthorizationOutcome) -> Response {
    let status = outcome.status();
    match outcome {
        AuthorizationOutcome::Redirect(url) => {
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        AuthorizationOutcome::ShowLogin(prompt) => {
            Json(json!({ "status": status, "data": prompt })).into_response()
        }
        AuthorizationOutcome::ShowPermission(prompt) => {
            Json(json!({ "status": status, "data": prompt })).into_response()
        }
    }
}
