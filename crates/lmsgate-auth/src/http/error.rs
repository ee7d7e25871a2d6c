//! JSON error bodies and status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ErrorCategory};

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub error_description: String,
}

impl From<&AuthError> for ErrorResponse {
    fn from(error: &AuthError) -> Self {
        // Internal details stay in the logs.
        let error_description = if error.is_server_error() {
            "The server could not complete the request".to_string()
        } else {
            error.to_string()
        };

        Self {
            error: error.error_code().to_string(),
            error_description,
        }
    }
}

/// Status for infrastructure failures: 503 when a retry may succeed.
#[must_use]
pub fn server_error_status(error: &AuthError) -> StatusCode {
    if error.is_transient() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Status for errors of the interactive authorization endpoint.
#[must_use]
pub fn authorization_error_status(error: &AuthError) -> StatusCode {
    match error.category() {
        ErrorCategory::Authentication | ErrorCategory::Token => StatusCode::UNAUTHORIZED,
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Infrastructure | ErrorCategory::Configuration | ErrorCategory::Internal => {
            server_error_status(error)
        }
    }
}

/// Builds a JSON error response, logging server errors.
pub fn json_error(status: StatusCode, error: &AuthError) -> Response {
    if status.is_server_error() {
        tracing::error!(error = %error, category = %error.category(), "Request failed");
    }
    (status, Json(ErrorResponse::from(error))).into_response()
}
