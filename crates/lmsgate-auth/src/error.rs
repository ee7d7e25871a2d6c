//! Authentication and authorization error types.
//!
//! This module defines all error types that can occur while running the
//! OAuth2 grant flows and the refresh-token bookkeeping.

use std::fmt;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client does not exist, the grant type is disabled for it, or the
    /// presented credentials are wrong.
    #[error("Login failed: {message}")]
    LoginFailed {
        /// Description of why the login failed.
        message: String,
    },

    /// The `response_type` parameter is neither `code` nor `token`.
    #[error("Parameter response_type must be \"code\" or \"token\", got \"{response_type}\"")]
    ResponseType {
        /// The rejected response type.
        response_type: String,
    },

    /// The presented code, refresh or authenticity token is past its expiry.
    #[error("Token expired")]
    TokenExpired,

    /// The token signature or structure is invalid.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of why the token could not be parsed.
        message: String,
    },

    /// A well-formed token of the wrong kind was presented.
    #[error("Expected a {expected} token, got {actual}")]
    InvalidTokenKind {
        /// The kind the endpoint accepts.
        expected: String,
        /// The kind that was presented.
        actual: String,
    },

    /// No refresh-token entry exists for the (user, client) pair.
    #[error("Refresh token not found")]
    RefreshNotFound,

    /// The refresh-token entry ran out of redemptions and was deleted.
    #[error("Refresh token exhausted")]
    RefreshExhausted,

    /// The presented refresh token was rotated out by a later issuance.
    #[error("Refresh token is no longer current")]
    StaleRefreshToken,

    /// The token endpoint does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// A required request parameter is missing or malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The storage backend did not answer within the configured timeout.
    #[error("Storage operation timed out")]
    StorageTimeout,

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `LoginFailed` error.
    #[must_use]
    pub fn login_failed(message: impl Into<String>) -> Self {
        Self::LoginFailed {
            message: message.into(),
        }
    }

    /// Creates a new `ResponseType` error.
    #[must_use]
    pub fn response_type(response_type: impl Into<String>) -> Self {
        Self::ResponseType {
            response_type: response_type.into(),
        }
    }

    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidTokenKind` error.
    #[must_use]
    pub fn invalid_token_kind(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::InvalidTokenKind {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::StorageTimeout
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if retrying the same request later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StorageTimeout)
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenExpired
                | Self::MalformedToken { .. }
                | Self::InvalidTokenKind { .. }
                | Self::RefreshNotFound
                | Self::RefreshExhausted
                | Self::StaleRefreshToken
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::LoginFailed { .. } => ErrorCategory::Authentication,
            Self::ResponseType { .. } => ErrorCategory::Validation,
            Self::TokenExpired => ErrorCategory::Token,
            Self::MalformedToken { .. } => ErrorCategory::Token,
            Self::InvalidTokenKind { .. } => ErrorCategory::Token,
            Self::RefreshNotFound => ErrorCategory::Token,
            Self::RefreshExhausted => ErrorCategory::Token,
            Self::StaleRefreshToken => ErrorCategory::Token,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Validation,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::StorageTimeout => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the machine-readable error code sent in JSON error bodies.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::LoginFailed { .. } => "login_failed",
            Self::ResponseType { .. } => "unsupported_response_type",
            Self::TokenExpired => "token_expired",
            Self::MalformedToken { .. } => "malformed_token",
            Self::InvalidTokenKind { .. } => "invalid_token",
            Self::RefreshNotFound => "invalid_grant",
            Self::RefreshExhausted => "invalid_grant",
            Self::StaleRefreshToken => "invalid_grant",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Storage { .. } => "server_error",
            Self::StorageTimeout => "temporarily_unavailable",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of authentication/authorization errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential or client policy failures.
    Authentication,
    /// Token parsing, expiry and refresh bookkeeping failures.
    Token,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
