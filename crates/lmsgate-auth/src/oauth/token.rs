//! Token endpoint types.
//!
//! # Supported Grant Types
//!
//! - `password`: username, password, api_key
//! - `client_credentials`: api_key, api_secret
//! - `authorization_code`: api_key, api_secret, code, redirect_uri
//! - `refresh_token`: refresh_token

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::TokenKind;

/// Token request parameters (form encoded).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    /// Requested grant.
    pub grant_type: String,

    /// API key (OAuth2 `client_id`).
    #[serde(default)]
    pub api_key: Option<String>,

    /// API secret (OAuth2 `client_secret`).
    #[serde(default)]
    pub api_secret: Option<String>,

    /// Username (password grant).
    #[serde(default)]
    pub username: Option<String>,

    /// Password (password grant).
    #[serde(default)]
    pub password: Option<String>,

    /// Authorization code (authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI the code was issued for (authorization_code grant).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Refresh token (refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// A token request with its grant-specific parameters checked for presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    /// Resource owner password credentials.
    Password {
        /// API key.
        api_key: String,
        /// Login.
        username: String,
        /// Password.
        password: String,
    },
    /// Client credentials.
    ClientCredentials {
        /// API key.
        api_key: String,
        /// API secret.
        api_secret: String,
    },
    /// Authorization code exchange.
    AuthorizationCode {
        /// API key.
        api_key: String,
        /// API secret.
        api_secret: String,
        /// The authorization code.
        code: String,
        /// Redirect URI the code was issued for.
        redirect_uri: String,
    },
    /// Refresh token redemption.
    RefreshToken {
        /// The refresh token.
        refresh_token: String,
    },
}

impl TokenRequest {
    /// Checks the grant type and the presence of its parameters.
    ///
    /// # Errors
    ///
    /// - `AuthError::UnsupportedGrantType` for unknown grant types
    /// - `AuthError::InvalidRequest` if a required parameter is missing
    pub fn into_grant(self) -> AuthResult<TokenGrant> {
        match self.grant_type.as_str() {
            "password" => Ok(TokenGrant::Password {
                api_key: required(self.api_key, "api_key")?,
                username: required(self.username, "username")?,
                password: required(self.password, "password")?,
            }),
            "client_credentials" => Ok(TokenGrant::ClientCredentials {
                api_key: required(self.api_key, "api_key")?,
                api_secret: required(self.api_secret, "api_secret")?,
            }),
            "authorization_code" => Ok(TokenGrant::AuthorizationCode {
                api_key: required(self.api_key, "api_key")?,
                api_secret: required(self.api_secret, "api_secret")?,
                code: required(self.code, "code")?,
                redirect_uri: required(self.redirect_uri, "redirect_uri")?,
            }),
            "refresh_token" => Ok(TokenGrant::RefreshToken {
                refresh_token: required(self.refresh_token, "refresh_token")?,
            }),
            other => Err(AuthError::unsupported_grant_type(other)),
        }
    }
}

impl TokenGrant {
    /// The `grant_type` value of this grant.
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::Password { .. } => "password",
            Self::ClientCredentials { .. } => "client_credentials",
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }
}

fn required(value: Option<String>, name: &str) -> AuthResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::invalid_request(format!("Missing required parameter: {name}")))
}

/// Token info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// API key the token was issued to.
    pub api_key: String,
    /// Login of the subject.
    pub user: String,
    /// Token kind.
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Seconds until the token expires.
    pub expires_in: u64,
}
