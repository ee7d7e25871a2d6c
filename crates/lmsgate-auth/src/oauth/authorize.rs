//! Authorization endpoint types.
//!
//! The authorization endpoint is interactive: instead of failing on bad
//! credentials it tells the host which page to render next. The outcome is
//! one of three variants, see [`AuthorizationOutcome`].
//!
//! # Example
//!
//! ```ignore
//! GET /v1/oauth2/auth?
//!   api_key=acme
//!   &redirect_uri=https://app.example.com/callback
//!   &response_type=code
//!   &username=alice
//!   &password=wonderland
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::BearerToken;
use crate::types::GrantType;

/// Error message shown on the login page after a failed login.
pub const LOGIN_FAILED_MESSAGE: &str = "Username or password incorrect!";

/// Authorization request parameters.
///
/// Received as query string or form parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationRequest {
    /// API key (OAuth2 `client_id`).
    pub api_key: String,

    /// Where the user agent is sent once authorization completes.
    pub redirect_uri: String,

    /// `code` or `token`.
    pub response_type: String,

    /// Login entered on the login page.
    #[serde(default)]
    pub username: Option<String>,

    /// Password entered on the login page.
    #[serde(default)]
    pub password: Option<String>,

    /// Ticket returned by the permission page.
    #[serde(default)]
    pub authenticity_token: Option<String>,

    /// Opaque client value echoed on implicit-grant redirects.
    #[serde(default)]
    pub state: Option<String>,
}

impl AuthorizationRequest {
    /// Returns the username/password pair when both are non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some((username, password))
            }
            _ => None,
        }
    }

    /// Returns the authenticity token when present and non-empty.
    #[must_use]
    pub fn authenticity_token(&self) -> Option<&str> {
        self.authenticity_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Response types accepted by the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Authorization code grant.
    Code,
    /// Implicit grant.
    Token,
}

impl ResponseType {
    /// Parses the `response_type` parameter.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ResponseType` for anything but `code` or `token`.
    pub fn parse(value: &str) -> AuthResult<Self> {
        match value {
            "code" => Ok(Self::Code),
            "token" => Ok(Self::Token),
            other => Err(AuthError::response_type(other)),
        }
    }

    /// Grant type that must be enabled for this response type.
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        match self {
            Self::Code => GrantType::AuthorizationCode,
            Self::Token => GrantType::Implicit,
        }
    }

    /// Returns the parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Data for rendering the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPrompt {
    /// Set after a failed login attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
    /// Echoed API key.
    pub api_key: String,
    /// Echoed redirect URI.
    pub redirect_uri: String,
    /// Echoed response type.
    pub response_type: String,
}

/// Data for rendering the permission (consent) page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionPrompt {
    /// Echoed API key.
    pub api_key: String,
    /// Echoed redirect URI.
    pub redirect_uri: String,
    /// Echoed response type.
    pub response_type: String,
    /// Ticket to send back once the user approves.
    pub authenticity_token: String,
    /// Consent text configured for the API key.
    pub oauth2_consent_message: String,
}

/// Result of an authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// Render the login page.
    ShowLogin(LoginPrompt),
    /// Render the permission page.
    ShowPermission(PermissionPrompt),
    /// Send the user agent to this URL.
    Redirect(String),
}

impl AuthorizationOutcome {
    /// Name of the outcome as reported in JSON responses.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::ShowLogin(_) => "showLogin",
            Self::ShowPermission(_) => "showPermission",
            Self::Redirect(_) => "redirect",
        }
    }
}

/// Builds `redirect_uri?code=...`, keeping any existing query.
///
/// # Errors
///
/// Returns `AuthError::InvalidRequest` if `redirect_uri` is not an absolute URL.
pub fn code_redirect(redirect_uri: &str, code: &str) -> AuthResult<String> {
    let mut url = parse_redirect_uri(redirect_uri)?;
    url.query_pairs_mut().append_pair("code", code);
    Ok(url.to_string())
}

/// Builds `redirect_uri#access_token=..&token_type=bearer&expires_in=..[&state=..]`.
///
/// # Errors
///
/// Returns `AuthError::InvalidRequest` if `redirect_uri` is not an absolute URL.
pub fn implicit_redirect(
    redirect_uri: &str,
    bearer: &BearerToken,
    state: Option<&str>,
) -> AuthResult<String> {
    let mut url = parse_redirect_uri(redirect_uri)?;

    let mut fragment = url::form_urlencoded::Serializer::new(String::new());
    fragment
        .append_pair("access_token", &bearer.access_token)
        .append_pair("token_type", &bearer.token_type)
        .append_pair("expires_in", &bearer.expires_in.to_string());
    if let Some(state) = state {
        fragment.append_pair("state", state);
    }

    url.set_fragment(Some(&fragment.finish()));
    Ok(url.to_string())
}

fn parse_redirect_uri(redirect_uri: &str) -> AuthResult<Url> {
    Url::parse(redirect_uri)
        .map_err(|e| AuthError::invalid_request(format!("Invalid redirect_uri: {e}")))
}
