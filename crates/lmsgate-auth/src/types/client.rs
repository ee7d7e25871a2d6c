//! API key (OAuth2 client) domain types.
//!
//! The host LMS owns client registrations. These types describe what the
//! grant flows read from them; [`ClientRegistration`] is the shape used by
//! the bundled in-memory registry.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows an API key is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow (`response_type=code`).
    AuthorizationCode,
    /// Implicit flow (`response_type=token`).
    Implicit,
    /// Resource Owner Password Credentials flow.
    #[serde(alias = "password")]
    ResourceOwner,
    /// Client Credentials flow.
    ClientCredentials,
}

impl GrantType {
    /// Returns the token endpoint `grant_type` parameter value.
    ///
    /// The implicit grant never reaches the token endpoint; its name is
    /// only used for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::ResourceOwner => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Users
// =============================================================================

/// Numeric user identifier of the host LMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Users permitted to obtain tokens for an API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedUsers {
    /// Every user of the LMS.
    All,
    /// Only the listed users.
    Only(HashSet<UserId>),
}

impl AllowedUsers {
    /// Sentinel the host uses in its allowed-user lists to mean "all users".
    pub const ALL_SENTINEL: i64 = -1;

    /// Builds the list from raw host ids, honouring the all-users sentinel.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut only = HashSet::new();
        for id in ids {
            if id == Self::ALL_SENTINEL {
                return Self::All;
            }
            only.insert(UserId(id));
        }
        Self::Only(only)
    }

    /// Returns `true` if `user` may use the API key.
    #[must_use]
    pub fn permits(&self, user: UserId) -> bool {
        match self {
            Self::All => true,
            Self::Only(users) => users.contains(&user),
        }
    }
}

// =============================================================================
// Client Registration
// =============================================================================

/// Registration record of an API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    /// The API key (OAuth2 `client_id`).
    pub api_key: String,

    /// Argon2 PHC hash of the API secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,

    /// Grant types enabled for this key.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Grant types whose token responses also carry a refresh token.
    /// Only `authorization_code` and `password` are honoured.
    #[serde(default)]
    pub refresh_token_grants: Vec<GrantType>,

    /// Consent message shown before issuing tokens; `None` skips consent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_message: Option<String>,

    /// Allowed user ids; `-1` means all users, an empty list admits nobody.
    #[serde(default)]
    pub allowed_users: Vec<i64>,

    /// User the client-credentials grant acts as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account: Option<UserId>,
}

impl ClientRegistration {
    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is inconsistent.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.api_key.is_empty() {
            return Err(ClientValidationError::EmptyApiKey);
        }

        let needs_secret = self.grant_types.iter().any(|g| {
            matches!(
                g,
                GrantType::AuthorizationCode | GrantType::ClientCredentials
            )
        });
        if needs_secret && self.secret_hash.is_none() {
            return Err(ClientValidationError::MissingSecret);
        }

        if self.is_grant_enabled(GrantType::ClientCredentials) && self.service_account.is_none() {
            return Err(ClientValidationError::MissingServiceAccount);
        }

        for grant in &self.refresh_token_grants {
            if !matches!(
                grant,
                GrantType::AuthorizationCode | GrantType::ResourceOwner
            ) {
                return Err(ClientValidationError::UnsupportedRefreshGrant(*grant));
            }
        }

        Ok(())
    }

    /// Returns `true` if the grant type is enabled.
    #[must_use]
    pub fn is_grant_enabled(&self, grant: GrantType) -> bool {
        self.grant_types.contains(&grant)
    }

    /// Returns `true` if token responses for `grant` include a refresh token.
    #[must_use]
    pub fn is_refresh_enabled_for(&self, grant: GrantType) -> bool {
        self.refresh_token_grants.contains(&grant)
    }

    /// Returns the allowed-user policy.
    #[must_use]
    pub fn allowed_users(&self) -> AllowedUsers {
        AllowedUsers::from_ids(self.allowed_users.iter().copied())
    }
}

/// Client registration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// The API key is empty.
    #[error("api_key cannot be empty")]
    EmptyApiKey,

    /// A secret-checked grant is enabled without a secret.
    #[error("authorization_code and client_credentials grants require secret_hash")]
    MissingSecret,

    /// Client credentials are enabled without a service account.
    #[error("client_credentials grant requires service_account")]
    MissingServiceAccount,

    /// Refresh tokens were requested for a grant that cannot carry them.
    #[error("refresh tokens are not supported for grant type {0}")]
    UnsupportedRefreshGrant(GrantType),
}
