//! Authentication and authorization configuration.
//!
//! Token lifetimes, the signing secret, the refresh quota and the storage
//! timeout are configured here.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of redemptions a refresh token allows before it has to be
/// re-issued through a primary grant.
pub const DEFAULT_REFRESH_QUOTA: u32 = 10_000;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for any token lifetime (100 years).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Root authentication and authorization configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// storage_timeout = "5s"
///
/// [auth.token]
/// secret = "change-me-to-a-long-random-string-of-32-bytes"
/// access_token_lifetime = "30m"
///
/// [auth.refresh]
/// quota = 10000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token signing and lifetime configuration.
    pub token: TokenConfig,

    /// Refresh-token bookkeeping configuration.
    pub refresh: RefreshConfig,

    /// Upper bound for a single storage operation.
    /// Exceeding it surfaces as a transient failure.
    #[serde(with = "humantime_serde")]
    pub storage_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: TokenConfig::default(),
            refresh: RefreshConfig::default(),
            storage_timeout: Duration::from_secs(5),
        }
    }
}

/// Token signing and lifetime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Server secret used as the HMAC-SHA256 key for every token.
    pub secret: String,

    /// Access (bearer) token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Authorization code lifetime.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Lifetime of the authenticity token handed out with the consent page.
    #[serde(with = "humantime_serde")]
    pub authenticity_token_lifetime: Duration,

    /// Refresh token lifetime. The refresh-token store is the real validity
    /// authority, so this is long.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Scope reported in bearer token responses.
    pub scope: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_lifetime: Duration::from_secs(30 * 60),
            authorization_code_lifetime: Duration::from_secs(10 * 60),
            authenticity_token_lifetime: Duration::from_secs(10 * 60),
            refresh_token_lifetime: Duration::from_secs(3650 * 24 * 3600),
            scope: String::new(),
        }
    }
}

/// Refresh-token bookkeeping configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Redemptions allowed per refresh-token value.
    pub quota: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            quota: DEFAULT_REFRESH_QUOTA,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty and
    /// `ConfigError::InvalidValue` if:
    /// - The signing secret is shorter than [`MIN_SECRET_LEN`] bytes
    /// - Any token lifetime or the storage timeout is zero
    /// - Any token lifetime exceeds [`MAX_TOKEN_LIFETIME`]
    /// - The refresh quota is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("auth.token.secret".to_string()));
        }

        if self.token.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue(format!(
                "auth.token.secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let lifetimes = [
            ("access_token_lifetime", self.token.access_token_lifetime),
            (
                "authorization_code_lifetime",
                self.token.authorization_code_lifetime,
            ),
            (
                "authenticity_token_lifetime",
                self.token.authenticity_token_lifetime,
            ),
            ("refresh_token_lifetime", self.token.refresh_token_lifetime),
        ];
        for (name, lifetime) in lifetimes {
            if lifetime.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.token.{name} must be > 0"
                )));
            }
            if lifetime > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.token.{name} must not exceed 100 years"
                )));
            }
        }

        if self.refresh.quota == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.refresh.quota must be > 0".to_string(),
            ));
        }

        if self.storage_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "auth.storage_timeout must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
