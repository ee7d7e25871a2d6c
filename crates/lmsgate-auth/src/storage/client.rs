//! Client registry trait.
//!
//! API keys are registered and administered by the host LMS. The grant
//! flows only read per-key policy through this interface.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{AllowedUsers, GrantType, UserId};

// =============================================================================
// Client Registry Trait
// =============================================================================

/// Read-only view of API key registrations.
///
/// Every method answers for a single API key. Unknown keys report "not
/// enabled"/`None` rather than failing; callers check [`exists`] first when
/// they need to distinguish.
///
/// [`exists`]: ClientRegistry::exists
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Returns `true` if the API key is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn exists(&self, api_key: &str) -> AuthResult<bool>;

    /// Returns `true` if the grant type is enabled for the API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn is_grant_enabled(&self, api_key: &str, grant: GrantType) -> AuthResult<bool>;

    /// Returns `true` if users must approve the API key before tokens are
    /// issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn consent_required(&self, api_key: &str) -> AuthResult<bool>;

    /// Consent message shown on the permission page.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn consent_text(&self, api_key: &str) -> AuthResult<Option<String>>;

    /// Users allowed to obtain tokens for the API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn allowed_users(&self, api_key: &str) -> AuthResult<AllowedUsers>;

    /// User the client-credentials grant acts as.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn service_account_user(&self, api_key: &str) -> AuthResult<Option<UserId>>;

    /// Returns `true` if token responses for `grant` carry a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be queried.
    async fn refresh_enabled_for(&self, api_key: &str, grant: GrantType) -> AuthResult<bool>;
}
