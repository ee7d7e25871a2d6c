//! Credential checks delegated to the host LMS.

use async_trait::async_trait;

use crate::AuthResult;

/// Verifies user passwords and API secrets.
///
/// A `false` answer is a normal outcome; `Err` is reserved for failures of
/// the backing system.
#[async_trait]
pub trait IdentityAuthenticator: Send + Sync {
    /// Returns `true` if `password` is valid for the user `username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be queried.
    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<bool>;

    /// Returns `true` if `secret` is the API secret of `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential store cannot be queried.
    async fn check_client_secret(&self, api_key: &str, secret: &str) -> AuthResult<bool>;
}
