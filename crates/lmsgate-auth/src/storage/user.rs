//! User directory trait.
//!
//! Tokens name their subject by login; refresh bookkeeping and allowed-user
//! policy use numeric ids. The directory maps between the two.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::UserId;

/// Login/id lookups against the host LMS user table.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a login to its user id.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be queried.
    async fn login_to_id(&self, login: &str) -> AuthResult<Option<UserId>>;

    /// Resolves a user id to its login.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be queried.
    async fn id_to_login(&self, id: UserId) -> AuthResult<Option<String>>;
}
