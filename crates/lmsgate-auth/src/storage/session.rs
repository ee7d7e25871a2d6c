//! LMS session checks delegated to the host.
//!
//! The host LMS hands its logged-in users a session id and a request token
//! (`rtoken`). Administration tools exchange the pair for a bearer token
//! without going through an OAuth2 grant.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::UserId;

/// Verifies host LMS sessions.
#[async_trait]
pub trait SessionAuthenticator: Send + Sync {
    /// Returns `true` if `session_id` is a live session of `user` and
    /// `rtoken` is its request token.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be queried.
    async fn authenticate_session(
        &self,
        user: UserId,
        rtoken: &str,
        session_id: &str,
    ) -> AuthResult<bool>;
}
