//! Collaborator and storage traits.
//!
//! This module defines the narrow interfaces the grant flows use to reach
//! the host LMS:
//!
//! - API key registrations ([`ClientRegistry`])
//! - Credential checks ([`IdentityAuthenticator`])
//! - Login/id lookups ([`UserDirectory`])
//! - Refresh-token bookkeeping ([`RefreshTokenStorage`])
//! - LMS session checks ([`SessionAuthenticator`])
//!
//! # Implementations
//!
//! - [`memory`] - in-process implementations of every trait
//! - `lmsgate-auth-postgres` - PostgreSQL refresh-token storage

pub mod client;
pub mod identity;
pub mod memory;
pub mod refresh_token;
pub mod session;
pub mod user;

pub use client::ClientRegistry;
pub use identity::IdentityAuthenticator;
pub use memory::{
    InMemoryClientRegistry, InMemoryIdentityAuthenticator, InMemoryRefreshTokenStorage,
    InMemorySessionAuthenticator, InMemoryUserDirectory,
};
pub use refresh_token::RefreshTokenStorage;
pub use session::SessionAuthenticator;
pub use user::UserDirectory;

use std::future::Future;
use std::time::Duration;

use crate::AuthResult;
use crate::error::AuthError;

/// Runs a storage or collaborator call, failing with
/// `AuthError::StorageTimeout` once `limit` elapses.
pub async fn with_timeout<T, F>(limit: Duration, operation: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = limit.as_millis() as u64, "Storage operation timed out");
            Err(AuthError::StorageTimeout)
        }
    }
}
