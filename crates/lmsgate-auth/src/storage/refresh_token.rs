//! Refresh token storage trait.
//!
//! One entry per (user, API key) pair. Every primitive is atomic for its
//! key: concurrent calls on the same pair are serialized by the backend, so
//! a value can never be redeemed more often than its quota allows.
//!
//! # Implementations
//!
//! - [`InMemoryRefreshTokenStorage`](crate::storage::memory::InMemoryRefreshTokenStorage)
//! - `lmsgate-auth-postgres` - PostgreSQL storage backend

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::UserId;
use crate::types::refresh_token::{ConsumeOutcome, RefreshTokenEntry};

/// Storage for refresh-token entries.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Find the entry for a (user, API key) pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, user: UserId, api_key: &str) -> AuthResult<Option<RefreshTokenEntry>>;

    /// Create the entry, or reset an existing one.
    ///
    /// A new entry starts with `remaining = quota` and `resets = 0`. An
    /// existing entry gets the new hash, `remaining = quota`, `resets + 1`
    /// and `last_refresh_at = now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn upsert(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        quota: u32,
        now: OffsetDateTime,
    ) -> AuthResult<RefreshTokenEntry>;

    /// Redeem the presented token hash once.
    ///
    /// Checks run in this order:
    /// 1. no entry: [`ConsumeOutcome::NotFound`]
    /// 2. `remaining == 0`: the entry is deleted, [`ConsumeOutcome::Exhausted`]
    /// 3. hash differs: [`ConsumeOutcome::Stale`], nothing changes
    /// 4. otherwise `remaining - 1`, `last_refresh_at = now`,
    ///    [`ConsumeOutcome::Consumed`] with the updated entry
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn consume(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AuthResult<ConsumeOutcome>;

    /// Delete the entry.
    ///
    /// Returns `true` if an entry was deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, user: UserId, api_key: &str) -> AuthResult<bool>;
}
