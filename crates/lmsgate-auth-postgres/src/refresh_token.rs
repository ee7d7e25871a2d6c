//! Refresh-token entry storage.
//!
//! One row per (user, API key) pair in `oauth2_refresh_token`. Only the hash
//! of the refresh token value is stored. `consume` runs in a transaction
//! holding the row lock, so concurrent redemptions of the same pair are
//! serialized by PostgreSQL.

use std::sync::Arc;

use async_trait::async_trait;
use lmsgate_auth::AuthResult;
use lmsgate_auth::storage::RefreshTokenStorage;
use lmsgate_auth::types::UserId;
use lmsgate_auth::types::refresh_token::{ConsumeOutcome, RefreshTokenEntry};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

/// `(user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at)`
type EntryTuple = (
    i64,
    String,
    String,
    i32,
    i32,
    Option<OffsetDateTime>,
    OffsetDateTime,
);

fn entry_from_tuple(row: EntryTuple) -> StorageResult<RefreshTokenEntry> {
    let (user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at) = row;
    Ok(RefreshTokenEntry {
        user_id: UserId(user_id),
        api_key,
        token_hash,
        remaining: u32::try_from(remaining)
            .map_err(|_| StorageError::corrupt_row(format!("remaining = {remaining}")))?,
        resets: u32::try_from(resets)
            .map_err(|_| StorageError::corrupt_row(format!("resets = {resets}")))?,
        last_refresh_at,
        created_at,
    })
}

fn quota_to_db(quota: u32) -> StorageResult<i32> {
    i32::try_from(quota).map_err(|_| StorageError::corrupt_row(format!("quota {quota} out of range")))
}

// =============================================================================
// Refresh Token Storage
// =============================================================================

/// PostgreSQL-backed [`RefreshTokenStorage`].
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStorage {
    /// Create a new storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Find the entry for a (user, API key) pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_entry(
        &self,
        user: UserId,
        api_key: &str,
    ) -> StorageResult<Option<RefreshTokenEntry>> {
        let row: Option<EntryTuple> = query_as(
            r#"
            SELECT user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at
            FROM oauth2_refresh_token
            WHERE user_id = $1 AND api_key = $2
            "#,
        )
        .bind(user.0)
        .bind(api_key)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(entry_from_tuple).transpose()
    }

    /// Insert the entry, or reset the existing one in a single statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the database statement fails.
    pub async fn upsert_entry(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        quota: u32,
        now: OffsetDateTime,
    ) -> StorageResult<RefreshTokenEntry> {
        let row: EntryTuple = query_as(
            r#"
            INSERT INTO oauth2_refresh_token
                (user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at)
            VALUES ($1, $2, $3, $4, 0, NULL, $5)
            ON CONFLICT (user_id, api_key) DO UPDATE
            SET token_hash = EXCLUDED.token_hash,
                remaining = EXCLUDED.remaining,
                resets = oauth2_refresh_token.resets + 1,
                last_refresh_at = $5
            RETURNING user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at
            "#,
        )
        .bind(user.0)
        .bind(api_key)
        .bind(token_hash)
        .bind(quota_to_db(quota)?)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        entry_from_tuple(row)
    }

    /// Redeem a token hash once, holding the row lock for the whole check.
    ///
    /// # Errors
    ///
    /// Returns an error if a database statement fails.
    pub async fn consume_entry(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> StorageResult<ConsumeOutcome> {
        let mut tx = self.pool.begin().await?;

        let row: Option<EntryTuple> = query_as(
            r#"
            SELECT user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at
            FROM oauth2_refresh_token
            WHERE user_id = $1 AND api_key = $2
            FOR UPDATE
            "#,
        )
        .bind(user.0)
        .bind(api_key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entry) = row.map(entry_from_tuple).transpose()? else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if entry.is_exhausted() {
            query("DELETE FROM oauth2_refresh_token WHERE user_id = $1 AND api_key = $2")
                .bind(user.0)
                .bind(api_key)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(ConsumeOutcome::Exhausted);
        }

        if entry.token_hash != token_hash {
            // Dropping the transaction rolls back and releases the lock
            return Ok(ConsumeOutcome::Stale);
        }

        let row: EntryTuple = query_as(
            r#"
            UPDATE oauth2_refresh_token
            SET remaining = remaining - 1,
                last_refresh_at = $3
            WHERE user_id = $1 AND api_key = $2
            RETURNING user_id, api_key, token_hash, remaining, resets, last_refresh_at, created_at
            "#,
        )
        .bind(user.0)
        .bind(api_key)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(ConsumeOutcome::Consumed(entry_from_tuple(row)?))
    }

    /// Delete the entry for a (user, API key) pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database statement fails.
    pub async fn delete_entry(&self, user: UserId, api_key: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth2_refresh_token WHERE user_id = $1 AND api_key = $2")
            .bind(user.0)
            .bind(api_key)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RefreshTokenStorage for PostgresRefreshTokenStorage {
    async fn find(&self, user: UserId, api_key: &str) -> AuthResult<Option<RefreshTokenEntry>> {
        Ok(self.find_entry(user, api_key).await?)
    }

    async fn upsert(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        quota: u32,
        now: OffsetDateTime,
    ) -> AuthResult<RefreshTokenEntry> {
        Ok(self
            .upsert_entry(user, api_key, token_hash, quota, now)
            .await?)
    }

    async fn consume(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AuthResult<ConsumeOutcome> {
        let outcome = self.consume_entry(user, api_key, token_hash, now).await?;
        tracing::debug!(
            user_id = %user,
            api_key = %api_key,
            outcome = outcome_name(&outcome),
            "Refresh entry consumed"
        );
        Ok(outcome)
    }

    async fn delete(&self, user: UserId, api_key: &str) -> AuthResult<bool> {
        Ok(self.delete_entry(user, api_key).await?)
    }
}

fn outcome_name(outcome: &ConsumeOutcome) -> &'static str {
    match outcome {
        ConsumeOutcome::Consumed(_) => "consumed",
        ConsumeOutcome::NotFound => "not_found",
        ConsumeOutcome::Exhausted => "exhausted",
        ConsumeOutcome::Stale => "stale",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(remaining: i32) -> EntryTuple {
        (
            7,
            "acme".to_string(),
            "abc".to_string(),
            remaining,
            2,
            None,
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_entry_from_tuple() {
        let entry = entry_from_tuple(tuple(5)).unwrap();
        assert_eq!(entry.user_id, UserId(7));
        assert_eq!(entry.api_key, "acme");
        assert_eq!(entry.remaining, 5);
        assert_eq!(entry.resets, 2);
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        let err = entry_from_tuple(tuple(-1)).unwrap_err();
        assert!(matches!(err, StorageError::CorruptRow(_)));
    }

    #[test]
    fn test_quota_range() {
        assert_eq!(quota_to_db(10_000).unwrap(), 10_000);
        assert!(quota_to_db(u32::MAX).is_err());
    }
}
