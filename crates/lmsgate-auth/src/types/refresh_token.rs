//! Refresh-token bookkeeping types.
//!
//! One [`RefreshTokenEntry`] exists per (user, API key) pair. It holds the
//! hash of the currently valid refresh token and the counters that bound how
//! often that token may be redeemed.
//!
//! # Security
//!
//! - Only the SHA-256 hash of the refresh token value is persisted
//! - Re-issuing replaces the hash, which invalidates the previous value

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::client::UserId;

/// Refresh-token entry for a (user, API key) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenEntry {
    /// Owner of the entry.
    pub user_id: UserId,

    /// API key the refresh token was issued to.
    pub api_key: String,

    /// SHA-256 hash of the current refresh token value.
    pub token_hash: String,

    /// Redemptions left before the entry is dropped.
    pub remaining: u32,

    /// Number of times the entry was re-issued.
    pub resets: u32,

    /// Time of the last redemption or re-issue.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_refresh_at: Option<OffsetDateTime>,

    /// When the entry was first created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl RefreshTokenEntry {
    /// Creates a fresh entry with a full quota.
    #[must_use]
    pub fn new(
        user_id: UserId,
        api_key: impl Into<String>,
        token_hash: impl Into<String>,
        quota: u32,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            user_id,
            api_key: api_key.into(),
            token_hash: token_hash.into(),
            remaining: quota,
            resets: 0,
            last_refresh_at: None,
            created_at: now,
        }
    }

    /// Replaces the token hash and restores the quota.
    pub fn reset(&mut self, token_hash: impl Into<String>, quota: u32, now: OffsetDateTime) {
        self.token_hash = token_hash.into();
        self.remaining = quota;
        self.resets = self.resets.saturating_add(1);
        self.last_refresh_at = Some(now);
    }

    /// Returns `true` if no redemptions are left.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Hash a token value using SHA-256.
    ///
    /// Used both when storing a new value and when checking a presented one.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Public view of the entry counters.
    #[must_use]
    pub fn info(&self) -> RefreshEntryInfo {
        RefreshEntryInfo {
            num_refresh_left: self.remaining,
            num_resets: self.resets,
            last_refresh_timestamp: self.last_refresh_at.map(OffsetDateTime::unix_timestamp),
        }
    }
}

/// Counters of a refresh-token entry, as reported to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEntryInfo {
    /// Redemptions left.
    pub num_refresh_left: u32,
    /// Number of re-issues.
    pub num_resets: u32,
    /// Unix time of the last redemption or re-issue.
    pub last_refresh_timestamp: Option<i64>,
}

/// Result of an atomic redemption attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The value matched; the counter was decremented.
    Consumed(RefreshTokenEntry),
    /// No entry exists for the pair.
    NotFound,
    /// The counter was already zero; the entry has been deleted.
    Exhausted,
    /// The presented value is not the current one. Nothing was changed.
    Stale,
}
