//! Refresh-token issuance and redemption.
//!
//! Each (user, API key) pair owns a single entry. Issuing a refresh token
//! creates the entry or resets it, which invalidates the previously issued
//! value. Redeeming decrements the entry's counter; the value itself is not
//! rotated. Once the counter reaches zero the next redemption deletes the
//! entry and the client has to run a primary grant again.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::storage::user::UserDirectory;
use crate::storage::with_timeout;
use crate::token::{BearerToken, TokenCodec, TokenKind, refresh_salt};
use crate::types::UserId;
use crate::types::refresh_token::{ConsumeOutcome, RefreshEntryInfo, RefreshTokenEntry};

/// Issues, redeems and inspects refresh tokens.
pub struct RefreshTokenService {
    storage: Arc<dyn RefreshTokenStorage>,
    users: Arc<dyn UserDirectory>,
    codec: Arc<TokenCodec>,
    quota: u32,
    storage_timeout: Duration,
}

impl RefreshTokenService {
    /// Creates a new refresh-token service.
    #[must_use]
    pub fn new(
        storage: Arc<dyn RefreshTokenStorage>,
        users: Arc<dyn UserDirectory>,
        codec: Arc<TokenCodec>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            storage,
            users,
            codec,
            quota: config.refresh.quota,
            storage_timeout: config.storage_timeout,
        }
    }

    /// Issues a refresh token for `user_login` and `api_key`.
    ///
    /// Creates the entry with a full quota, or resets the existing one
    /// (new value, full quota, reset counter + 1).
    ///
    /// # Errors
    ///
    /// - `AuthError::LoginFailed` if the user is unknown
    /// - `AuthError::StorageTimeout` / `AuthError::Storage` on storage failure
    pub async fn issue(&self, user_login: &str, api_key: &str) -> AuthResult<String> {
        let user_id = self
            .resolve_user(user_login)
            .await?
            .ok_or_else(|| AuthError::login_failed("Unknown user"))?;

        let token = self.codec.mint(
            user_login,
            api_key,
            TokenKind::Refresh,
            &refresh_salt(),
            self.codec.config().refresh_token_lifetime,
        )?;
        let token_hash = RefreshTokenEntry::hash_token(token.as_str());

        let entry = with_timeout(
            self.storage_timeout,
            self.storage.upsert(
                user_id,
                api_key,
                &token_hash,
                self.quota,
                OffsetDateTime::now_utc(),
            ),
        )
        .await?;

        tracing::info!(
            api_key = %api_key,
            user = %user_login,
            resets = entry.resets,
            "Issued refresh token"
        );

        Ok(token.into_string())
    }

    /// Redeems a refresh token for a new bearer token.
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedToken`, `AuthError::TokenExpired` or
    ///   `AuthError::InvalidTokenKind` if the token does not validate
    /// - `AuthError::RefreshNotFound` if no entry exists for the pair
    /// - `AuthError::RefreshExhausted` if the quota is used up (the entry is
    ///   deleted)
    /// - `AuthError::StaleRefreshToken` if a newer value was issued
    /// - `AuthError::StorageTimeout` / `AuthError::Storage` on storage failure
    pub async fn redeem(&self, raw: &str) -> AuthResult<BearerToken> {
        let token = self.codec.validate(raw, TokenKind::Refresh)?;
        let (user_login, api_key) = (token.user(), token.api_key());

        let user_id = self
            .resolve_user(user_login)
            .await?
            .ok_or(AuthError::RefreshNotFound)?;

        let outcome = with_timeout(
            self.storage_timeout,
            self.storage.consume(
                user_id,
                api_key,
                &RefreshTokenEntry::hash_token(raw),
                OffsetDateTime::now_utc(),
            ),
        )
        .await?;

        match outcome {
            ConsumeOutcome::Consumed(entry) => {
                tracing::debug!(
                    api_key = %api_key,
                    user = %user_login,
                    remaining = entry.remaining,
                    "Redeemed refresh token"
                );
                self.codec.issue_bearer(user_login, api_key)
            }
            ConsumeOutcome::NotFound => Err(AuthError::RefreshNotFound),
            ConsumeOutcome::Exhausted => {
                tracing::warn!(
                    api_key = %api_key,
                    user = %user_login,
                    "Refresh token quota exhausted, entry removed"
                );
                Err(AuthError::RefreshExhausted)
            }
            ConsumeOutcome::Stale => {
                tracing::warn!(
                    api_key = %api_key,
                    user = %user_login,
                    "Superseded refresh token presented"
                );
                Err(AuthError::StaleRefreshToken)
            }
        }
    }

    /// Returns the counters of the entry for `user_login` and `api_key`.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn entry_info(
        &self,
        user_login: &str,
        api_key: &str,
    ) -> AuthResult<Option<RefreshEntryInfo>> {
        let Some(user_id) = self.resolve_user(user_login).await? else {
            return Ok(None);
        };

        let entry = with_timeout(self.storage_timeout, self.storage.find(user_id, api_key)).await?;
        Ok(entry.map(|e| e.info()))
    }

    /// Deletes the entry for `user_login` and `api_key`.
    ///
    /// Returns `true` if an entry existed.
    ///
    /// # Errors
    ///
    /// Returns an error on storage failure.
    pub async fn revoke(&self, user_login: &str, api_key: &str) -> AuthResult<bool> {
        let Some(user_id) = self.resolve_user(user_login).await? else {
            return Ok(false);
        };

        let deleted =
            with_timeout(self.storage_timeout, self.storage.delete(user_id, api_key)).await?;
        if deleted {
            tracing::info!(api_key = %api_key, user = %user_login, "Revoked refresh token");
        }
        Ok(deleted)
    }

    async fn resolve_user(&self, login: &str) -> AuthResult<Option<UserId>> {
        with_timeout(self.storage_timeout, self.users.login_to_id(login)).await
    }
}
