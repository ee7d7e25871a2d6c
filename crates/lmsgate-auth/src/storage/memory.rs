//! In-memory collaborator implementations.
//!
//! Used by the server when clients and users come from static configuration,
//! and by tests. All maps are `DashMap`s; per-key atomicity of the refresh
//! primitives comes from holding the shard lock through the `entry` API.

use std::sync::Arc;

use argon2::password_hash::PasswordHash;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::credentials::verify_secret;
use crate::error::AuthError;
use crate::storage::client::ClientRegistry;
use crate::storage::identity::IdentityAuthenticator;
use crate::storage::refresh_token::RefreshTokenStorage;
use crate::storage::session::SessionAuthenticator;
use crate::storage::user::UserDirectory;
use crate::types::refresh_token::{ConsumeOutcome, RefreshTokenEntry};
use crate::types::{AllowedUsers, ClientRegistration, ClientValidationError, GrantType, UserId};

// =============================================================================
// Refresh Tokens
// =============================================================================

type EntryKey = (UserId, String);

/// Refresh-token entries kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStorage {
    entries: DashMap<EntryKey, RefreshTokenEntry>,
}

impl InMemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStorage for InMemoryRefreshTokenStorage {
    async fn find(&self, user: UserId, api_key: &str) -> AuthResult<Option<RefreshTokenEntry>> {
        Ok(self
            .entries
            .get(&(user, api_key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn upsert(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        quota: u32,
        now: OffsetDateTime,
    ) -> AuthResult<RefreshTokenEntry> {
        match self.entries.entry((user, api_key.to_string())) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().reset(token_hash, quota, now);
                Ok(occupied.get().clone())
            }
            Entry::Vacant(vacant) => {
                let entry = RefreshTokenEntry::new(user, api_key, token_hash, quota, now);
                vacant.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    async fn consume(
        &self,
        user: UserId,
        api_key: &str,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> AuthResult<ConsumeOutcome> {
        let Entry::Occupied(mut occupied) = self.entries.entry((user, api_key.to_string())) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if occupied.get().is_exhausted() {
            occupied.remove();
            return Ok(ConsumeOutcome::Exhausted);
        }

        if occupied.get().token_hash != token_hash {
            return Ok(ConsumeOutcome::Stale);
        }

        let entry = occupied.get_mut();
        entry.remaining -= 1;
        entry.last_refresh_at = Some(now);
        Ok(ConsumeOutcome::Consumed(entry.clone()))
    }

    async fn delete(&self, user: UserId, api_key: &str) -> AuthResult<bool> {
        Ok(self.entries.remove(&(user, api_key.to_string())).is_some())
    }
}

// =============================================================================
// Clients
// =============================================================================

/// API key registrations kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    clients: DashMap<String, ClientRegistration>,
}

impl InMemoryClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from registrations, validating each one.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn from_registrations(
        registrations: impl IntoIterator<Item = ClientRegistration>,
    ) -> Result<Self, ClientValidationError> {
        let registry = Self::new();
        for registration in registrations {
            registry.register(registration)?;
        }
        Ok(registry)
    }

    /// Adds or replaces a registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is inconsistent.
    pub fn register(&self, registration: ClientRegistration) -> Result<(), ClientValidationError> {
        registration.validate()?;
        self.clients
            .insert(registration.api_key.clone(), registration);
        Ok(())
    }

    /// Returns a copy of the registration for `api_key`.
    #[must_use]
    pub fn get(&self, api_key: &str) -> Option<ClientRegistration> {
        self.clients.get(api_key).map(|c| c.value().clone())
    }

    /// Number of registered API keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    fn with_client<T>(&self, api_key: &str, default: T, f: impl FnOnce(&ClientRegistration) -> T) -> T {
        self.clients
            .get(api_key)
            .map_or(default, |client| f(client.value()))
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn exists(&self, api_key: &str) -> AuthResult<bool> {
        Ok(self.clients.contains_key(api_key))
    }

    async fn is_grant_enabled(&self, api_key: &str, grant: GrantType) -> AuthResult<bool> {
        Ok(self.with_client(api_key, false, |c| c.is_grant_enabled(grant)))
    }

    async fn consent_required(&self, api_key: &str) -> AuthResult<bool> {
        Ok(self.with_client(api_key, false, |c| c.consent_message.is_some()))
    }

    async fn consent_text(&self, api_key: &str) -> AuthResult<Option<String>> {
        Ok(self.with_client(api_key, None, |c| c.consent_message.clone()))
    }

    async fn allowed_users(&self, api_key: &str) -> AuthResult<AllowedUsers> {
        Ok(self.with_client(api_key, AllowedUsers::Only(Default::default()), |c| {
            c.allowed_users()
        }))
    }

    async fn service_account_user(&self, api_key: &str) -> AuthResult<Option<UserId>> {
        Ok(self.with_client(api_key, None, |c| c.service_account))
    }

    async fn refresh_enabled_for(&self, api_key: &str, grant: GrantType) -> AuthResult<bool> {
        Ok(self.with_client(api_key, false, |c| c.is_refresh_enabled_for(grant)))
    }
}

// =============================================================================
// Users
// =============================================================================

/// Login/id mapping kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    by_login: DashMap<String, UserId>,
    by_id: DashMap<UserId, String>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    pub fn insert(&self, id: UserId, login: impl Into<String>) {
        let login = login.into();
        if let Some((_, previous)) = self.by_id.remove(&id) {
            self.by_login.remove(&previous);
        }
        self.by_login.insert(login.clone(), id);
        self.by_id.insert(id, login);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn login_to_id(&self, login: &str) -> AuthResult<Option<UserId>> {
        Ok(self.by_login.get(login).map(|id| *id.value()))
    }

    async fn id_to_login(&self, id: UserId) -> AuthResult<Option<String>> {
        Ok(self.by_id.get(&id).map(|login| login.value().clone()))
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Argon2-backed credential checks for statically configured users and
/// API keys.
pub struct InMemoryIdentityAuthenticator {
    passwords: DashMap<String, String>,
    clients: Arc<InMemoryClientRegistry>,
}

impl InMemoryIdentityAuthenticator {
    /// Creates an authenticator reading API secrets from `clients`.
    #[must_use]
    pub fn new(clients: Arc<InMemoryClientRegistry>) -> Self {
        Self {
            passwords: DashMap::new(),
            clients,
        }
    }

    /// Sets the Argon2 PHC password hash of a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if `password_hash` is not a PHC
    /// string.
    pub fn set_password_hash(
        &self,
        login: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> AuthResult<()> {
        let login = login.into();
        let password_hash = password_hash.into();
        PasswordHash::new(&password_hash).map_err(|e| {
            AuthError::configuration(format!("Invalid password hash for user {login}: {e}"))
        })?;
        self.passwords.insert(login, password_hash);
        Ok(())
    }
}

#[async_trait]
impl IdentityAuthenticator for InMemoryIdentityAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<bool> {
        let Some(hash) = self.passwords.get(username).map(|h| h.value().clone()) else {
            return Ok(false);
        };
        verify_blocking(password.to_string(), hash).await
    }

    async fn check_client_secret(&self, api_key: &str, secret: &str) -> AuthResult<bool> {
        let Some(hash) = self.clients.get(api_key).and_then(|c| c.secret_hash) else {
            return Ok(false);
        };
        verify_blocking(secret.to_string(), hash).await
    }
}

// =============================================================================
// Sessions
// =============================================================================

#[derive(Debug, Clone)]
struct Session {
    user: UserId,
    rtoken: String,
}

/// Host sessions kept in process memory, keyed by session id.
#[derive(Debug, Default)]
pub struct InMemorySessionAuthenticator {
    sessions: DashMap<String, Session>,
}

impl InMemorySessionAuthenticator {
    /// Creates an empty session table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a live session of `user`.
    pub fn open(&self, session_id: impl Into<String>, user: UserId, rtoken: impl Into<String>) {
        self.sessions.insert(
            session_id.into(),
            Session {
                user,
                rtoken: rtoken.into(),
            },
        );
    }

    /// Ends a session. Returns `true` if it existed.
    pub fn close(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }
}

#[async_trait]
impl SessionAuthenticator for InMemorySessionAuthenticator {
    async fn authenticate_session(
        &self,
        user: UserId,
        rtoken: &str,
        session_id: &str,
    ) -> AuthResult<bool> {
        Ok(self
            .sessions
            .get(session_id)
            .is_some_and(|s| s.user == user && s.rtoken == rtoken))
    }
}

/// Argon2 verification is CPU bound; keep it off the async workers.
async fn verify_blocking(secret: String, hash: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_secret(&secret, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("Credential check failed: {e}")))?
        .map_err(|e| AuthError::internal(format!("Stored credential hash is invalid: {e}")))
}
