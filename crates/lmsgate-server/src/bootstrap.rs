//! Builds the grant service from configuration.
//!
//! Clients and users come from the static configuration and are served by
//! the in-memory collaborators of `lmsgate-auth`. Refresh-token entries go
//! to the configured storage backend.

use std::sync::Arc;

use lmsgate_auth::storage::{
    InMemoryClientRegistry, InMemoryIdentityAuthenticator, InMemoryRefreshTokenStorage,
    InMemoryUserDirectory, RefreshTokenStorage,
};
use lmsgate_auth::types::{ClientValidationError, UserId};
use lmsgate_auth::{AuthError, GrantService, RefreshTokenService, TokenCodec};
use lmsgate_auth_postgres::{PostgresAuthStorage, StorageError};
use tracing::info;

use crate::config::{AppConfig, StorageBackend};

/// Errors raised while wiring the grant service.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("invalid client registration: {0}")]
    Client(#[from] ClientValidationError),

    #[error("invalid user: {0}")]
    User(#[source] AuthError),

    #[error("storage backend: {0}")]
    Storage(#[from] StorageError),
}

/// Creates the refresh-token store for the configured backend.
///
/// # Errors
///
/// Returns an error if the PostgreSQL backend cannot be reached or migrated.
pub async fn refresh_token_storage(
    cfg: &AppConfig,
) -> Result<Arc<dyn RefreshTokenStorage>, BootstrapError> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            info!(backend = "memory", "Refresh-token storage initialized");
            Ok(Arc::new(InMemoryRefreshTokenStorage::new()))
        }
        StorageBackend::Postgres => {
            let pg = cfg.storage.postgres.clone().unwrap_or_default();
            let storage = PostgresAuthStorage::connect(&pg.connection_url(), pg.pool_size).await?;
            if pg.run_migrations {
                storage.migrate().await?;
            }
            info!(
                backend = "postgres",
                host = %pg.host,
                database = %pg.database,
                pool_size = pg.pool_size,
                "Refresh-token storage initialized"
            );
            Ok(Arc::new(storage.refresh_tokens()))
        }
    }
}

/// Builds the grant service over the given refresh-token store.
///
/// # Errors
///
/// Returns an error if a client registration or a password hash is invalid.
pub fn grant_service(
    cfg: &AppConfig,
    refresh_storage: Arc<dyn RefreshTokenStorage>,
) -> Result<Arc<GrantService>, BootstrapError> {
    let clients = Arc::new(InMemoryClientRegistry::from_registrations(
        cfg.clients.iter().cloned(),
    )?);

    let users = Arc::new(InMemoryUserDirectory::new());
    let identity = InMemoryIdentityAuthenticator::new(Arc::clone(&clients));
    for user in &cfg.users {
        users.insert(UserId(user.id), user.login.clone());
        if let Some(ref hash) = user.password_hash {
            identity
                .set_password_hash(user.login.clone(), hash.clone())
                .map_err(BootstrapError::User)?;
        }
    }

    info!(
        clients = clients.len(),
        users = cfg.users.len(),
        "Client registry loaded"
    );

    let codec = Arc::new(TokenCodec::new(cfg.auth.token.clone()));
    let refresh = Arc::new(RefreshTokenService::new(
        refresh_storage,
        users.clone(),
        Arc::clone(&codec),
        &cfg.auth,
    ));

    Ok(Arc::new(GrantService::new(
        clients,
        Arc::new(identity),
        users,
        codec,
        refresh,
        &cfg.auth,
    )))
}
