//! # lmsgate-auth
//!
//! OAuth2 authorization server core for the lmsgate LMS REST plugin.
//!
//! This crate provides:
//! - Signed, expiring tokens (authorization codes, access, refresh and
//!   consent authenticity tokens)
//! - The grant-type state machine for the authorization-code, implicit,
//!   resource-owner password and client-credentials flows
//! - Refresh-token bookkeeping with a per-value redemption quota
//! - Exchange of host LMS sessions for bearer tokens
//! - Axum handlers for the authorization, token and token-info endpoints
//!
//! ## Overview
//!
//! The host LMS owns users and API keys. The grant flows reach it only
//! through the collaborator traits in [`storage`]; in-memory implementations
//! are bundled for static configuration and tests.
//!
//! ## Modules
//!
//! - [`config`] - Token lifetimes, signing secret, refresh quota
//! - [`token`] - Token minting and validation
//! - [`oauth`] - Grant flows and refresh-token service
//! - [`storage`] - Collaborator and storage traits
//! - [`http`] - Axum HTTP handlers for the OAuth2 endpoints
//! - [`extractors`] - Bearer token extractor
//! - [`credentials`] - Argon2 secret hashing

pub mod config;
pub mod credentials;
pub mod error;
pub mod extractors;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use extractors::BearerAuth;
pub use http::{OAuthState, oauth_router};
pub use oauth::{AuthorizationOutcome, GrantService, RefreshTokenService};
pub use storage::{
    ClientRegistry, IdentityAuthenticator, RefreshTokenStorage, SessionAuthenticator,
    UserDirectory,
};
pub use token::{BearerToken, TokenCodec, TokenKind};
pub use types::{AllowedUsers, ClientRegistration, GrantType, UserId};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use lmsgate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, RefreshConfig, TokenConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::extractors::BearerAuth;
    pub use crate::http::{OAuthState, oauth_router};
    pub use crate::oauth::{
        AuthorizationOutcome, AuthorizationRequest, GrantService, RefreshTokenService,
        SessionExchange, SessionExchangeRequest, TokenGrant, TokenInfo, TokenRequest,
    };
    pub use crate::storage::{
        ClientRegistry, IdentityAuthenticator, InMemoryClientRegistry,
        InMemoryIdentityAuthenticator, InMemoryRefreshTokenStorage, InMemorySessionAuthenticator,
        InMemoryUserDirectory, RefreshTokenStorage, SessionAuthenticator, UserDirectory,
    };
    pub use crate::token::{BearerToken, Token, TokenCodec, TokenKind};
    pub use crate::types::{AllowedUsers, ClientRegistration, GrantType, UserId};
}
