//! HTTP handlers for the OAuth 2.0 endpoints.
//!
//! # Available Handlers
//!
//! - [`authorize`] - Authorization endpoint (login / consent / redirect)
//! - [`token`] - Token endpoint
//! - [`tokeninfo`] - Token description
//! - [`refresh_info`] - Refresh-token entry inspection and revocation
//! - [`session`] - Host LMS session exchange
//!
//! [`oauth_router`] mounts all of them on an [`OAuthState`].

pub mod authorize;
pub mod error;
pub mod refresh_info;
pub mod session;
pub mod state;
pub mod token;
pub mod tokeninfo;

use axum::Router;
use axum::routing::{get, post};

pub use authorize::{authorize_form_handler, authorize_handler};
pub use error::ErrorResponse;
pub use refresh_info::{refresh_info_handler, refresh_revoke_handler};
pub use session::session_exchange_handler;
pub use state::OAuthState;
pub use token::token_handler;
pub use tokeninfo::token_info_handler;

/// Routes of the OAuth2 endpoints, relative to their mount point.
pub fn oauth_router(state: OAuthState) -> Router {
    Router::new()
        .route("/auth", get(authorize_handler).post(authorize_form_handler))
        .route("/token", post(token_handler))
        .route("/tokeninfo", get(token_info_handler).post(token_info_handler))
        .route("/refresh/info", get(refresh_info_handler))
        .route("/refresh", axum::routing::delete(refresh_revoke_handler))
        .route("/session/bearer", post(session_exchange_handler))
        .with_state(state)
}
