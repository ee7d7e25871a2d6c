//! Shared state of the OAuth2 handlers.

use std::sync::Arc;

use crate::oauth::service::GrantService;

/// State required by every OAuth2 handler and the [`BearerAuth`] extractor.
///
/// Embed it in the application state and implement `FromRef` for it, or use
/// it directly as the router state.
///
/// [`BearerAuth`]: crate::extractors::BearerAuth
#[derive(Clone)]
pub struct OAuthState {
    /// The grant-type state machine.
    pub grants: Arc<GrantService>,
}

impl OAuthState {
    /// Creates a new handler state.
    #[must_use]
    pub fn new(grants: Arc<GrantService>) -> Self {
        Self { grants }
    }
}
