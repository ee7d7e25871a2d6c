//! Session exchange types.
//!
//! A user logged in to the host LMS may trade the session for a bearer token
//! of an API key. Administration front-ends use this to call the REST API on
//! behalf of the current LMS user.

use serde::{Deserialize, Serialize};

use crate::token::BearerToken;
use crate::types::UserId;

/// Session exchange request, accepted as a form or as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionExchangeRequest {
    /// API key the bearer token is issued for.
    pub api_key: String,

    /// Host user id owning the session.
    pub user_id: UserId,

    /// Request token of the session.
    pub rtoken: String,

    /// Session id.
    pub session_id: String,
}

/// Successful session exchange.
#[derive(Debug, Clone, Serialize)]
pub struct SessionExchange {
    /// Login of the session owner.
    pub user: String,

    /// Issued bearer token.
    pub token: BearerToken,
}
