//! OAuth 2.0 authorization server implementation.
//!
//! - [`authorize`] - Request/outcome types for the authorization endpoint
//! - [`token`] - Request/response types for the token endpoint
//! - [`service`] - The grant-type state machine
//! - [`refresh`] - Refresh-token issuance and redemption
//! - [`session`] - Host LMS session exchange types
//!
//! # Authorization Code Flow
//!
//! ```ignore
//! // 1. The user logs in at the authorization endpoint
//! let outcome = grants.authorize(&request).await?;
//! // AuthorizationOutcome::Redirect("https://app/cb?code=...")
//!
//! // 2. The client exchanges the code
//! let bearer = grants
//!     .authorization_code("acme", "secret", &code, "https://app/cb")
//!     .await?;
//! ```

pub mod authorize;
pub mod refresh;
pub mod service;
pub mod session;
pub mod token;

pub use authorize::{
    AuthorizationOutcome, AuthorizationRequest, LoginPrompt, PermissionPrompt, ResponseType,
};
pub use refresh::RefreshTokenService;
pub use service::GrantService;
pub use session::{SessionExchange, SessionExchangeRequest};
pub use token::{TokenGrant, TokenInfo, TokenRequest};
