//! Axum extractors for authentication.
//!
//! ## Extractors
//!
//! - [`BearerAuth`] - Validates an `Authorization: Bearer` access token
//!
//! ## Authentication Logging
//!
//! Successful authentications are logged at debug level with structured
//! fields:
//!
//! ```text
//! DEBUG api_key="acme" user="alice" endpoint="/v1/oauth2/refresh/info" method="GET" "Bearer token accepted"
//! ```
//!
//! ### Usage Example
//!
//! ```ignore
//! use lmsgate_auth::extractors::BearerAuth;
//!
//! async fn handler(auth: BearerAuth) -> String {
//!     format!("{} via {}", auth.user, auth.api_key)
//! }
//! ```

mod bearer;

pub use bearer::{BearerAuth, BearerAuthError};
