//! Common types used across the authentication and authorization modules.
//!
//! ## Domain Types
//!
//! - [`GrantType`] - Supported OAuth grant types
//! - [`ClientRegistration`] - API key registration record
//! - [`UserId`] / [`AllowedUsers`] - Host user identifiers and per-key policy
//! - [`RefreshTokenEntry`] - Refresh-token bookkeeping per (user, API key)

pub mod client;
pub mod refresh_token;

pub use client::{AllowedUsers, ClientRegistration, ClientValidationError, GrantType, UserId};
pub use refresh_token::{ConsumeOutcome, RefreshEntryInfo, RefreshTokenEntry};
