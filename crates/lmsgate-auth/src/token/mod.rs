//! Token minting and validation.
//!
//! All tokens are HMAC-SHA256 signed, self-contained and expiring. See
//! [`codec`] for the wire format.

pub mod codec;

pub use codec::{BEARER_TOKEN_TYPE, BearerToken, Token, TokenClaims, TokenCodec, TokenKind, refresh_salt};
