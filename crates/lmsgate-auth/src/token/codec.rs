//! Signed, expiring tokens.
//!
//! Every artifact the server hands out (authorization codes, access tokens,
//! refresh tokens and consent authenticity tickets) is a self-contained
//! token of the form
//!
//! ```text
//! base64url(json(claims)) "." base64url(hmac_sha256(secret, first segment))
//! ```
//!
//! Both segments use the URL-safe alphabet without padding. The signature is
//! verified in constant time before the claims are decoded, so a token that
//! parses was minted by a holder of the server secret.

use std::fmt;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::TokenConfig;
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Token type reported in bearer responses.
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Prefix of the random auxiliary value carried by refresh tokens.
const REFRESH_SALT_PREFIX: &str = "refresh-";

/// Kind of a signed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Authorization code, exchanged at the token endpoint.
    AuthorizationCode,
    /// Bearer access token.
    Access,
    /// Refresh token.
    Refresh,
    /// Short-lived ticket carrying the authenticated user across consent.
    Authenticity,
}

impl TokenKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Access => "access",
            Self::Refresh => "refresh",
            Self::Authenticity => "authenticity",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Login of the subject.
    pub user: String,

    /// API key the token was issued to.
    pub api_key: String,

    /// Token kind.
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Auxiliary data: the redirect URI for codes, a random salt for
    /// refresh tokens, empty otherwise.
    #[serde(default)]
    pub misc: String,

    /// Expiry as unix seconds.
    pub exp: i64,

    /// Random value making every minted token unique.
    pub nonce: String,
}

/// A minted or successfully parsed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    claims: TokenClaims,
    encoded: String,
}

impl Token {
    /// Login of the subject.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.claims.user
    }

    /// API key the token was issued to.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.claims.api_key
    }

    /// Token kind.
    #[must_use]
    pub fn kind(&self) -> TokenKind {
        self.claims.kind
    }

    /// Auxiliary data.
    #[must_use]
    pub fn misc(&self) -> &str {
        &self.claims.misc
    }

    /// Expiry as unix seconds.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }

    /// All claims.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Encoded wire form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the token, returning its wire form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.encoded
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

/// Bearer token response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    /// The access token.
    pub access_token: String,

    /// Seconds until the access token expires.
    pub expires_in: i64,

    /// Always `"bearer"`.
    pub token_type: String,

    /// Granted scope.
    pub scope: String,

    /// Refresh token, when the API key has refresh tokens enabled for the
    /// grant that produced this response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl BearerToken {
    /// Attaches a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

/// Mints and verifies signed tokens.
pub struct TokenCodec {
    config: TokenConfig,
}

impl TokenCodec {
    /// Creates a codec signing with `config.secret`.
    #[must_use]
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Token configuration in use.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Mints a token expiring `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the claims cannot be encoded.
    pub fn mint(
        &self,
        user: &str,
        api_key: &str,
        kind: TokenKind,
        misc: &str,
        ttl: Duration,
    ) -> AuthResult<Token> {
        self.mint_at(OffsetDateTime::now_utc(), user, api_key, kind, misc, ttl)
    }

    /// Mints a token expiring `ttl` after `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the expiry is out of range or the
    /// claims cannot be encoded.
    pub fn mint_at(
        &self,
        now: OffsetDateTime,
        user: &str,
        api_key: &str,
        kind: TokenKind,
        misc: &str,
        ttl: Duration,
    ) -> AuthResult<Token> {
        let expires_at = time::Duration::try_from(ttl)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| AuthError::internal("Token lifetime out of range"))?;

        let claims = TokenClaims {
            user: user.to_string(),
            api_key: api_key.to_string(),
            kind,
            misc: misc.to_string(),
            exp: expires_at.unix_timestamp(),
            nonce: generate_nonce(),
        };

        let json = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode token claims: {e}")))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(payload.as_bytes())?);

        Ok(Token {
            claims,
            encoded: format!("{payload}.{signature}"),
        })
    }

    /// Parses a token, verifying its signature.
    ///
    /// Expiry is not checked; see [`TokenCodec::validate`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MalformedToken` if the structure or signature is
    /// invalid.
    pub fn parse(&self, raw: &str) -> AuthResult<Token> {
        let (payload, signature) = raw
            .split_once('.')
            .ok_or_else(|| AuthError::malformed_token("missing signature segment"))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::malformed_token("signature is not base64url"))?;

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::malformed_token("signature mismatch"))?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::malformed_token("payload is not base64url"))?;
        let claims: TokenClaims = serde_json::from_slice(&json)
            .map_err(|e| AuthError::malformed_token(format!("invalid claims: {e}")))?;

        Ok(Token {
            claims,
            encoded: raw.to_string(),
        })
    }

    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self, token: &Token) -> bool {
        self.is_expired_at(token, OffsetDateTime::now_utc())
    }

    /// Returns `true` if the token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, token: &Token, now: OffsetDateTime) -> bool {
        now.unix_timestamp() >= token.claims.exp
    }

    /// Returns `true` if `raw` carries a valid signature and has not expired.
    #[must_use]
    pub fn is_valid(&self, raw: &str) -> bool {
        self.is_valid_at(raw, OffsetDateTime::now_utc())
    }

    /// Returns `true` if `raw` carries a valid signature and has not expired
    /// at `now`.
    #[must_use]
    pub fn is_valid_at(&self, raw: &str, now: OffsetDateTime) -> bool {
        self.parse(raw)
            .is_ok_and(|token| !self.is_expired_at(&token, now))
    }

    /// Time left until the token expires; zero once expired.
    #[must_use]
    pub fn remaining_time(&self, token: &Token) -> Duration {
        remaining_secs(token, OffsetDateTime::now_utc())
    }

    /// Parses `raw` and checks expiry and kind.
    ///
    /// # Errors
    ///
    /// - `AuthError::MalformedToken` if parsing fails
    /// - `AuthError::TokenExpired` if the token has expired
    /// - `AuthError::InvalidTokenKind` if the kind differs from `expected`
    pub fn validate(&self, raw: &str, expected: TokenKind) -> AuthResult<Token> {
        let token = self.parse(raw)?;

        if self.is_expired(&token) {
            return Err(AuthError::TokenExpired);
        }

        if token.kind() != expected {
            return Err(AuthError::invalid_token_kind(expected, token.kind()));
        }

        Ok(token)
    }

    /// Mints an access token and wraps it into a bearer response.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if minting fails.
    pub fn issue_bearer(&self, user: &str, api_key: &str) -> AuthResult<BearerToken> {
        let lifetime = self.config.access_token_lifetime;
        let token = self.mint(user, api_key, TokenKind::Access, "", lifetime)?;

        Ok(BearerToken {
            access_token: token.into_string(),
            expires_in: i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX),
            token_type: BEARER_TOKEN_TYPE.to_string(),
            scope: self.config.scope.clone(),
            refresh_token: None,
        })
    }

    fn sign(&self, payload: &[u8]) -> AuthResult<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn mac(&self) -> AuthResult<HmacSha256> {
        HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| AuthError::internal(format!("Invalid signing key: {e}")))
    }
}

/// Returns a fresh `refresh-XXXXX` auxiliary value for refresh tokens.
#[must_use]
pub fn refresh_salt() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect();
    format!("{REFRESH_SALT_PREFIX}{suffix}")
}

pub(crate) fn remaining_secs(token: &Token, now: OffsetDateTime) -> Duration {
    let left = token.claims.exp - now.unix_timestamp();
    Duration::from_secs(u64::try_from(left).unwrap_or(0))
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
