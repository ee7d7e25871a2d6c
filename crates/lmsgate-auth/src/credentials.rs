//! Secret generation and Argon2 verification.
//!
//! API secrets and user passwords known to the bundled in-memory
//! collaborators are stored as Argon2id PHC strings.
//!
//! # Example
//!
//! ```
//! use lmsgate_auth::credentials::{generate_api_secret, hash_secret, verify_secret};
//!
//! let secret = generate_api_secret();
//! let hash = hash_secret(&secret).unwrap();
//!
//! assert!(verify_secret(&secret, &hash).unwrap());
//! assert!(!verify_secret("wrong", &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

/// Generate a new random API secret.
///
/// # Format
///
/// `sk_{64 hex characters}` (67 characters total)
#[must_use]
pub fn generate_api_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("sk_{}", hex::encode(bytes))
}

/// Hash a secret for storage using Argon2id with a random salt.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
pub fn hash_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a secret against a stored Argon2 PHC hash.
///
/// Returns `Ok(false)` on mismatch.
///
/// # Errors
///
/// Returns `Err` only if the hash is not a valid PHC string.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(secret.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}
