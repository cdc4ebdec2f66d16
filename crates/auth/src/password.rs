//! Password hashing for worker credentials.
//!
//! Argon2id in PHC string format: the salt and cost parameters travel inside
//! the hash, so verification needs no out-of-band configuration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("failed to hash password")]
    Hash,
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|_| PasswordError::Hash)?
        .to_string();
    Ok(phc)
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Never panics: a malformed stored hash verifies as `false` rather than
/// erroring, and the underlying comparison is constant-time.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
