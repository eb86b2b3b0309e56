//! Password hashing.
//!
//! Passwords are stored as Argon2id PHC strings with a random 16-byte salt.

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use rand::RngCore;
use thiserror::Error;

/// Errors raised while hashing or verifying a password.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The hasher could not produce a hash.
    #[error("Failed to hash password: {0}")]
    Hash(String),

    /// The stored hash is not a valid PHC string.
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),
}

/// Hash checked when a login names no known user, so that answer takes as
/// long as a wrong password.
static UNKNOWN_USER_HASH: LazyLock<Result<String, PasswordError>> =
    LazyLock::new(|| PasswordHasher::new().hash("no such user"));

/// Argon2id password hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    const SALT_BYTES: usize = 16;

    /// Creates a new hasher with the default Argon2id parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Hashes `password` with a freshly generated salt.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hash` if salt encoding or hashing fails.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; Self::SALT_BYTES];
        rand::rng().fill_bytes(&mut salt_bytes);

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|error| PasswordError::Hash(error.to_string()))?;

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| PasswordError::Hash(error.to_string()))
    }

    /// Checks `password` against a stored hash.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::MalformedHash` if `hash` cannot be parsed.
    /// A wrong password is `Ok(false)`, not an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|error| PasswordError::MalformedHash(error.to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Runs the same verification as [`verify`](Self::verify) against a
    /// fixed hash and always answers `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::Hash` if the fixed hash could not be built.
    pub fn verify_unknown_user(&self, password: &str) -> Result<bool, PasswordError> {
        let hash = UNKNOWN_USER_HASH.as_ref().map_err(Clone::clone)?;
        self.verify(password, hash).map(|_| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[rstest]
    fn test_hash_is_salted() {
        let hasher = PasswordHasher::new();
        assert_ne!(
            hasher.hash("same password").unwrap(),
            hasher.hash("same password").unwrap()
        );
    }

    #[rstest]
    #[case("no such user")]
    #[case("correct horse")]
    #[case("")]
    fn test_verify_unknown_user_never_matches(#[case] password: &str) {
        let hasher = PasswordHasher::new();
        assert_eq!(hasher.verify_unknown_user(password), Ok(false));
        assert!(UNKNOWN_USER_HASH.as_ref().unwrap().starts_with("$argon2id$"));
    }

    #[rstest]
    fn test_verify_rejects_malformed_hash() {
        let result = PasswordHasher::new().verify("anything", "plaintext");
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }
}
