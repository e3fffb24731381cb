//! Password hashing and verification utilities using Argon2id.
//!
//! This module provides secure password hashing and verification
//! following OWASP password storage guidelines.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;

use crate::errors::{MithrilError, Result};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 64;

/// Argon2id with the crate's library-default parameters (spec.md §4.8
/// deliberately does not pin memory/iteration costs — it defers to
/// whatever the `argon2` crate ships as its recommended default).
pub fn password_hasher() -> Argon2<'static> {
    Argon2::default()
}

/// Reject passwords outside `[8, 64]` Unicode code points (spec.md §4.8:
/// rune-counted, not byte-counted, so multi-byte characters count once).
pub fn validate_password_length(password: &str) -> Result<()> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN || len > MAX_PASSWORD_LEN {
        return Err(MithrilError::validation_single(
            "password",
            format!("must be between {} and {} characters", MIN_PASSWORD_LEN, MAX_PASSWORD_LEN),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id with a random salt.
///
/// Returns a PHC string format hash that includes:
/// - Algorithm identifier
/// - Version
/// - Parameters (memory cost, iterations, parallelism)
/// - Salt (base64-encoded)
/// - Hash digest (base64-encoded)
///
/// # Example
///
/// ```no_run
/// use mithril_cms::auth::hashing::hash_password;
///
/// let password = "SecureP@ssw0rd";
/// let hash = hash_password(password).unwrap();
/// // hash format: $argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>
/// ```
///
/// # Errors
///
/// Returns an error if password hashing fails (extremely rare in practice).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hasher = password_hasher();

    let password_hash = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| MithrilError::internal(format!("failed to hash password: {}", err)))?;

    Ok(password_hash.to_string())
}

/// Verify a password against a hash.
///
/// Performs constant-time comparison to prevent timing attacks.
///
/// # Arguments
///
/// * `password` - The plaintext password to verify
/// * `hash` - The PHC string format hash to verify against
///
/// # Returns
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it doesn't match.
/// Returns an error if the hash format is invalid.
///
/// # Example
///
/// ```no_run
/// use mithril_cms::auth::hashing::{hash_password, verify_password};
///
/// let password = "SecureP@ssw0rd";
/// let hash = hash_password(password).unwrap();
///
/// assert!(verify_password(password, &hash).unwrap());
/// assert!(!verify_password("WrongPassword", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash).map_err(|err| {
        MithrilError::validation_single("password_hash", format!("invalid password hash format: {}", err))
    })?;

    let hasher = password_hasher();

    match hasher.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(MithrilError::internal(format!("password verification failed: {}", err))),
    }
}
