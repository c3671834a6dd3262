//! Password hashing

use anyhow::anyhow;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Hash a password into a PHC string.
pub fn hash(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow!("failed to hash password: {err}")))?;
    Ok(hashed.to_string())
}

/// Verify a password against a stored PHC string.
///
/// A stored hash that cannot be parsed never verifies.
pub fn verify(hashed_password: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hashed_password) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hex SHA-256 digest, used for reset tokens at rest.
pub fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
