//! Argon2 password hashing.
//!
//! Stored values are PHC strings (`$argon2id$v=19$...`) with a random salt,
//! so two accounts with the same password never share a hash.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::{CoreError, CoreResult};
use crate::validation::validate_password;

/// Hashes a plain-text password after checking its length.
pub fn hash_password(plain: &str) -> CoreResult<String> {
    validate_password(plain)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| CoreError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// True when `plain` matches the stored hash. Malformed hashes never match.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
