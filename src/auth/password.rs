//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant with default parameters. Hashes are stored in PHC
//! format, so salt and parameters travel with the hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::types::HortaError;

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, HortaError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HortaError::Auth(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash
///
/// Errors only when the stored hash itself is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, HortaError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| HortaError::Auth(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("tomate-cereja").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("tomate-cereja", &hash).unwrap());
        assert!(!verify_password("alface", &hash).unwrap());
    }

    #[test]
    fn test_salted() {
        let hash1 = hash_password("pw").unwrap();
        let hash2 = hash_password("pw").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("pw", &hash1).unwrap());
        assert!(verify_password("pw", &hash2).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("pw", "plaintext-from-an-old-import").is_err());
    }
}
