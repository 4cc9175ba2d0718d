//! Salted password hashes for seeded principals
//!
//! Hashes are stored in PHC form, so the salt and Argon2 parameters travel
//! with the hash and `verify_password` needs nothing else.

use crate::error::{CatalogError, Result};
use argon2::password_hash::{self, rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

fn internal(action: &'static str) -> impl FnOnce(password_hash::Error) -> CatalogError {
    move |e| CatalogError::Internal(format!("cannot {} password: {}", action, e))
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(internal("hash"))
}

/// `Ok(false)` on mismatch; `Err` only when `stored` is not a usable hash
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let stored = PasswordHash::new(stored).map_err(internal("parse hashed"))?;

    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(internal("verify")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret", &hash).unwrap());
        assert!(!verify_password("Secret", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("secret").unwrap();
        let second = hash_password("secret").unwrap();

        assert_ne!(first, second);
        assert!(verify_password("secret", &second).unwrap());
    }

    #[test]
    fn test_empty_password_round_trips() {
        let hash = hash_password("").unwrap();
        assert!(verify_password("", &hash).unwrap());
        assert!(!verify_password(" ", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let err = verify_password("secret", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, CatalogError::Internal(_)));
    }
}
