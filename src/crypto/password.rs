//! Adaptive password hashing with Argon2id.
//!
//! Each hash embeds a fresh salt, so hashing is never deterministic across
//! calls while verification still succeeds for the same password.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier};
use rand::rngs::OsRng;
use tracing::warn;

use crate::crypto::CryptoError;

/// Argon2id hasher/verifier with the library default parameters.
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Hash a password into a PHC string suitable for storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::PasswordHash`] if the backend rejects the
    /// input.
    pub fn hash(&self, password: &str) -> Result<String, CryptoError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| CryptoError::PasswordHash)
    }

    /// Verify a password against a stored PHC string. A malformed stored
    /// hash verifies as `false` rather than failing the caller.
    #[must_use]
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("stored password hash is not a valid PHC string");
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password() {
        let hasher = PasswordHasher;
        let stored = hasher.hash("correct horse battery staple").unwrap();
        assert!(hasher.verify("correct horse battery staple", &stored));
        assert!(!hasher.verify("Tr0ub4dor&3", &stored));
    }

    #[test]
    fn hashing_embeds_a_fresh_salt() {
        let hasher = PasswordHasher;
        let first = hasher.hash("same password").unwrap();
        let second = hasher.hash("same password").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("same password", &first));
        assert!(hasher.verify("same password", &second));
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        let hasher = PasswordHasher;
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", ""));
    }
}
