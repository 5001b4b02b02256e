//! Cryptographic primitives of the core: key material, field-level
//! authenticated encryption, pseudonymization, password hashing, and
//! unguessable record-link tokens.

pub mod field;
pub mod keys;
pub mod link;
pub mod password;
pub mod pseudonym;

use thiserror::Error;

pub use field::{EncryptedField, FieldCipher, DECRYPTION_SENTINEL};
pub use keys::KeyMaterial;
pub use link::record_link_token;
pub use password::PasswordHasher;
pub use pseudonym::{PseudonymId, Pseudonymizer};

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Unrecoverable cipher misconfiguration. Only possible on bad key
    /// material, never on valid input.
    #[error("cipher failure")]
    Cipher,
    /// Ciphertext is malformed, was produced under a different key, or failed
    /// integrity verification. One bad field never poisons its neighbors.
    #[error("field decryption failed")]
    Decryption,
    /// Password hashing backend refused the input.
    #[error("password hash failure")]
    PasswordHash,
}
