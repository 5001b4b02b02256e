//! Deterministic one-way pseudonymization of record identifiers.
//!
//! Distinct from [`crate::crypto::FieldCipher`]: there is no way back from a
//! pseudonym to the identifier. Higher layers treat a pseudonym collision as
//! "record already exists".

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable, irreversible surrogate identifier: 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PseudonymId(String);

impl PseudonymId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PseudonymId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-way identifier hasher, optionally salted at construction.
#[derive(Debug, Clone, Default)]
pub struct Pseudonymizer {
    default_salt: Option<String>,
}

impl Pseudonymizer {
    /// Pseudonymizer with a fixed salt applied to every identifier.
    #[must_use]
    pub fn with_salt(salt: impl Into<String>) -> Self {
        Self {
            default_salt: Some(salt.into()),
        }
    }

    /// Hash a canonical identifier (e.g. a name+birthdate composite) using
    /// the construction-time salt, if any.
    #[must_use]
    pub fn pseudonymize(&self, identifier: &str) -> PseudonymId {
        match &self.default_salt {
            Some(salt) => self.pseudonymize_salted(identifier, salt),
            None => digest(identifier, ""),
        }
    }

    /// Hash a canonical identifier with an explicit salt, overriding the
    /// construction-time salt.
    #[must_use]
    pub fn pseudonymize_salted(&self, identifier: &str, salt: &str) -> PseudonymId {
        digest(identifier, salt)
    }
}

fn digest(identifier: &str, salt: &str) -> PseudonymId {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hasher.update(salt.as_bytes());
    PseudonymId(hex::encode(hasher.finalize()))
}
