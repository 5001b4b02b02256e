//! Field-level authenticated encryption.
//!
//! Each value is encrypted independently under the static field key with
//! ChaCha20-Poly1305. The encoded form is `base64(nonce || ciphertext)`, so a
//! stored field is self-describing: decryption needs only the field key.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto::{CryptoError, KeyMaterial};

const NONCE_LEN: usize = 12;

/// Placeholder a caller receives for a field whose ciphertext could not be
/// read back. Substituting it keeps the rest of the record usable.
pub const DECRYPTION_SENTINEL: &str = "[unreadable]";

/// Opaque encoded ciphertext of one field value.
///
/// The empty plaintext maps to the empty encoded value; no ciphertext is
/// produced for it and decryption of an empty field yields `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedField(String);

impl EncryptedField {
    /// Wrap an already-encoded value loaded from storage.
    #[must_use]
    pub fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EncryptedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Symmetric authenticated cipher for individual field values.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: ChaCha20Poly1305,
}

impl FieldCipher {
    /// Build a cipher over the provisioned field key.
    #[must_use]
    pub fn new(keys: &KeyMaterial) -> Self {
        // KeyMaterial guarantees a 32-byte field key.
        let key = Key::from_slice(keys.field_key());
        Self {
            cipher: ChaCha20Poly1305::new(key),
        }
    }

    /// Encrypt one field value. A fresh random nonce is drawn per call, so
    /// encrypting the same plaintext twice yields different encodings.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Cipher`] only on cipher misconfiguration, never
    /// on valid input.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedField, CryptoError> {
        if plaintext.is_empty() {
            return Ok(EncryptedField(String::new()));
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Cipher)?;

        let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);
        Ok(EncryptedField(BASE64_STANDARD.encode(raw)))
    }

    /// Decrypt one field value.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the encoding is malformed, the
    /// field was encrypted under a different key, or integrity verification
    /// fails.
    pub fn decrypt(&self, field: &EncryptedField) -> Result<String, CryptoError> {
        if field.is_empty() {
            return Ok(String::new());
        }

        let raw = BASE64_STANDARD
            .decode(field.as_str())
            .map_err(|_| CryptoError::Decryption)?;
        if raw.len() <= NONCE_LEN {
            return Err(CryptoError::Decryption);
        }

        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Decryption)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption)
    }

    /// Encrypt the named fields of a record in place. Fields missing from the
    /// record are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Cipher`] on cipher misconfiguration.
    pub fn encrypt_record(
        &self,
        record: &mut HashMap<String, String>,
        sensitive_fields: &[&str],
    ) -> Result<(), CryptoError> {
        for name in sensitive_fields {
            if let Some(value) = record.get_mut(*name) {
                let encrypted = self.encrypt(value)?;
                *value = encrypted.0;
            }
        }
        Ok(())
    }

    /// Decrypt the named fields of a record in place. A field that fails
    /// decryption is replaced with [`DECRYPTION_SENTINEL`] and reported via
    /// the log; it never aborts the remaining fields.
    pub fn decrypt_record(&self, record: &mut HashMap<String, String>, sensitive_fields: &[&str]) {
        for name in sensitive_fields {
            if let Some(value) = record.get_mut(*name) {
                let field = EncryptedField(std::mem::take(value));
                match self.decrypt(&field) {
                    Ok(plaintext) => *value = plaintext,
                    Err(_) => {
                        warn!(field = *name, "field failed decryption, substituting sentinel");
                        *value = DECRYPTION_SENTINEL.to_string();
                    }
                }
            }
        }
    }
}
