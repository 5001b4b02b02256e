//! Secret-material holder. Keys are provisioned out of band and validated
//! here once; every other component borrows from this struct and never sees
//! raw environment input.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretSlice};

use crate::config::ConfigError;

/// Required length of the symmetric field and master keys.
pub const SYMMETRIC_KEY_LEN: usize = 32;
/// Required length of the Ed25519 signing key (seed followed by public key).
pub const SIGNING_KEY_LEN: usize = 64;

/// Master key, field-encryption key, and token signing key.
///
/// The secrets are wrapped in [`SecretSlice`] so they are zeroized on drop
/// and redacted from `Debug` output. There is no way to serialize this type.
#[derive(Debug)]
pub struct KeyMaterial {
    field_key: SecretSlice<u8>,
    master_key: SecretSlice<u8>,
    signing_key: SecretSlice<u8>,
}

impl KeyMaterial {
    /// Build key material from base64-encoded keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] if a key does not decode or has
    /// the wrong length.
    pub fn from_base64(
        field_key: &str,
        master_key: &str,
        signing_key: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            field_key: decode("field key", field_key, SYMMETRIC_KEY_LEN)?,
            master_key: decode("master key", master_key, SYMMETRIC_KEY_LEN)?,
            signing_key: decode("signing key", signing_key, SIGNING_KEY_LEN)?,
        })
    }

    /// Build key material from raw bytes. Intended for hosts that fetch keys
    /// from a secret manager rather than the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKey`] on a length mismatch.
    pub fn from_bytes(
        field_key: Vec<u8>,
        master_key: Vec<u8>,
        signing_key: Vec<u8>,
    ) -> Result<Self, ConfigError> {
        check_len("field key", field_key.len(), SYMMETRIC_KEY_LEN)?;
        check_len("master key", master_key.len(), SYMMETRIC_KEY_LEN)?;
        check_len("signing key", signing_key.len(), SIGNING_KEY_LEN)?;
        Ok(Self {
            field_key: field_key.into(),
            master_key: master_key.into(),
            signing_key: signing_key.into(),
        })
    }

    pub(crate) fn field_key(&self) -> &[u8] {
        self.field_key.expose_secret()
    }

    pub(crate) fn master_key(&self) -> &[u8] {
        self.master_key.expose_secret()
    }

    pub(crate) fn signing_key(&self) -> &[u8] {
        self.signing_key.expose_secret()
    }
}

fn decode(name: &'static str, value: &str, expected: usize) -> Result<SecretSlice<u8>, ConfigError> {
    let bytes = BASE64_STANDARD
        .decode(value.trim())
        .map_err(|_| ConfigError::InvalidKey {
            name,
            reason: "not valid base64".to_string(),
        })?;
    check_len(name, bytes.len(), expected)?;
    Ok(bytes.into())
}

fn check_len(name: &'static str, actual: usize, expected: usize) -> Result<(), ConfigError> {
    if actual == expected {
        Ok(())
    } else {
        Err(ConfigError::InvalidKey {
            name,
            reason: format!("expected {expected} bytes, got {actual}"),
        })
    }
}
