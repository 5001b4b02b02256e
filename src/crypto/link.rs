//! Unguessable tokens for record-bound links (e.g. consent confirmation).
//!
//! The token binds the record identifier and the master key to 128 bits of
//! fresh randomness; the raw value is only ever handed to the data subject.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::crypto::KeyMaterial;

/// Generate a URL-safe token for a record-bound link.
///
/// Each call yields a different token for the same record.
#[must_use]
pub fn record_link_token(keys: &KeyMaterial, record_id: &str) -> String {
    let mut random = [0u8; 16];
    OsRng.fill_bytes(&mut random);

    let mut hasher = Sha256::new();
    hasher.update(keys.master_key());
    hasher.update(record_id.as_bytes());
    hasher.update(random);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
