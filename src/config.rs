//! Key material and security policy loaded from the environment.
//!
//! Construction is the startup gate: missing or malformed key material is a
//! [`ConfigError`] and the process must not come up without it.

use std::env;
use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use crate::crypto::KeyMaterial;

/// Environment variable holding the base64 field-encryption key (32 bytes).
pub const ENV_FIELD_KEY: &str = "CUSTODIA_FIELD_KEY";
/// Environment variable holding the base64 master key (32 bytes).
pub const ENV_MASTER_KEY: &str = "CUSTODIA_MASTER_KEY";
/// Environment variable holding the base64 Ed25519 signing key (64 bytes).
pub const ENV_SIGNING_KEY: &str = "CUSTODIA_SIGNING_KEY";
/// Environment variable holding the audit log path.
pub const ENV_AUDIT_LOG: &str = "CUSTODIA_AUDIT_LOG";
/// Environment variable holding the TOTP issuer label.
pub const ENV_MFA_ISSUER: &str = "CUSTODIA_MFA_ISSUER";
/// Environment variable overriding the lockout threshold.
pub const ENV_MAX_LOGIN_ATTEMPTS: &str = "CUSTODIA_MAX_LOGIN_ATTEMPTS";
/// Environment variable overriding the lockout duration (minutes).
pub const ENV_LOCKOUT_MINUTES: &str = "CUSTODIA_LOCKOUT_MINUTES";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid key material for {name}: {reason}")]
    InvalidKey { name: &'static str, reason: String },
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Tunable security policy for authentication and tokens.
///
/// Defaults match the deployment baseline: five failed attempts lock an
/// account for thirty minutes, access tokens live thirty minutes, refresh
/// tokens seven days, and an MFA-pending token five minutes.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    pub max_login_attempts: u32,
    pub lockout_duration: Duration,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub mfa_pending_ttl: Duration,
    /// Accepted clock drift for TOTP codes, in 30-second steps on each side.
    pub totp_window: u8,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            max_login_attempts: 5,
            lockout_duration: Duration::minutes(30),
            access_token_ttl: Duration::minutes(30),
            refresh_token_ttl: Duration::days(7),
            mfa_pending_ttl: Duration::minutes(5),
            totp_window: 1,
        }
    }
}

/// Fully resolved core configuration.
#[derive(Debug)]
pub struct Config {
    pub keys: KeyMaterial,
    pub policy: SecurityPolicy,
    pub audit_log_path: PathBuf,
    pub token_issuer: String,
    pub mfa_issuer: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any required key is absent or does not
    /// decode to the expected length, or if a numeric override is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let field_key = require(ENV_FIELD_KEY)?;
        let master_key = require(ENV_MASTER_KEY)?;
        let signing_key = require(ENV_SIGNING_KEY)?;
        let keys = KeyMaterial::from_base64(&field_key, &master_key, &signing_key)?;

        let mut policy = SecurityPolicy::default();
        if let Some(raw) = optional(ENV_MAX_LOGIN_ATTEMPTS) {
            policy.max_login_attempts = parse_positive(ENV_MAX_LOGIN_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = optional(ENV_LOCKOUT_MINUTES) {
            let minutes = parse_positive(ENV_LOCKOUT_MINUTES, &raw)?;
            policy.lockout_duration = Duration::minutes(i64::from(minutes));
        }

        let audit_log_path = optional(ENV_AUDIT_LOG)
            .map_or_else(|| PathBuf::from("custodia-audit.log"), PathBuf::from);
        let mfa_issuer = optional(ENV_MFA_ISSUER).unwrap_or_else(|| "Custodia".to_string());

        Ok(Self {
            keys,
            policy,
            audit_log_path,
            token_issuer: "custodia".to_string(),
            mfa_issuer,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_positive(name: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| ConfigError::InvalidSetting {
            name,
            reason: format!("expected a positive integer, got {raw:?}"),
        })
}
