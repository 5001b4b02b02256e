//! Authentication, authorization, and the credential boundary.

pub mod engine;
pub mod guard;
pub mod models;
pub mod store;

use thiserror::Error;

pub use engine::{AuthenticationEngine, LoginOutcome, MfaEnrollment, TokenPair};
pub use guard::authorize;
pub use models::{Credential, Role};
pub use store::{CredentialStore, InMemoryCredentialStore, StoreError};

use crate::crypto::CryptoError;
use crate::mfa::MfaError;
use crate::token::TokenError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user, wrong password, inactive, or locked account. Kept
    /// deliberately undifferentiated so callers cannot probe which login
    /// names exist; the audit trail carries the precise reason.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Expired, malformed, or signature-mismatched token. Undifferentiated
    /// towards the caller for the same reason.
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid mfa code")]
    InvalidMfaCode,
    #[error("mfa is not configured for this account")]
    MfaNotConfigured,
    #[error("mfa is already enabled for this account")]
    MfaAlreadyEnabled,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        // Collapse the internal detail; token problems all look alike from
        // outside.
        Self::InvalidToken
    }
}

impl From<MfaError> for AuthError {
    fn from(_: MfaError) -> Self {
        Self::InvalidMfaCode
    }
}
