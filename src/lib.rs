//! # Custodia (Security Core for Protected Health Records)
//!
//! `custodia` is the security subsystem of a patient-record platform. It owns
//! everything with a hard confidentiality or non-repudiation invariant and
//! nothing else: field-level encryption, pseudonymization, credential
//! authentication with TOTP-based MFA and account lockout, role-based
//! authorization, and an append-only audit trail.
//!
//! ## Boundaries
//!
//! HTTP routing, the relational schema, bulk import, and mail delivery are
//! callers of this crate, not part of it. Two seams matter:
//!
//! - **[`CredentialStore`]** — the host supplies credential lookup and atomic
//!   update. The in-memory implementation is suitable for tests and small
//!   deployments; a SQL-backed implementation must perform each mutation as a
//!   single transaction.
//! - **Key material** — two independent 32-byte symmetric keys and one
//!   Ed25519 signing key are provisioned out of band and handed to
//!   [`KeyMaterial`]. The core never generates or persists them.
//!
//! ## Authentication flow
//!
//! [`AuthenticationEngine::authenticate`] runs the login state machine:
//! credential lookup, lockout check, password verification, failed-attempt
//! accounting, then either a full access/refresh token pair or a short-lived
//! MFA-pending token. A pending token is a distinct [`TokenKind`] and is never
//! accepted where a full session is required. Every step lands in the
//! [`AuditLog`].
//!
//! Failures are deliberately uniform towards the caller
//! ([`AuthError::InvalidCredentials`] covers unknown user, wrong password,
//! inactive, and locked accounts); the precise reason is audited internally.

pub mod audit;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod mfa;
pub mod token;

pub use audit::{AuditAction, AuditEvent, AuditLog, TimeRange};
pub use auth::{
    authorize, AuthError, AuthenticationEngine, Credential, CredentialStore,
    InMemoryCredentialStore, LoginOutcome, MfaEnrollment, Role, StoreError, TokenPair,
};
pub use config::{Config, ConfigError, SecurityPolicy};
pub use crypto::{
    record_link_token, CryptoError, EncryptedField, FieldCipher, KeyMaterial, PasswordHasher,
    PseudonymId, Pseudonymizer, DECRYPTION_SENTINEL,
};
pub use mfa::{MfaError, MfaProvider};
pub use token::{SessionClaims, TokenError, TokenKind, TokenService};
