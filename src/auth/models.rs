//! Credential record and role hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Totally ordered role hierarchy, lowest to highest privilege.
///
/// Authorization compares ranks, so "at least practitioner" is a single
/// integer comparison. The superuser override lives on the credential, not
/// in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(rename = "readonly")]
    ReadOnly,
    Assistant,
    Practitioner,
    Administrator,
}

impl Role {
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::ReadOnly => 1,
            Self::Assistant => 2,
            Self::Practitioner => 3,
            Self::Administrator => 4,
        }
    }
}

/// One user credential record.
///
/// Owned by the [`crate::auth::CredentialStore`]; only the authentication
/// engine mutates the login-security fields, and always through the store's
/// atomic operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub login_name: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub superuser: bool,
    pub mfa_enabled: bool,
    /// Pending (unconfirmed) until a successful verification flips
    /// `mfa_enabled`; an unconfirmed secret grants nothing.
    pub mfa_secret: Option<String>,
    pub failed_login_attempts: u32,
    /// Absent means not locked. Once past, the account is implicitly
    /// unlocked; no separate unlock action exists.
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// A fresh, active, non-superuser credential with zeroed login-security
    /// state.
    #[must_use]
    pub fn new(
        login_name: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            login_name: login_name.into(),
            email: email.into(),
            display_name: display_name.into(),
            password_hash: password_hash.into(),
            role,
            active: true,
            superuser: false,
            mfa_enabled: false,
            mfa_secret: None,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            password_changed_at: now,
            created_at: now,
        }
    }

    /// Whether the account is locked at `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }
}
