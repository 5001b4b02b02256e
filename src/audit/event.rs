//! Audit event vocabulary and record shape.
//!
//! An event answers: who, what, when, on which resource, from where, and
//! with which outcome. Events are immutable once recorded; retention and
//! archival are external policy.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed vocabulary of security-relevant actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Authentication
    Login,
    Logout,
    LoginFailed,
    MfaEnabled,
    MfaDisabled,
    PasswordChanged,
    TokenRefreshed,

    // Record access
    RecordViewed,
    RecordCreated,
    RecordUpdated,
    RecordDeleted,

    // Consent
    ConsentGiven,
    ConsentRevoked,

    // Bulk data movement
    DataImport,
    DataExport,

    // Administration
    UserCreated,
    UserDeleted,
    PermissionChanged,
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Uuid>,
    /// Denormalized login name; survives actor deletion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl AuditEvent {
    /// Start a successful event for `action`, timestamped now.
    #[must_use]
    pub fn new(action: AuditAction) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            actor: None,
            actor_name: None,
            resource_type: None,
            resource_id: None,
            origin: None,
            user_agent: None,
            success: true,
            error: None,
            extra: None,
        }
    }

    #[must_use]
    pub fn actor(mut self, actor: Uuid) -> Self {
        self.actor = Some(actor);
        self
    }

    #[must_use]
    pub fn actor_name(mut self, name: impl Into<String>) -> Self {
        self.actor_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn resource(mut self, resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn origin(mut self, origin: Option<IpAddr>) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Mark the event failed, with the internally audited reason.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}
