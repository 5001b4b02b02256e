//! Append-only audit trail for every access to protected data.

pub mod event;
pub mod log;

pub use event::{AuditAction, AuditEvent};
pub use log::{AuditLog, TimeRange};
