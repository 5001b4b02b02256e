//! Append-only JSON-lines audit sink with a subject-access query path.
//!
//! A write failure must never fail the security action that produced the
//! event; it is reported through the log at error level instead. Appends are
//! serialized by a mutex so one record is always one complete line.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::audit::AuditEvent;

/// Inclusive time bounds for audit queries; either side may be open.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| instant >= from)
            && self.to.is_none_or(|to| instant <= to)
    }
}

/// Durable append-only audit trail backed by one JSON-lines file.
pub struct AuditLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl AuditLog {
    /// Open (or create) the audit log at `path`, creating parent directories
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened for
    /// append.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Append one event.
    ///
    /// Never fails the caller: a serialization or write failure is surfaced
    /// through the operational log and otherwise swallowed, because the
    /// protected action's outcome takes priority over audit durability.
    pub async fn record(&self, event: &AuditEvent) {
        // Mirror to the structured log so operators see the trail live.
        if event.success {
            info!(action = ?event.action, resource = ?event.resource_id, "audit event");
        } else {
            warn!(
                action = ?event.action,
                resource = ?event.resource_id,
                error = event.error.as_deref(),
                "audit event (failed action)"
            );
        }

        let mut line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(err) => {
                error!(%err, "audit event could not be serialized, record dropped");
                return;
            }
        };
        line.push('\n');

        let mut writer = self.writer.lock().await;
        let outcome = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await;
        if let Err(err) = outcome {
            error!(%err, path = %self.path.display(), "audit append failed");
        }
    }

    /// Return all events referencing `resource_id` within `range`, in
    /// storage (chronological) order. Malformed stored lines are skipped.
    ///
    /// This is the subject-access-request path: "show every access to this
    /// record".
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the log exists but cannot be
    /// read. A missing log yields an empty result.
    pub async fn query(
        &self,
        resource_id: &str,
        range: TimeRange,
    ) -> io::Result<Vec<AuditEvent>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut events = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(event) = serde_json::from_str::<AuditEvent>(line) else {
                warn!("skipping malformed audit line");
                continue;
            };
            if event.resource_id.as_deref() != Some(resource_id) {
                continue;
            }
            if !range.contains(event.timestamp) {
                continue;
            }
            events.push(event);
        }
        Ok(events)
    }
}
