//! Audit trail models.
//!
//! Every setting or rule mutation produces exactly one [`AuditRecord`].
//! Records are immutable: nothing in the crate updates or deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The entity an audit record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AuditSubject {
    /// A setting, by id.
    Setting(Uuid),
    /// A pricing rule, by id.
    Rule(Uuid),
}

impl fmt::Display for AuditSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditSubject::Setting(id) => write!(f, "setting:{}", id),
            AuditSubject::Rule(id) => write!(f, "rule:{}", id),
        }
    }
}

/// The kind of mutation recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The subject was created.
    Created,
    /// The subject was updated.
    Updated,
    /// The subject was deleted.
    Deleted,
}

/// One immutable entry in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// What was changed.
    pub subject: AuditSubject,
    /// The kind of change.
    pub action: AuditAction,
    /// Snapshot before the change; `None` on creation.
    pub old_value: Option<serde_json::Value>,
    /// Snapshot after the change; `None` on deletion.
    pub new_value: Option<serde_json::Value>,
    /// Who made the change.
    pub actor: String,
    /// Why the change was made.
    pub reason: Option<String>,
    /// When the change was made.
    pub timestamp: DateTime<Utc>,
}
