//! Append-only persistence for audit records.

use std::sync::RwLock;

use crate::error::{EngineError, EngineResult};
use crate::models::{AuditRecord, AuditSubject};

/// Where audit records are written.
///
/// Implementations must be append-only: there is no update or delete.
/// `append` must write all records or none.
pub trait AuditSink: Send + Sync {
    /// Appends a batch of records atomically.
    fn append(&self, records: &[AuditRecord]) -> EngineResult<()>;

    /// Returns the records for one subject, oldest first.
    fn history(&self, subject: &AuditSubject) -> EngineResult<Vec<AuditRecord>>;

    /// Returns the total number of records.
    fn count(&self) -> EngineResult<usize>;
}

/// An in-memory audit log.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every record, oldest first.
    pub fn records(&self) -> EngineResult<Vec<AuditRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| EngineError::persistence("audit log lock poisoned"))?;
        Ok(records.clone())
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, records: &[AuditRecord]) -> EngineResult<()> {
        let mut log = self
            .records
            .write()
            .map_err(|_| EngineError::AuditWriteFailure {
                message: "audit log lock poisoned".to_string(),
            })?;
        log.extend_from_slice(records);
        Ok(())
    }

    fn history(&self, subject: &AuditSubject) -> EngineResult<Vec<AuditRecord>> {
        let log = self
            .records
            .read()
            .map_err(|_| EngineError::persistence("audit log lock poisoned"))?;
        Ok(log.iter().filter(|r| &r.subject == subject).cloned().collect())
    }

    fn count(&self) -> EngineResult<usize> {
        let log = self
            .records
            .read()
            .map_err(|_| EngineError::persistence("audit log lock poisoned"))?;
        Ok(log.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditAction;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(subject: AuditSubject, action: AuditAction) -> AuditRecord {
        AuditRecord {
            id: Uuid::new_v4(),
            subject,
            action,
            old_value: None,
            new_value: Some(serde_json::json!({ "value": "1000" })),
            actor: "admin".to_string(),
            reason: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_history_filters_by_subject() {
        let log = MemoryAuditLog::new();
        let a = AuditSubject::Setting(Uuid::new_v4());
        let b = AuditSubject::Rule(Uuid::new_v4());

        log.append(&[record(a, AuditAction::Created), record(b, AuditAction::Created)])
            .unwrap();
        log.append(&[record(a, AuditAction::Updated)]).unwrap();

        let history = log.history(&a).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Created);
        assert_eq!(history[1].action, AuditAction::Updated);
        assert_eq!(log.count().unwrap(), 3);
    }

    #[test]
    fn test_empty_log() {
        let log = MemoryAuditLog::new();
        assert_eq!(log.count().unwrap(), 0);
        assert!(log.records().unwrap().is_empty());
    }
}
