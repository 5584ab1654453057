//! Builds audit records for setting and rule mutations.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::AuditSink;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditAction, AuditRecord, AuditSubject, PricingRule, Setting};
use crate::store::StoreTransaction;

/// Records mutations into the transaction that performs them.
///
/// The logger never writes to the sink directly: records are queued on the
/// [`StoreTransaction`] and reach the sink only when that transaction
/// commits, so a mutation and its audit record land together or not at all.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    /// Creates a logger reading history from `sink`.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Queues the audit record for a setting mutation.
    ///
    /// `old` is `None` for creations and `new` is `None` for deletions.
    pub fn setting_change(
        &self,
        tx: &mut dyn StoreTransaction,
        action: AuditAction,
        old: Option<&Setting>,
        new: Option<&Setting>,
        actor: &str,
        reason: Option<&str>,
    ) -> EngineResult<AuditRecord> {
        let id = subject_id(old.map(|s| s.id), new.map(|s| s.id))?;
        self.write(
            tx,
            AuditSubject::Setting(id),
            action,
            snapshot(old)?,
            snapshot(new)?,
            actor,
            reason,
        )
    }

    /// Queues the audit record for a rule mutation.
    pub fn rule_change(
        &self,
        tx: &mut dyn StoreTransaction,
        action: AuditAction,
        old: Option<&PricingRule>,
        new: Option<&PricingRule>,
        actor: &str,
        reason: Option<&str>,
    ) -> EngineResult<AuditRecord> {
        let id = subject_id(old.map(|r| r.id), new.map(|r| r.id))?;
        self.write(
            tx,
            AuditSubject::Rule(id),
            action,
            snapshot(old)?,
            snapshot(new)?,
            actor,
            reason,
        )
    }

    /// Returns the audit history of one subject, oldest first.
    pub fn history(&self, subject: &AuditSubject) -> EngineResult<Vec<AuditRecord>> {
        self.sink.history(subject)
    }

    /// Returns the total number of audit records.
    pub fn count(&self) -> EngineResult<usize> {
        self.sink.count()
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &self,
        tx: &mut dyn StoreTransaction,
        subject: AuditSubject,
        action: AuditAction,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
        actor: &str,
        reason: Option<&str>,
    ) -> EngineResult<AuditRecord> {
        if actor.trim().is_empty() {
            return Err(EngineError::validation(
                "actor",
                "every mutation must name an actor",
            ));
        }

        let record = AuditRecord {
            id: Uuid::new_v4(),
            subject,
            action,
            old_value,
            new_value,
            actor: actor.to_string(),
            reason: reason.map(str::to_string),
            timestamp: Utc::now(),
        };
        tx.record_audit(record.clone())?;
        Ok(record)
    }
}

fn subject_id(old: Option<Uuid>, new: Option<Uuid>) -> EngineResult<Uuid> {
    new.or(old).ok_or_else(|| EngineError::AuditWriteFailure {
        message: "audit record has neither an old nor a new value".to_string(),
    })
}

fn snapshot<T: Serialize>(value: Option<&T>) -> EngineResult<Option<serde_json::Value>> {
    value
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| EngineError::AuditWriteFailure {
            message: format!("could not snapshot value: {}", e),
        })
}
