//! In-memory implementation of the storage traits.
//!
//! Committed state lives behind an `RwLock` so readers never wait on an open
//! transaction. Writers are serialized by a separate mutex; each transaction
//! stages its changes on a private copy of the state and publishes it in one
//! swap at commit, after the audit sink accepted the queued records.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{RuleStore, SettingStore, StoreTransaction, TransactionalStore};
use crate::audit::AuditSink;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditRecord, Category, PricingRule, Setting, SettingScope};

#[derive(Debug, Clone, Default)]
struct StoreState {
    settings: HashMap<Uuid, Setting>,
    categories: HashMap<Uuid, Category>,
    rules: HashMap<Uuid, PricingRule>,
}

/// A process-local store for settings, categories and rules.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pricing_engine::audit::MemoryAuditLog;
/// use pricing_engine::store::{MemoryStore, SettingStore};
///
/// let store = MemoryStore::new(Arc::new(MemoryAuditLog::new()));
/// assert!(store.all_settings().unwrap().is_empty());
/// ```
pub struct MemoryStore {
    state: RwLock<StoreState>,
    writer: Mutex<()>,
    audit: Arc<dyn AuditSink>,
}

impl MemoryStore {
    /// Creates an empty store whose transactions write audit records to `audit`.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            writer: Mutex::new(()),
            audit,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> EngineResult<T> {
        let state = self
            .state
            .read()
            .map_err(|_| EngineError::persistence("store lock poisoned"))?;
        Ok(f(&state))
    }
}

impl SettingStore for MemoryStore {
    fn effective_settings(
        &self,
        keys: &[String],
        at: DateTime<Utc>,
    ) -> EngineResult<Vec<Setting>> {
        self.read(|state| {
            let mut settings: Vec<Setting> = state
                .settings
                .values()
                .filter(|s| keys.contains(&s.key) && s.is_effective_at(at))
                .cloned()
                .collect();
            settings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            settings
        })
    }

    fn find_setting(&self, id: Uuid) -> EngineResult<Option<Setting>> {
        self.read(|state| state.settings.get(&id).cloned())
    }

    fn all_settings(&self) -> EngineResult<Vec<Setting>> {
        self.read(|state| {
            let mut settings: Vec<Setting> = state.settings.values().cloned().collect();
            settings.sort_by(|a, b| a.key.cmp(&b.key).then(a.created_at.cmp(&b.created_at)));
            settings
        })
    }

    fn find_category(&self, name: &str) -> EngineResult<Option<Category>> {
        self.read(|state| state.categories.values().find(|c| c.name == name).cloned())
    }

    fn categories(&self) -> EngineResult<Vec<Category>> {
        self.read(|state| {
            let mut categories: Vec<Category> = state.categories.values().cloned().collect();
            categories.sort_by(|a, b| a.name.cmp(&b.name));
            categories
        })
    }

    fn keys_in_category(&self, category_id: Uuid) -> EngineResult<Vec<String>> {
        self.read(|state| {
            state
                .settings
                .values()
                .filter(|s| s.category_id == Some(category_id))
                .map(|s| s.key.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }
}

impl RuleStore for MemoryStore {
    fn live_rules(&self, at: DateTime<Utc>) -> EngineResult<Vec<PricingRule>> {
        self.read(|state| {
            let mut rules: Vec<PricingRule> = state
                .rules
                .values()
                .filter(|r| r.is_live_at(at))
                .cloned()
                .collect();
            rules.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.id.cmp(&b.id))
            });
            rules
        })
    }

    fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>> {
        self.read(|state| state.rules.get(&id).cloned())
    }

    fn all_rules(&self) -> EngineResult<Vec<PricingRule>> {
        self.read(|state| {
            let mut rules: Vec<PricingRule> = state.rules.values().cloned().collect();
            rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.name.cmp(&b.name)));
            rules
        })
    }
}

impl TransactionalStore for MemoryStore {
    fn begin(&self) -> EngineResult<Box<dyn StoreTransaction + '_>> {
        // The writer mutex guards no data, so a poisoned lock is still usable.
        let writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let staged = self.read(StoreState::clone)?;

        Ok(Box::new(MemoryTransaction {
            _writer: writer,
            state: &self.state,
            audit: self.audit.as_ref(),
            staged,
            pending_audit: Vec::new(),
            dirty: false,
            committed: false,
        }))
    }

    fn audit_sink(&self) -> Arc<dyn AuditSink> {
        self.audit.clone()
    }
}

/// An open write transaction on a [`MemoryStore`].
///
/// Dropping the transaction without calling `commit` rolls it back.
pub struct MemoryTransaction<'a> {
    _writer: MutexGuard<'a, ()>,
    state: &'a RwLock<StoreState>,
    audit: &'a dyn AuditSink,
    staged: StoreState,
    pending_audit: Vec<AuditRecord>,
    dirty: bool,
    committed: bool,
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn find_exact_setting(
        &self,
        key: &str,
        scope: &SettingScope,
    ) -> EngineResult<Option<Setting>> {
        Ok(self
            .staged
            .settings
            .values()
            .find(|s| s.active && s.key == key && &s.scope == scope)
            .cloned())
    }

    fn find_setting(&self, id: Uuid) -> EngineResult<Option<Setting>> {
        Ok(self.staged.settings.get(&id).cloned())
    }

    fn put_setting(&mut self, setting: Setting) -> EngineResult<()> {
        self.dirty = true;
        self.staged.settings.insert(setting.id, setting);
        Ok(())
    }

    fn remove_setting(&mut self, id: Uuid) -> EngineResult<Option<Setting>> {
        let removed = self.staged.settings.remove(&id);
        self.dirty |= removed.is_some();
        Ok(removed)
    }

    fn find_category(&self, id: Uuid) -> EngineResult<Option<Category>> {
        Ok(self.staged.categories.get(&id).cloned())
    }

    fn find_category_by_name(&self, name: &str) -> EngineResult<Option<Category>> {
        Ok(self
            .staged
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    fn put_category(&mut self, category: Category) -> EngineResult<()> {
        // Categories are grouping metadata and carry no audit requirement.
        self.staged.categories.insert(category.id, category);
        Ok(())
    }

    fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>> {
        Ok(self.staged.rules.get(&id).cloned())
    }

    fn put_rule(&mut self, rule: PricingRule) -> EngineResult<()> {
        self.dirty = true;
        self.staged.rules.insert(rule.id, rule);
        Ok(())
    }

    fn remove_rule(&mut self, id: Uuid) -> EngineResult<Option<PricingRule>> {
        let removed = self.staged.rules.remove(&id);
        self.dirty |= removed.is_some();
        Ok(removed)
    }

    fn record_audit(&mut self, record: AuditRecord) -> EngineResult<()> {
        self.pending_audit.push(record);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> EngineResult<()> {
        if self.dirty && self.pending_audit.is_empty() {
            return Err(EngineError::AuditWriteFailure {
                message: "mutation staged without an audit record".to_string(),
            });
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| EngineError::persistence("store lock poisoned"))?;

        if !self.pending_audit.is_empty() {
            self.audit
                .append(&self.pending_audit)
                .map_err(|e| match e {
                    EngineError::AuditWriteFailure { .. } => e,
                    other => EngineError::AuditWriteFailure {
                        message: other.to_string(),
                    },
                })?;
        }

        *state = std::mem::take(&mut self.staged);
        self.committed = true;
        debug!(
            audit_records = self.pending_audit.len(),
            "Transaction committed"
        );
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && (self.dirty || !self.pending_audit.is_empty()) {
            warn!(
                discarded_audit_records = self.pending_audit.len(),
                "Transaction rolled back"
            );
        }
    }
}
