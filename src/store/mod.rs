//! Storage seams for settings, rules and their transactional mutation.
//!
//! The engine only talks to storage through these traits. Reads go through
//! [`SettingStore`] and [`RuleStore`] and are side-effect free. Writes go
//! through a [`StoreTransaction`] obtained from [`TransactionalStore::begin`]:
//! staged changes and their audit records become visible together on
//! [`StoreTransaction::commit`], and a transaction dropped without commit
//! discards both.
//!
//! [`MemoryStore`] is the in-process implementation.

mod memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::audit::AuditSink;
use crate::error::EngineResult;
use crate::models::{AuditRecord, Category, PricingRule, Setting, SettingScope};

pub use memory::{MemoryStore, MemoryTransaction};

/// Read access to settings and categories.
pub trait SettingStore: Send + Sync {
    /// Returns every setting for the given keys that is effective at `at`,
    /// read from a single consistent snapshot.
    fn effective_settings(
        &self,
        keys: &[String],
        at: DateTime<Utc>,
    ) -> EngineResult<Vec<Setting>>;

    /// Returns the setting with the given id.
    fn find_setting(&self, id: Uuid) -> EngineResult<Option<Setting>>;

    /// Returns every stored setting, effective or not.
    fn all_settings(&self) -> EngineResult<Vec<Setting>>;

    /// Returns the category with the given name.
    fn find_category(&self, name: &str) -> EngineResult<Option<Category>>;

    /// Returns every category.
    fn categories(&self) -> EngineResult<Vec<Category>>;

    /// Returns the distinct keys of the settings filed under a category.
    fn keys_in_category(&self, category_id: Uuid) -> EngineResult<Vec<String>>;
}

/// Read access to pricing rules.
pub trait RuleStore: Send + Sync {
    /// Returns the active rules whose validity window contains `at`.
    fn live_rules(&self, at: DateTime<Utc>) -> EngineResult<Vec<PricingRule>>;

    /// Returns the rule with the given id.
    fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>>;

    /// Returns every stored rule.
    fn all_rules(&self) -> EngineResult<Vec<PricingRule>>;
}

/// Opens write transactions.
pub trait TransactionalStore: Send + Sync {
    /// Begins a transaction. Writers are serialized for its lifetime.
    fn begin(&self) -> EngineResult<Box<dyn StoreTransaction + '_>>;

    /// The sink committed audit records are written to.
    fn audit_sink(&self) -> Arc<dyn AuditSink>;
}

/// A unit of atomic mutation.
///
/// Every change staged through a transaction must be accompanied by at
/// least one audit record, or `commit` fails.
pub trait StoreTransaction {
    /// Returns the active setting with exactly this key and scope.
    fn find_exact_setting(
        &self,
        key: &str,
        scope: &SettingScope,
    ) -> EngineResult<Option<Setting>>;

    /// Returns the setting with the given id, as staged.
    fn find_setting(&self, id: Uuid) -> EngineResult<Option<Setting>>;

    /// Inserts or replaces a setting by id.
    fn put_setting(&mut self, setting: Setting) -> EngineResult<()>;

    /// Removes a setting, returning it if it existed.
    fn remove_setting(&mut self, id: Uuid) -> EngineResult<Option<Setting>>;

    /// Returns the category with the given id.
    fn find_category(&self, id: Uuid) -> EngineResult<Option<Category>>;

    /// Returns the category with the given name.
    fn find_category_by_name(&self, name: &str) -> EngineResult<Option<Category>>;

    /// Inserts or replaces a category by id.
    fn put_category(&mut self, category: Category) -> EngineResult<()>;

    /// Returns the rule with the given id, as staged.
    fn find_rule(&self, id: Uuid) -> EngineResult<Option<PricingRule>>;

    /// Inserts or replaces a rule by id.
    fn put_rule(&mut self, rule: PricingRule) -> EngineResult<()>;

    /// Removes a rule, returning it if it existed.
    fn remove_rule(&mut self, id: Uuid) -> EngineResult<Option<PricingRule>>;

    /// Queues an audit record to be written at commit.
    fn record_audit(&mut self, record: AuditRecord) -> EngineResult<()>;

    /// Writes the queued audit records, then publishes the staged state.
    ///
    /// If the audit write fails nothing is published and the error is an
    /// [`AuditWriteFailure`](crate::error::EngineError::AuditWriteFailure).
    fn commit(self: Box<Self>) -> EngineResult<()>;
}
