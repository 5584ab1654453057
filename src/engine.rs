//! The pricing engine facade.
//!
//! [`PricingEngine`] wires the resolver, rule engine, tax calculator and
//! audit logger over injected storage, and exposes the operations consumed
//! by lease, refill, swap, transfer and registration workflows.
//!
//! Reads run against the committed snapshot and need no coordination.
//! Every mutation runs in one store transaction that also carries its audit
//! record; the resolution cache is invalidated for the mutated key after the
//! commit, before the call returns.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::audit::{AuditLogger, MemoryAuditLog};
use crate::config::{ConfigLoader, EngineConfig, RulesConfig, SettingsConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditAction, AuditRecord, AuditSubject, BulkItem, BulkPriceResult, Category, OperationType,
    PriceQuote, PricingRule, RuleDraft, ScopeRequest, SetSettingOptions, Setting, SettingStatistics,
    SettingValue, StatisticsFilter, compute_statistics,
};
use crate::pricing::{
    PricingRuleEngine, TaxMode, calculate_bulk_price, compute_tax, get_base_price, validate_rule,
};
use crate::resolution::{RankedCandidate, ScopeResolver};
use crate::store::{MemoryStore, RuleStore, SettingStore, TransactionalStore};

/// The setting key holding the tax rate, in percent.
pub const TAX_RATE_KEY: &str = "tax.rate";

/// The setting key holding the tax mode (`inclusive` or `exclusive`).
pub const TAX_MODE_KEY: &str = "tax.mode";

/// What [`PricingEngine::seed`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Categories created (existing names are skipped).
    pub categories: usize,
    /// Settings created or updated.
    pub settings: usize,
    /// Rules created or updated.
    pub rules: usize,
}

/// Hierarchical configuration and dynamic pricing.
///
/// # Example
///
/// ```
/// use pricing_engine::engine::PricingEngine;
/// use pricing_engine::config::EngineConfig;
/// use pricing_engine::models::{OperationType, ScopeRequest, SetSettingOptions, SettingValue};
/// use rust_decimal::Decimal;
///
/// let engine = PricingEngine::in_memory(EngineConfig::default())?;
/// engine.set_setting(
///     "refill.base_price",
///     SettingValue::from(Decimal::from(100)),
///     SetSettingOptions::by("admin"),
/// )?;
///
/// let price = engine.get_price(OperationType::Refill, &ScopeRequest::new().with_quantity(2))?;
/// assert_eq!(price, Decimal::from(200));
/// # Ok::<(), pricing_engine::error::EngineError>(())
/// ```
pub struct PricingEngine {
    settings: Arc<dyn SettingStore>,
    rules: Arc<dyn RuleStore>,
    transactions: Arc<dyn TransactionalStore>,
    audit: AuditLogger,
    resolver: ScopeResolver,
    rule_engine: PricingRuleEngine,
    config: EngineConfig,
}

impl PricingEngine {
    /// Creates an engine over separately injected stores.
    ///
    /// Audit history is read from the sink `transactions` commits to.
    pub fn new(
        settings: Arc<dyn SettingStore>,
        rules: Arc<dyn RuleStore>,
        transactions: Arc<dyn TransactionalStore>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        config.specificity.validate()?;

        let mut resolver = ScopeResolver::new(settings.clone(), config.specificity);
        if let Some(ttl) = config.cache_ttl() {
            resolver = resolver.with_cache(ttl);
        }

        Ok(Self {
            rule_engine: PricingRuleEngine::new(rules.clone()),
            audit: AuditLogger::new(transactions.audit_sink()),
            settings,
            rules,
            transactions,
            resolver,
            config,
        })
    }

    /// Creates an engine over one store implementing all three storage traits.
    pub fn with_store<S>(store: Arc<S>, config: EngineConfig) -> EngineResult<Self>
    where
        S: SettingStore + RuleStore + TransactionalStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Creates an engine over a fresh [`MemoryStore`] and [`MemoryAuditLog`].
    pub fn in_memory(config: EngineConfig) -> EngineResult<Self> {
        let store = Arc::new(MemoryStore::new(Arc::new(MemoryAuditLog::new())));
        Self::with_store(store, config)
    }

    /// Loads a configuration directory into a fresh in-memory engine and seeds it.
    pub fn from_config_dir<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let (engine_config, settings, rules) = ConfigLoader::load(path)?.into_parts();
        let engine = Self::in_memory(engine_config)?;
        engine.seed(&settings, &rules)?;
        Ok(engine)
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves one key for a scope. Absence is `Ok(None)`.
    pub fn get_setting(&self, key: &str, scope: &ScopeRequest) -> EngineResult<Option<SettingValue>> {
        self.resolver.resolve(key, scope)
    }

    /// Resolves several keys from one snapshot. Unresolved keys are absent
    /// from the map.
    pub fn get_settings(
        &self,
        keys: &[String],
        scope: &ScopeRequest,
    ) -> EngineResult<HashMap<String, SettingValue>> {
        self.resolver.resolve_many(keys, scope)
    }

    /// Resolves every key in a category from one snapshot.
    pub fn get_settings_by_category(
        &self,
        category: &str,
        scope: &ScopeRequest,
    ) -> EngineResult<HashMap<String, SettingValue>> {
        self.resolver.resolve_category(category, scope)
    }

    /// Returns the ranked candidates for a key, best first.
    pub fn explain(&self, key: &str, scope: &ScopeRequest) -> EngineResult<Vec<RankedCandidate>> {
        self.resolver.explain(key, scope)
    }

    /// Creates or updates the setting at `key` and the exact scope in `options`.
    ///
    /// An existing active setting with the same key and scope is updated in
    /// place (version incremented); otherwise a new setting is created at
    /// version 1. Either way one audit record is written in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for an empty key, a blank actor, a value that
    ///   disagrees with `options.data_type`, or an expiry not after the
    ///   effective date
    /// - `CategoryNotFound` for an unknown `options.category_id`
    /// - `VersionConflict` when `options.expected_version` is stale
    /// - `AuditWriteFailure` when the audit record cannot be written; the
    ///   setting is not changed
    pub fn set_setting(
        &self,
        key: &str,
        value: SettingValue,
        options: SetSettingOptions,
    ) -> EngineResult<Setting> {
        if key.trim().is_empty() {
            return Err(EngineError::validation("key", "setting key must not be empty"));
        }
        let data_type = value.data_type();
        if let Some(declared) = options.data_type {
            if declared != data_type {
                return Err(EngineError::validation(
                    key,
                    format!("declared {:?} but value is {:?}", declared, data_type),
                ));
            }
        }

        let now = Utc::now();
        let mut tx = self.transactions.begin()?;

        if let Some(category_id) = options.category_id {
            tx.find_category(category_id)?
                .ok_or_else(|| EngineError::CategoryNotFound {
                    name: category_id.to_string(),
                })?;
        }

        let existing = tx.find_exact_setting(key, &options.scope)?;
        if let Some(expected) = options.expected_version {
            let actual = existing.as_ref().map_or(0, |s| s.version);
            if actual != expected {
                return Err(EngineError::VersionConflict {
                    key: key.to_string(),
                    expected,
                    actual,
                });
            }
        }

        let (setting, action) = match &existing {
            Some(old) => {
                let mut updated = old.clone();
                updated.value = value;
                updated.data_type = data_type;
                updated.category_id = options.category_id.or(old.category_id);
                updated.description = options.description.clone().or_else(|| old.description.clone());
                updated.priority = options.priority;
                updated.effective_date = options.effective_date.unwrap_or(old.effective_date);
                updated.expiry_date = options.expiry_date;
                updated.active = options.active.unwrap_or(true);
                updated.version += 1;
                updated.updated_by = options.actor.clone();
                updated.updated_at = now;
                (updated, AuditAction::Updated)
            }
            None => (
                Setting {
                    id: Uuid::new_v4(),
                    key: key.to_string(),
                    value,
                    data_type,
                    category_id: options.category_id,
                    description: options.description.clone(),
                    scope: options.scope.clone(),
                    priority: options.priority,
                    effective_date: options.effective_date.unwrap_or(now),
                    expiry_date: options.expiry_date,
                    active: options.active.unwrap_or(true),
                    version: 1,
                    created_by: options.actor.clone(),
                    updated_by: options.actor.clone(),
                    created_at: now,
                    updated_at: now,
                },
                AuditAction::Created,
            ),
        };

        if let Some(expiry) = setting.expiry_date {
            if expiry <= setting.effective_date {
                return Err(EngineError::validation(
                    "expiry_date",
                    format!("must be after the effective date {}", setting.effective_date),
                ));
            }
        }

        tx.put_setting(setting.clone())?;
        self.audit.setting_change(
            &mut *tx,
            action,
            existing.as_ref(),
            Some(&setting),
            &options.actor,
            options.reason.as_deref(),
        )?;
        tx.commit()?;
        self.resolver.invalidate(key);

        info!(
            key,
            setting_id = %setting.id,
            scope = %setting.scope.level(),
            version = setting.version,
            actor = %options.actor,
            action = ?action,
            "setting written"
        );
        Ok(setting)
    }

    /// Deletes a setting by id, writing a `deleted` audit record.
    pub fn delete_setting(&self, id: Uuid, actor: &str, reason: Option<&str>) -> EngineResult<()> {
        let mut tx = self.transactions.begin()?;
        let removed = tx
            .remove_setting(id)?
            .ok_or(EngineError::SettingNotFound { id })?;
        self.audit
            .setting_change(&mut *tx, AuditAction::Deleted, Some(&removed), None, actor, reason)?;
        tx.commit()?;
        self.resolver.invalidate(&removed.key);

        info!(key = %removed.key, setting_id = %id, actor, "setting deleted");
        Ok(())
    }

    /// Returns a stored setting by id.
    pub fn find_setting(&self, id: Uuid) -> EngineResult<Setting> {
        self.settings
            .find_setting(id)?
            .ok_or(EngineError::SettingNotFound { id })
    }

    /// Creates a category. Names are unique.
    pub fn create_category(&self, name: &str, description: Option<&str>) -> EngineResult<Category> {
        if name.trim().is_empty() {
            return Err(EngineError::validation("name", "category name must not be empty"));
        }

        let mut tx = self.transactions.begin()?;
        if tx.find_category_by_name(name)?.is_some() {
            return Err(EngineError::validation(
                "name",
                format!("category '{}' already exists", name),
            ));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
        };
        tx.put_category(category.clone())?;
        tx.commit()?;

        info!(category = %category.name, category_id = %category.id, "category created");
        Ok(category)
    }

    /// Lists all categories.
    pub fn categories(&self) -> EngineResult<Vec<Category>> {
        self.settings.categories()
    }

    /// Validates and stores a new rule.
    pub fn create_rule(&self, draft: RuleDraft, actor: &str, reason: Option<&str>) -> EngineResult<PricingRule> {
        validate_rule(&draft)?;
        let rule = PricingRule::from_draft(draft, actor, Utc::now());

        let mut tx = self.transactions.begin()?;
        tx.put_rule(rule.clone())?;
        self.audit
            .rule_change(&mut *tx, AuditAction::Created, None, Some(&rule), actor, reason)?;
        tx.commit()?;

        info!(rule_id = %rule.id, rule = %rule.name, rule_type = %rule.rule_type, actor, "rule created");
        Ok(rule)
    }

    /// Validates and replaces the authoring fields of an existing rule.
    pub fn update_rule(
        &self,
        id: Uuid,
        draft: RuleDraft,
        actor: &str,
        reason: Option<&str>,
    ) -> EngineResult<PricingRule> {
        validate_rule(&draft)?;

        let mut tx = self.transactions.begin()?;
        let old = tx.find_rule(id)?.ok_or(EngineError::RuleNotFound { id })?;
        let mut rule = old.clone();
        rule.revise(draft, actor, Utc::now());

        tx.put_rule(rule.clone())?;
        self.audit
            .rule_change(&mut *tx, AuditAction::Updated, Some(&old), Some(&rule), actor, reason)?;
        tx.commit()?;

        info!(rule_id = %id, version = rule.version, actor, "rule updated");
        Ok(rule)
    }

    /// Deletes a rule, writing a `deleted` audit record.
    pub fn delete_rule(&self, id: Uuid, actor: &str, reason: Option<&str>) -> EngineResult<()> {
        let mut tx = self.transactions.begin()?;
        let removed = tx.remove_rule(id)?.ok_or(EngineError::RuleNotFound { id })?;
        self.audit
            .rule_change(&mut *tx, AuditAction::Deleted, Some(&removed), None, actor, reason)?;
        tx.commit()?;

        info!(rule_id = %id, rule = %removed.name, actor, "rule deleted");
        Ok(())
    }

    /// Lists every stored rule in evaluation order.
    pub fn list_rules(&self) -> EngineResult<Vec<PricingRule>> {
        let mut rules = self.rules.all_rules()?;
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(rules)
    }

    /// Returns the pre-tax price of an operation after pricing rules.
    ///
    /// Fails with `ConfigurationMissing` when no base price resolves.
    pub fn get_price(&self, operation: OperationType, scope: &ScopeRequest) -> EngineResult<Decimal> {
        let lookup = get_base_price(operation, scope, &self.resolver)?;
        let evaluation = self.rule_engine.apply_rules(lookup.base_price, operation, scope)?;
        Ok(evaluation.adjusted_price)
    }

    /// Prices an operation end to end: base price, rules, then tax.
    ///
    /// The tax rate resolves from `tax.rate` (absent means untaxed) and the
    /// mode from `tax.mode`, falling back to the configured default.
    pub fn get_quote(&self, operation: OperationType, scope: &ScopeRequest) -> EngineResult<PriceQuote> {
        let lookup = get_base_price(operation, scope, &self.resolver)?;
        let evaluation = self.rule_engine.apply_rules(lookup.base_price, operation, scope)?;

        let tax_scope = scope.clone().with_operation(operation);
        let tax_rate = match self.resolver.resolve(TAX_RATE_KEY, &tax_scope)? {
            Some(value) => value.as_decimal().ok_or_else(|| {
                EngineError::validation(TAX_RATE_KEY, "tax rate must be a number")
            })?,
            None => Decimal::ZERO,
        };
        let tax_mode = match self.resolver.resolve(TAX_MODE_KEY, &tax_scope)? {
            Some(value) => {
                let text = value.as_str().ok_or_else(|| {
                    EngineError::validation(TAX_MODE_KEY, "tax mode must be a string")
                })?;
                TaxMode::from_str(text)?
            }
            None => self.config.default_tax_mode,
        };
        let tax = compute_tax(evaluation.adjusted_price, tax_rate, tax_mode)?;

        debug!(
            operation = %operation,
            base = %lookup.base_price,
            adjusted = %evaluation.adjusted_price,
            tax_rate = %tax_rate,
            tax_mode = %tax_mode,
            total = %tax.total,
            "quote calculated"
        );

        Ok(PriceQuote {
            operation_type: operation,
            price_key: lookup.price_key,
            unit_price: lookup.unit_price,
            base_price: lookup.base_price,
            adjusted_price: evaluation.adjusted_price,
            tax_rate,
            tax,
            evaluation,
        })
    }

    /// Prices a multi-line order, applying volume discounts to the aggregate.
    pub fn calculate_bulk_price(
        &self,
        operation: OperationType,
        items: &[BulkItem],
        scope: &ScopeRequest,
    ) -> EngineResult<BulkPriceResult> {
        calculate_bulk_price(operation, items, scope, &self.resolver, &self.rule_engine)
    }

    /// Aggregate counts over settings, rules and the audit log.
    pub fn get_statistics(&self, filter: &StatisticsFilter) -> EngineResult<SettingStatistics> {
        let settings = self.settings.all_settings()?;
        let rules = self.rules.all_rules()?;
        let categories = self.settings.categories()?;
        let audit_records = self.audit.count()?;
        Ok(compute_statistics(
            &settings,
            &rules,
            &categories,
            audit_records,
            filter,
            Utc::now(),
        ))
    }

    /// Returns the audit history of a setting or rule, oldest first.
    pub fn audit_history(&self, subject: &AuditSubject) -> EngineResult<Vec<AuditRecord>> {
        self.audit.history(subject)
    }

    /// Writes seed categories, settings and rules through the audited paths.
    ///
    /// Categories that already exist are skipped. Settings upsert by exact
    /// scope, and rules upsert by name, so seeding twice updates rather than
    /// duplicates.
    pub fn seed(&self, settings: &SettingsConfig, rules: &RulesConfig) -> EngineResult<SeedReport> {
        let actor = self.config.seed_actor.as_str();
        let mut report = SeedReport::default();

        for category in &settings.categories {
            if self.settings.find_category(&category.name)?.is_none() {
                self.create_category(&category.name, category.description.as_deref())?;
                report.categories += 1;
            }
        }

        for seed in &settings.settings {
            let value = SettingValue::from_json(seed.data_type, seed.value.clone())?;
            let mut options = SetSettingOptions::by(actor)
                .scope(seed.scope.clone())
                .priority(seed.priority)
                .reason("seed");
            options.data_type = Some(seed.data_type);
            options.description = seed.description.clone();
            if let Some(name) = &seed.category {
                let category = self
                    .settings
                    .find_category(name)?
                    .ok_or_else(|| EngineError::CategoryNotFound { name: name.clone() })?;
                options = options.category(category.id);
            }
            self.set_setting(&seed.key, value, options)?;
            report.settings += 1;
        }

        let existing = self.rules.all_rules()?;
        for draft in &rules.rules {
            match existing.iter().find(|r| r.name == draft.name) {
                Some(rule) => self.update_rule(rule.id, draft.clone(), actor, Some("seed"))?,
                None => self.create_rule(draft.clone(), actor, Some("seed"))?,
            };
            report.rules += 1;
        }

        // Seeding can replace many keys at once; start from a cold cache.
        self.resolver.invalidate_all();
        info!(
            categories = report.categories,
            settings = report.settings,
            rules = report.rules,
            "seed applied"
        );
        Ok(report)
    }
}
