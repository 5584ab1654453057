//! Reporting aggregates over settings, rules and the audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{Category, PricingRule, Setting};

/// Filters for [`SettingStatistics`]. Empty filters count everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatisticsFilter {
    /// Only settings in this category.
    #[serde(default)]
    pub category_id: Option<Uuid>,
    /// Only settings whose key starts with this prefix.
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Only settings scoped to this outlet (global settings excluded).
    #[serde(default)]
    pub outlet_id: Option<i64>,
}

impl StatisticsFilter {
    /// Returns true if the setting passes every filter.
    pub fn accepts(&self, setting: &Setting) -> bool {
        self.category_id.is_none_or(|id| setting.category_id == Some(id))
            && self
                .key_prefix
                .as_deref()
                .is_none_or(|prefix| setting.key.starts_with(prefix))
            && self
                .outlet_id
                .is_none_or(|outlet| setting.scope.outlet_id == Some(outlet))
    }
}

/// Aggregate counts for reporting. Not used by resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingStatistics {
    /// Settings passing the filter.
    pub total_settings: usize,
    /// Settings with the active flag set.
    pub active_settings: usize,
    /// Settings that would resolve right now.
    pub effective_settings: usize,
    /// Active settings whose window opens in the future.
    pub scheduled_settings: usize,
    /// Settings whose expiry date has passed.
    pub expired_settings: usize,
    /// Distinct keys.
    pub distinct_keys: usize,
    /// Count per scope level ("global", "outlet", "operation_type+outlet", ...).
    pub by_scope_level: BTreeMap<String, usize>,
    /// Count per category name; uncategorised settings count under "uncategorised".
    pub by_category: BTreeMap<String, usize>,
    /// All pricing rules.
    pub total_rules: usize,
    /// Rules that would be loaded right now.
    pub live_rules: usize,
    /// Entries in the audit log.
    pub audit_records: usize,
}

/// Computes statistics from a snapshot of the store.
pub fn compute_statistics(
    settings: &[Setting],
    rules: &[PricingRule],
    categories: &[Category],
    audit_records: usize,
    filter: &StatisticsFilter,
    at: DateTime<Utc>,
) -> SettingStatistics {
    let mut stats = SettingStatistics {
        total_rules: rules.len(),
        live_rules: rules.iter().filter(|r| r.is_live_at(at)).count(),
        audit_records,
        ..SettingStatistics::default()
    };

    let mut keys = std::collections::BTreeSet::new();
    for setting in settings.iter().filter(|s| filter.accepts(s)) {
        stats.total_settings += 1;
        if setting.active {
            stats.active_settings += 1;
        }
        if setting.is_effective_at(at) {
            stats.effective_settings += 1;
        }
        if setting.is_scheduled_at(at) {
            stats.scheduled_settings += 1;
        }
        if setting.is_expired_at(at) {
            stats.expired_settings += 1;
        }
        keys.insert(setting.key.as_str());

        *stats.by_scope_level.entry(setting.scope.level()).or_insert(0) += 1;

        let category = setting
            .category_id
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "uncategorised".to_string());
        *stats.by_category.entry(category).or_insert(0) += 1;
    }
    stats.distinct_keys = keys.len();

    stats
}
