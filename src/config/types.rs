//! Configuration types for the pricing engine.
//!
//! This module contains the strongly-typed structures deserialized from the
//! YAML files in a configuration directory.

use serde::Deserialize;
use std::time::Duration;

use crate::models::{DataType, RuleDraft, SettingScope};
use crate::pricing::TaxMode;
use crate::resolution::SpecificityWeights;

fn default_cache_ttl_seconds() -> u64 {
    30
}

fn default_seed_actor() -> String {
    "system".to_string()
}

/// Engine tuning, read from `engine.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Per-dimension specificity weights.
    #[serde(default)]
    pub specificity: SpecificityWeights,
    /// Tax mode used when no `tax.mode` setting resolves.
    #[serde(default)]
    pub default_tax_mode: TaxMode,
    /// Lifetime of cached resolutions; 0 disables the cache.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// Actor recorded on audit entries written while seeding.
    #[serde(default = "default_seed_actor")]
    pub seed_actor: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            specificity: SpecificityWeights::default(),
            default_tax_mode: TaxMode::default(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            seed_actor: default_seed_actor(),
        }
    }
}

impl EngineConfig {
    /// Returns the cache TTL, or `None` when caching is disabled.
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

/// A category to create while seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedCategory {
    /// Unique category name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A setting to write while seeding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedSetting {
    /// The setting key.
    pub key: String,
    /// The raw value; checked against `data_type` when seeded.
    pub value: serde_json::Value,
    /// The declared value type.
    pub data_type: DataType,
    /// Name of the category to file the setting under.
    #[serde(default)]
    pub category: Option<String>,
    /// Scope constraints; omitted dimensions are unconstrained.
    #[serde(default)]
    pub scope: SettingScope,
    /// Tie-break priority.
    #[serde(default)]
    pub priority: i32,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// The contents of `settings.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SettingsConfig {
    /// Categories, created before any setting.
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    /// Settings, written in file order.
    #[serde(default)]
    pub settings: Vec<SeedSetting>,
}

/// The contents of `rules.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RulesConfig {
    /// Pricing rules, created in file order.
    #[serde(default)]
    pub rules: Vec<RuleDraft>,
}
