//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine tuning
//! and seed data from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::pricing::validate_rule;

use super::types::{EngineConfig, RulesConfig, SettingsConfig};

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── engine.yaml    # Specificity weights, default tax mode, cache TTL
/// ├── settings.yaml  # Categories and seed settings
/// └── rules.yaml     # Seed pricing rules
/// ```
///
/// # Example
///
/// ```no_run
/// use pricing_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// println!("{} seed settings", loader.settings().settings.len());
/// # Ok::<(), pricing_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    engine: EngineConfig,
    settings: SettingsConfig,
    rules: RulesConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - Any of the three files is missing (`ConfigNotFound`)
    /// - Any file contains invalid YAML or unknown enum values (`ConfigParseError`)
    /// - The specificity weights break their ordering (`ValidationError`)
    /// - A seed rule fails authoring validation (`ValidationError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let engine = Self::load_yaml::<EngineConfig>(&path.join("engine.yaml"))?;
        engine.specificity.validate()?;

        let settings = Self::load_yaml::<SettingsConfig>(&path.join("settings.yaml"))?;

        let rules = Self::load_yaml::<RulesConfig>(&path.join("rules.yaml"))?;
        for draft in &rules.rules {
            validate_rule(draft)?;
        }

        Ok(Self {
            engine,
            settings,
            rules,
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the engine tuning.
    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    /// Returns the seed categories and settings.
    pub fn settings(&self) -> &SettingsConfig {
        &self.settings
    }

    /// Returns the seed rules.
    pub fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Splits the loader into its parts.
    pub fn into_parts(self) -> (EngineConfig, SettingsConfig, RulesConfig) {
        (self.engine, self.settings, self.rules)
    }
}
