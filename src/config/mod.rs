//! Configuration loading for the pricing engine.
//!
//! This module loads engine tuning (specificity weights, default tax mode,
//! cache TTL) and seed data (categories, settings and pricing rules) from
//! YAML files.
//!
//! # Example
//!
//! ```no_run
//! use pricing_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Cache TTL: {:?}", config.engine().cache_ttl());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineConfig, RulesConfig, SeedCategory, SeedSetting, SettingsConfig};
