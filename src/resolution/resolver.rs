//! The scope resolver.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::cache::ResolutionCache;
use super::specificity::{RankedCandidate, SpecificityWeights, rank_candidates, select_best};
use crate::error::{EngineError, EngineResult};
use crate::models::{ScopeRequest, Setting, SettingValue};
use crate::store::SettingStore;

/// Resolves a setting key to the single most applicable value for a scope.
///
/// Resolution is a read: it never mutates the store, and "nothing matched"
/// is `Ok(None)`, not an error. Only storage failures are errors.
pub struct ScopeResolver {
    store: Arc<dyn SettingStore>,
    weights: SpecificityWeights,
    cache: Option<ResolutionCache>,
}

impl ScopeResolver {
    /// Creates an uncached resolver.
    pub fn new(store: Arc<dyn SettingStore>, weights: SpecificityWeights) -> Self {
        Self {
            store,
            weights,
            cache: None,
        }
    }

    /// Enables the resolution cache with the given TTL.
    pub fn with_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(ResolutionCache::new(ttl));
        self
    }

    /// Resolves `key` for `scope` at the current instant.
    ///
    /// Served from the cache when one is configured.
    pub fn resolve(&self, key: &str, scope: &ScopeRequest) -> EngineResult<Option<SettingValue>> {
        let Some(cache) = &self.cache else {
            return self.resolve_at(key, scope, Utc::now());
        };

        let dimensions = scope.dimensions();
        if let Some(hit) = cache.get(key, &dimensions) {
            debug!(key, "Resolution cache hit");
            return Ok(hit);
        }

        let generation = cache.generation(key);
        let value = self.resolve_at(key, scope, Utc::now())?;
        if !cache.insert(key, dimensions, value.clone(), generation) {
            debug!(key, "Discarded resolution invalidated during read");
        }
        Ok(value)
    }

    /// Resolves `key` for `scope` as of `at`, bypassing the cache.
    pub fn resolve_at(
        &self,
        key: &str,
        scope: &ScopeRequest,
        at: DateTime<Utc>,
    ) -> EngineResult<Option<SettingValue>> {
        Ok(self
            .resolve_setting_at(key, scope, at)?
            .map(|setting| setting.value))
    }

    /// Returns the winning setting itself rather than just its value.
    pub fn resolve_setting_at(
        &self,
        key: &str,
        scope: &ScopeRequest,
        at: DateTime<Utc>,
    ) -> EngineResult<Option<Setting>> {
        let candidates = self.store.effective_settings(&[key.to_string()], at)?;
        let best = select_best(&candidates, scope, &self.weights).cloned();

        match &best {
            Some(setting) => debug!(
                key,
                setting_id = %setting.id,
                candidates = candidates.len(),
                "Resolved setting"
            ),
            None => debug!(key, candidates = candidates.len(), "No setting matched scope"),
        }
        Ok(best)
    }

    /// Resolves several keys from one store snapshot.
    ///
    /// Keys that resolve to nothing are absent from the returned map.
    pub fn resolve_many(
        &self,
        keys: &[String],
        scope: &ScopeRequest,
    ) -> EngineResult<HashMap<String, SettingValue>> {
        self.resolve_many_at(keys, scope, Utc::now())
    }

    /// Resolves several keys from one store snapshot as of `at`.
    pub fn resolve_many_at(
        &self,
        keys: &[String],
        scope: &ScopeRequest,
        at: DateTime<Utc>,
    ) -> EngineResult<HashMap<String, SettingValue>> {
        let snapshot = self.store.effective_settings(keys, at)?;

        let mut by_key: HashMap<&str, Vec<Setting>> = HashMap::new();
        for setting in &snapshot {
            by_key
                .entry(setting.key.as_str())
                .or_default()
                .push(setting.clone());
        }

        let mut resolved = HashMap::new();
        for (key, candidates) in by_key {
            if let Some(best) = select_best(&candidates, scope, &self.weights) {
                resolved.insert(key.to_string(), best.value.clone());
            }
        }
        debug!(
            requested = keys.len(),
            resolved = resolved.len(),
            "Resolved settings batch"
        );
        Ok(resolved)
    }

    /// Resolves every key filed under the named category.
    ///
    /// Fails with `CategoryNotFound` if the category does not exist.
    pub fn resolve_category(
        &self,
        category: &str,
        scope: &ScopeRequest,
    ) -> EngineResult<HashMap<String, SettingValue>> {
        let found = self
            .store
            .find_category(category)?
            .ok_or_else(|| EngineError::CategoryNotFound {
                name: category.to_string(),
            })?;
        let keys = self.store.keys_in_category(found.id)?;
        self.resolve_many(&keys, scope)
    }

    /// Returns the ranked candidates for `key` and `scope`, best first.
    pub fn explain(&self, key: &str, scope: &ScopeRequest) -> EngineResult<Vec<RankedCandidate>> {
        let candidates = self.store.effective_settings(&[key.to_string()], Utc::now())?;
        Ok(rank_candidates(&candidates, scope, &self.weights))
    }

    /// Drops cached results for `key`. Called after every committed mutation.
    pub fn invalidate(&self, key: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate_key(key);
        }
    }

    /// Drops all cached results.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
