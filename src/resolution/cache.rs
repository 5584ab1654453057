//! TTL-bounded cache of resolved values.
//!
//! Entries are keyed by (setting key, scope dimensions). Mutations
//! invalidate every entry for the mutated key before the call returns; the
//! TTL bounds staleness from anything else, such as a setting's effective
//! window opening.
//!
//! A read that misses takes a [`Generation`] before touching the store and
//! hands it back on insert. Invalidation bumps the generation, so a read
//! that loaded its value before a commit cannot repopulate the cache after
//! that commit invalidated the key.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::models::{SettingScope, SettingValue};

/// Entry count past which inserts first evict expired entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Snapshot of a key's invalidation count, taken before a store read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<SettingValue>,
    inserted_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<(String, SettingScope), CacheEntry>,
    /// Bumped by `clear`.
    epoch: u64,
    /// Bumped by `invalidate_key`. Bounded by the number of mutated keys.
    key_generations: HashMap<String, u64>,
}

impl CacheState {
    // Both counters only grow, so their sum changes whenever either does.
    fn generation(&self, key: &str) -> Generation {
        Generation(self.epoch + self.key_generations.get(key).copied().unwrap_or(0))
    }
}

/// A cache of resolution results, including cached absence.
#[derive(Debug)]
pub struct ResolutionCache {
    ttl: Duration,
    max_entries: usize,
    state: RwLock<CacheState>,
}

impl ResolutionCache {
    /// Creates a cache whose entries live for at most `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Caps the number of entries held at once.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Returns the cached result, or `None` on a miss or expired entry.
    ///
    /// A hit may itself be `Some(None)`: the key was resolved and nothing matched.
    pub fn get(&self, key: &str, scope: &SettingScope) -> Option<Option<SettingValue>> {
        let state = self.state.read().ok()?;
        let entry = state.entries.get(&(key.to_string(), scope.clone()))?;
        if entry.inserted_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Returns the current generation of `key`. Take it before reading the store.
    pub fn generation(&self, key: &str) -> Generation {
        self.state
            .read()
            .map(|state| state.generation(key))
            .unwrap_or(Generation(u64::MAX))
    }

    /// Stores a resolution result read under `generation`.
    ///
    /// Returns false, storing nothing, if `key` was invalidated since
    /// `generation` was taken.
    pub fn insert(
        &self,
        key: &str,
        scope: SettingScope,
        value: Option<SettingValue>,
        generation: Generation,
    ) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        if state.generation(key) != generation {
            return false;
        }

        let entry_key = (key.to_string(), scope);
        if state.entries.len() >= self.max_entries && !state.entries.contains_key(&entry_key) {
            let ttl = self.ttl;
            state.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
            if state.entries.len() >= self.max_entries {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    state.entries.remove(&oldest);
                }
            }
        }

        state.entries.insert(
            entry_key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    /// Drops every entry for `key`, across all scopes, and bumps its generation.
    pub fn invalidate_key(&self, key: &str) {
        if let Ok(mut state) = self.state.write() {
            state.entries.retain(|(cached_key, _), _| cached_key != key);
            *state.key_generations.entry(key.to_string()).or_insert(0) += 1;
        }
    }

    /// Drops every entry and bumps every generation.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.entries.clear();
            state.epoch += 1;
        }
    }

    /// Removes expired entries, returning how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let Ok(mut state) = self.state.write() else {
            return 0;
        };
        let before = state.entries.len();
        let ttl = self.ttl;
        state.entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - state.entries.len()
    }

    /// Number of entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn outlet(id: i64) -> SettingScope {
        SettingScope {
            outlet_id: Some(id),
            ..SettingScope::default()
        }
    }

    fn number(n: i64) -> Option<SettingValue> {
        Some(SettingValue::Number(Decimal::from(n)))
    }

    fn put(cache: &ResolutionCache, key: &str, scope: SettingScope, value: Option<SettingValue>) {
        let generation = cache.generation(key);
        assert!(cache.insert(key, scope, value, generation));
    }

    #[test]
    fn test_hit_returns_cached_value() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        put(&cache, "lease.fee_per_kg", outlet(5), number(1200));
        assert_eq!(cache.get("lease.fee_per_kg", &outlet(5)), Some(number(1200)));
        assert_eq!(cache.get("lease.fee_per_kg", &outlet(9)), None);
    }

    #[test]
    fn test_absence_is_cached() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        put(&cache, "missing.key", SettingScope::global(), None);
        assert_eq!(cache.get("missing.key", &SettingScope::global()), Some(None));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ResolutionCache::new(Duration::ZERO);
        put(&cache, "lease.fee_per_kg", SettingScope::global(), None);
        assert_eq!(cache.get("lease.fee_per_kg", &SettingScope::global()), None);
    }

    #[test]
    fn test_invalidate_key_drops_all_scopes_for_that_key_only() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        put(&cache, "lease.fee_per_kg", outlet(5), None);
        put(&cache, "lease.fee_per_kg", outlet(9), None);
        put(&cache, "refill.base_price", outlet(5), None);

        cache.invalidate_key("lease.fee_per_kg");

        assert_eq!(cache.len(), 1);
        assert!(cache.get("refill.base_price", &outlet(5)).is_some());
    }

    #[test]
    fn test_insert_after_invalidation_is_discarded() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        let generation = cache.generation("swap.base_price");

        cache.invalidate_key("swap.base_price");

        assert!(!cache.insert("swap.base_price", SettingScope::global(), number(50), generation));
        assert_eq!(cache.get("swap.base_price", &SettingScope::global()), None);
    }

    #[test]
    fn test_invalidating_another_key_keeps_generation() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        let generation = cache.generation("swap.base_price");

        cache.invalidate_key("refill.base_price");

        assert!(cache.insert("swap.base_price", SettingScope::global(), number(50), generation));
    }

    #[test]
    fn test_insert_after_clear_is_discarded() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        cache.invalidate_key("swap.base_price");
        let generation = cache.generation("swap.base_price");

        cache.clear();

        assert!(!cache.insert("swap.base_price", SettingScope::global(), number(50), generation));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_expired_removes_stale_entries() {
        let cache = ResolutionCache::new(Duration::ZERO);
        put(&cache, "lease.fee_per_kg", outlet(5), None);
        put(&cache, "lease.fee_per_kg", outlet(9), None);
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.evict_expired(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_full_cache_evicts_before_growing() {
        let cache = ResolutionCache::new(Duration::ZERO).with_max_entries(2);
        for id in 0..10 {
            put(&cache, "lease.fee_per_kg", outlet(id), None);
        }
        assert!(cache.len() <= 2);
    }

    #[test]
    fn test_full_cache_drops_oldest_live_entry() {
        let cache = ResolutionCache::new(Duration::from_secs(60)).with_max_entries(2);
        put(&cache, "lease.fee_per_kg", outlet(1), number(1));
        put(&cache, "lease.fee_per_kg", outlet(2), number(2));
        put(&cache, "lease.fee_per_kg", outlet(3), number(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("lease.fee_per_kg", &outlet(3)), Some(number(3)));
    }

    #[test]
    fn test_clear() {
        let cache = ResolutionCache::new(Duration::from_secs(60));
        put(&cache, "a", SettingScope::global(), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
