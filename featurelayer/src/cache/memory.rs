//! In-memory request cache backed by moka.
//!
//! The orchestrator owns a single `RequestCache` for the application session
//! and passes it into the state machine; there is no global instance.
//! Eviction is least-recently-used once `max_entries` is reached.

use std::sync::Arc;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache as MokaCache;
use tokio::time::Instant;
use tracing::trace;

use super::{CacheConfig, CacheEntry, CacheLookup};
use crate::bbox::QuantizedKey;
use crate::feature::FeatureCollection;

/// Viewport-keyed cache of feature collections.
pub struct RequestCache {
    entries: MokaCache<QuantizedKey, Arc<CacheEntry>>,
    config: CacheConfig,
}

impl RequestCache {
    /// Create a new cache.
    pub fn new(config: CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { entries, config }
    }

    /// Create a cache with a 5 minute freshness window and 50 entries.
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Retrieve the entry for `key` regardless of its freshness.
    pub fn get(&self, key: &QuantizedKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key)
    }

    /// Store `features` for `key`, timestamped now.
    pub fn put(&self, key: QuantizedKey, features: Arc<FeatureCollection>) -> Arc<CacheEntry> {
        self.put_at(key, features, Instant::now())
    }

    /// Store `features` for `key`, timestamped `fetched_at`.
    ///
    /// Any existing entry for the key is replaced, never merged.
    pub fn put_at(
        &self,
        key: QuantizedKey,
        features: Arc<FeatureCollection>,
        fetched_at: Instant,
    ) -> Arc<CacheEntry> {
        trace!(key = %key, features = features.len(), "Caching feature collection");
        let entry = Arc::new(CacheEntry {
            key: key.clone(),
            features,
            fetched_at,
        });
        self.entries.insert(key, Arc::clone(&entry));
        entry
    }

    /// Check whether `entry` is still inside the freshness window at `now`.
    pub fn is_fresh(&self, entry: &CacheEntry, now: Instant) -> bool {
        entry.age(now) < self.config.stale_time
    }

    /// Look up `key` and classify the result at `now`.
    pub fn lookup(&self, key: &QuantizedKey, now: Instant) -> CacheLookup {
        match self.get(key) {
            Some(entry) if self.is_fresh(&entry, now) => CacheLookup::Fresh(entry),
            Some(entry) => CacheLookup::Stale(entry),
            None => CacheLookup::Miss,
        }
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Number of entries after pending maintenance has run.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Check whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured freshness window.
    pub fn stale_time(&self) -> Duration {
        self.config.stale_time
    }

    /// The configured entry bound.
    pub fn max_entries(&self) -> u64 {
        self.config.max_entries
    }
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
