//! Freshness-aware request cache.
//!
//! Maps a [`QuantizedKey`] to the most recent successful feature collection
//! for that key together with the monotonic instant it was fetched.
//!
//! # Freshness
//!
//! An entry is fresh for `stale_time` after it was fetched. Fresh entries are
//! served with no network activity. A stale entry is never dropped because of
//! its age; it stays visible while a refetch for its key runs and is replaced
//! atomically when that refetch succeeds.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use featurelayer::bbox::{quantize, BoundingBox};
//! use featurelayer::cache::{CacheConfig, CacheLookup, RequestCache};
//! use featurelayer::feature::FeatureCollection;
//!
//! let cache = RequestCache::new(CacheConfig::default());
//! let key = quantize("buildings", &BoundingBox::new(11.5, 48.1, 11.6, 48.2), 3).unwrap();
//!
//! cache.put(key.clone(), Arc::new(FeatureCollection::default()));
//! assert!(matches!(cache.lookup(&key, tokio::time::Instant::now()), CacheLookup::Fresh(_)));
//! ```

mod memory;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::bbox::QuantizedKey;
use crate::feature::FeatureCollection;

pub use memory::RequestCache;

/// Default freshness window (5 minutes).
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of cached viewports.
pub const DEFAULT_MAX_ENTRIES: u64 = 50;

/// Request cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long an entry is served without refetching.
    pub stale_time: Duration,

    /// Upper bound on the number of entries; least recently used go first.
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    /// Set the freshness window.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Set the entry bound.
    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }
}

/// A successful fetch result for one key.
///
/// Entries are immutable; a refetch produces a new entry that replaces the
/// old one.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: QuantizedKey,
    pub features: Arc<FeatureCollection>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    /// Time elapsed since the entry was fetched.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.fetched_at)
    }
}

/// Outcome of a cache lookup at a given instant.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Entry exists and is inside the freshness window.
    Fresh(Arc<CacheEntry>),
    /// Entry exists but must be refetched; it stays displayable meanwhile.
    Stale(Arc<CacheEntry>),
    /// No entry for the key.
    Miss,
}

impl CacheLookup {
    /// The entry regardless of freshness.
    pub fn entry(&self) -> Option<&Arc<CacheEntry>> {
        match self {
            CacheLookup::Fresh(entry) | CacheLookup::Stale(entry) => Some(entry),
            CacheLookup::Miss => None,
        }
    }

    /// Check whether the lookup can be served without a request.
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheLookup::Fresh(_))
    }
}
