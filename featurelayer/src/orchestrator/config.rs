//! Runtime configuration for the fetch orchestrator.

use std::time::Duration;

use crate::bbox::{BboxError, DEFAULT_PRECISION, MAX_PRECISION};
use crate::cache::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_STALE_TIME};
use crate::debounce::{DebounceConfig, DEFAULT_DEBOUNCE};
use crate::provider::DEFAULT_LAYER;

/// Default capacity of the query channel.
pub const DEFAULT_QUERY_CHANNEL_CAPACITY: usize = 64;

/// Configuration for [`FeatureFetchService`](super::FeatureFetchService)
/// and [`FetchStateMachine`](super::FetchStateMachine).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Initial feature layer (WFS type name).
    pub layer: String,

    /// Decimal places used to quantize bounding boxes.
    pub precision: u32,

    /// Quiet period before a viewport settles.
    pub debounce: Duration,

    /// Freshness window of cached collections.
    pub stale_time: Duration,

    /// Maximum number of cached viewports.
    pub max_entries: u64,

    /// Capacity of the consumer query channel.
    pub channel_capacity: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            layer: DEFAULT_LAYER.to_string(),
            precision: DEFAULT_PRECISION,
            debounce: DEFAULT_DEBOUNCE,
            stale_time: DEFAULT_STALE_TIME,
            max_entries: DEFAULT_MAX_ENTRIES,
            channel_capacity: DEFAULT_QUERY_CHANNEL_CAPACITY,
        }
    }
}

impl FetchConfig {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            ..Self::default()
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Cache settings derived from this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_stale_time(self.stale_time)
            .with_max_entries(self.max_entries)
    }

    /// Debounce settings derived from this configuration.
    pub fn debounce_config(&self) -> DebounceConfig {
        DebounceConfig::new(self.debounce)
    }

    /// Reject settings the quantizer cannot honour.
    pub fn validate(&self) -> Result<(), BboxError> {
        if self.precision > MAX_PRECISION {
            return Err(BboxError::PrecisionTooLarge(self.precision));
        }
        Ok(())
    }
}
