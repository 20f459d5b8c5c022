//! Default configuration values.

use crate::bbox::DEFAULT_PRECISION;
use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_STALE_TIME};
use crate::debounce::DEFAULT_DEBOUNCE;
use crate::provider::{DEFAULT_LAYER, DEFAULT_TIMEOUT_SECS, DEFAULT_WFS_URL};

pub const DEFAULT_SERVICE_URL: &str = DEFAULT_WFS_URL;
pub const DEFAULT_SERVICE_LAYER: &str = DEFAULT_LAYER;
pub const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = DEFAULT_TIMEOUT_SECS;
pub const DEFAULT_STALE_TIME_SECS: u64 = DEFAULT_STALE_TIME.as_secs();
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = DEFAULT_MAX_ENTRIES;
pub const DEFAULT_CACHE_PRECISION: u32 = DEFAULT_PRECISION;
pub const DEFAULT_DEBOUNCE_MS: u64 = DEFAULT_DEBOUNCE.as_millis() as u64;
