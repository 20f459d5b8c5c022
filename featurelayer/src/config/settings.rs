//! Configuration structs for `config.ini`.

use std::path::PathBuf;
use std::time::Duration;

use super::defaults::*;
use crate::orchestrator::FetchConfig;

/// `[service]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    /// WFS endpoint.
    pub url: String,
    /// Feature type name.
    pub layer: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Optional `count` limit per response.
    pub max_features: Option<u32>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVICE_URL.to_string(),
            layer: DEFAULT_SERVICE_LAYER.to_string(),
            timeout: DEFAULT_SERVICE_TIMEOUT_SECS,
            max_features: None,
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub stale_time_secs: u64,
    pub max_entries: u64,
    pub precision: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time_secs: DEFAULT_STALE_TIME_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            precision: DEFAULT_CACHE_PRECISION,
        }
    }
}

/// `[viewport]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportSettings {
    pub debounce_ms: u64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingSettings {
    /// Log file path; defaults to `~/.featurelayer/featurelayer.log`.
    pub file: Option<PathBuf>,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub service: ServiceSettings,
    pub cache: CacheSettings,
    pub viewport: ViewportSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Runtime orchestrator settings.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig::new(self.service.layer.clone())
            .with_precision(self.cache.precision)
            .with_debounce(Duration::from_millis(self.viewport.debounce_ms))
            .with_stale_time(Duration::from_secs(self.cache.stale_time_secs))
            .with_max_entries(self.cache.max_entries)
    }

    /// Every setting as `(section.key, value)`, in file order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("service.url", self.service.url.clone()),
            ("service.layer", self.service.layer.clone()),
            ("service.timeout", self.service.timeout.to_string()),
            (
                "service.max_features",
                self.service
                    .max_features
                    .map(|n| n.to_string())
                    .unwrap_or_default(),
            ),
            ("cache.stale_time_secs", self.cache.stale_time_secs.to_string()),
            ("cache.max_entries", self.cache.max_entries.to_string()),
            ("cache.precision", self.cache.precision.to_string()),
            ("viewport.debounce_ms", self.viewport.debounce_ms.to_string()),
            (
                "logging.file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            ),
        ]
    }
}
