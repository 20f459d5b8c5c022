//! INI serialization: `ConfigFile` → commented INI string.

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let max_features = config
        .service
        .max_features
        .map(|n| n.to_string())
        .unwrap_or_default();
    let log_file = config
        .logging
        .file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    format!(
        r#"[service]
; WFS endpoint serving GeoJSON building footprints
url = {}
; Feature type name (typeName parameter)
layer = {}
; Request timeout in seconds
timeout = {}
; Maximum features per response (count parameter); empty for no limit
max_features = {}

[cache]
; Seconds a cached viewport is served without refetching (default: 300)
stale_time_secs = {}
; Maximum number of cached viewports; least recently used are evicted (default: 50)
max_entries = {}
; Decimal places used to snap viewport edges (default: 3, about 100 m)
precision = {}

[viewport]
; Quiet period in milliseconds before a viewport change triggers a fetch (default: 500)
debounce_ms = {}

[logging]
; Log file path; empty for ~/.featurelayer/featurelayer.log
file = {}
"#,
        config.service.url,
        config.service.layer,
        config.service.timeout,
        max_features,
        config.cache.stale_time_secs,
        config.cache.max_entries,
        config.cache.precision,
        config.viewport.debounce_ms,
        log_file,
    )
}
