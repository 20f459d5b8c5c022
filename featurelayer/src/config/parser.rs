//! INI parsing: `Ini` → `ConfigFile`.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::bbox::MAX_PRECISION;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [service]
    if let Some(section) = ini.section(Some("service")) {
        if let Some(v) = non_empty(section, "url") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(invalid("service", "url", v, "must start with http:// or https://"));
            }
            config.service.url = v.to_string();
        }
        if let Some(v) = non_empty(section, "layer") {
            config.service.layer = v.to_string();
        }
        if let Some(v) = non_empty(section, "timeout") {
            let timeout: u64 = parse_number(v, "service", "timeout")?;
            if timeout == 0 {
                return Err(invalid("service", "timeout", v, "must be at least 1 second"));
            }
            config.service.timeout = timeout;
        }
        if let Some(v) = non_empty(section, "max_features") {
            config.service.max_features = Some(parse_number(v, "service", "max_features")?);
        }
    }

    // [cache]
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = non_empty(section, "stale_time_secs") {
            config.cache.stale_time_secs = parse_number(v, "cache", "stale_time_secs")?;
        }
        if let Some(v) = non_empty(section, "max_entries") {
            let entries: u64 = parse_number(v, "cache", "max_entries")?;
            if entries == 0 {
                return Err(invalid("cache", "max_entries", v, "must be at least 1"));
            }
            config.cache.max_entries = entries;
        }
        if let Some(v) = non_empty(section, "precision") {
            let precision: u32 = parse_number(v, "cache", "precision")?;
            if precision > MAX_PRECISION {
                return Err(invalid(
                    "cache",
                    "precision",
                    v,
                    &format!("must be between 0 and {}", MAX_PRECISION),
                ));
            }
            config.cache.precision = precision;
        }
    }

    // [viewport]
    if let Some(section) = ini.section(Some("viewport")) {
        if let Some(v) = non_empty(section, "debounce_ms") {
            config.viewport.debounce_ms = parse_number(v, "viewport", "debounce_ms")?;
        }
    }

    // [logging]
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = Some(expand_tilde(v));
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(value: &str, section: &str, key: &str) -> Result<T, ConfigFileError> {
    value
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlay_values() {
        let config = parse(
            "[service]\nurl = https://example.com/ows\nlayer = city:buildings\ntimeout = 10\nmax_features = 5000\n\
             [cache]\nstale_time_secs = 60\nmax_entries = 20\nprecision = 4\n\
             [viewport]\ndebounce_ms = 250\n",
        )
        .unwrap();

        assert_eq!(config.service.url, "https://example.com/ows");
        assert_eq!(config.service.layer, "city:buildings");
        assert_eq!(config.service.timeout, 10);
        assert_eq!(config.service.max_features, Some(5000));
        assert_eq!(config.cache.stale_time_secs, 60);
        assert_eq!(config.cache.max_entries, 20);
        assert_eq!(config.cache.precision, 4);
        assert_eq!(config.viewport.debounce_ms, 250);
    }

    #[test]
    fn test_blank_values_keep_defaults() {
        let config = parse("[service]\nmax_features =\n[logging]\nfile =\n").unwrap();
        assert_eq!(config.service.max_features, None);
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_invalid_number() {
        match parse("[viewport]\ndebounce_ms = soon\n") {
            Err(ConfigFileError::InvalidValue {
                section, key, value, ..
            }) => {
                assert_eq!(section, "viewport");
                assert_eq!(key, "debounce_ms");
                assert_eq!(value, "soon");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_precision_out_of_range() {
        assert!(matches!(
            parse("[cache]\nprecision = 11\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_zero_max_entries_rejected() {
        assert!(matches!(
            parse("[cache]\nmax_entries = 0\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_bad_url_rejected() {
        assert!(matches!(
            parse("[service]\nurl = ftp://example.com\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/var/log/x.log"), PathBuf::from("/var/log/x.log"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x.log"), home.join("x.log"));
        }
    }
}
