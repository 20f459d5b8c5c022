//! Common helpers shared across CLI commands.

use featurelayer::bbox::BoundingBox;
use featurelayer::config::ConfigFile;

/// Parse a `west,south,east,north` argument.
pub fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    value.parse().map_err(|e: featurelayer::bbox::BboxError| e.to_string())
}

/// Resolve the layer from CLI args and config.
pub fn resolve_layer(cli_layer: Option<String>, config: &ConfigFile) -> String {
    cli_layer.unwrap_or_else(|| config.service.layer.clone())
}

/// Resolve the quantization precision from CLI args and config.
pub fn resolve_precision(cli_precision: Option<u32>, config: &ConfigFile) -> u32 {
    cli_precision.unwrap_or(config.cache.precision)
}
