//! Key command - print the cache key for a bounding box.

use featurelayer::bbox::{quantize, snap, BoundingBox};
use featurelayer::config::ConfigFile;

use super::common::{resolve_layer, resolve_precision};
use crate::error::CliError;

/// Arguments for the key command.
pub struct KeyArgs {
    pub bbox: BoundingBox,
    pub layer: Option<String>,
    pub precision: Option<u32>,
}

/// Run the key command.
pub fn run(args: KeyArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let layer = resolve_layer(args.layer, &config);
    let precision = resolve_precision(args.precision, &config);

    let key = quantize(&layer, &args.bbox, precision)?;
    let snapped = snap(&args.bbox, precision)?;

    println!("{}", key);
    println!("  requested extent: {}", snapped);
    Ok(())
}
