//! Fetch command - request one viewport and summarise its buildings.

use tracing::info;

use featurelayer::analysis::{compute_height_stats, count_in_height_range, polygon_area_m2};
use featurelayer::bbox::{snap, BoundingBox};
use featurelayer::provider::FeatureSource;

use super::common::{resolve_layer, resolve_precision};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub bbox: BoundingBox,
    pub layer: Option<String>,
    pub url: Option<String>,
    pub min_height: Option<f64>,
    pub max_height: Option<f64>,
    pub verbose: bool,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("fetch");
    let config = runner.config();

    let layer = resolve_layer(args.layer, config);
    let bbox = snap(&args.bbox, resolve_precision(None, config))?;
    let provider = runner.create_provider(args.url)?;

    println!("Fetching {} for {}...", layer, bbox);
    let runtime = runner.runtime()?;
    let collection = runtime.block_on(provider.fetch(&layer, &bbox))?;
    info!(features = collection.len(), "Fetch complete");

    match compute_height_stats(&collection) {
        Some(stats) => print!("{}", stats),
        None => {
            println!("No buildings in this extent.");
            return Ok(());
        }
    }

    let footprint: f64 = collection
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(polygon_area_m2)
        .sum();
    println!("Total footprint: {:.0} m²", footprint);

    if args.min_height.is_some() || args.max_height.is_some() {
        let min = args.min_height.unwrap_or(0.0);
        let max = args.max_height.unwrap_or(f64::INFINITY);
        let count = count_in_height_range(&collection.features, min, max);
        println!("Buildings between {} m and {} m: {}", min, max, count);
    }

    Ok(())
}
