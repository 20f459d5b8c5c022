//! FeatureLayer CLI - Command-line interface
//!
//! Inspect cache keys, fetch building footprints for a viewport and replay
//! recorded map interaction through the viewport cache.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use featurelayer::bbox::BoundingBox;

use commands::common::parse_bbox;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Parser)]
#[command(name = "featurelayer")]
#[command(version, about = "Viewport-keyed WFS building footprint fetching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the cache key for a bounding box
    Key {
        /// Bounding box as west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: BoundingBox,

        /// Feature layer (defaults to [service] layer)
        #[arg(long)]
        layer: Option<String>,

        /// Decimal places (defaults to [cache] precision)
        #[arg(long)]
        precision: Option<u32>,
    },

    /// Fetch one viewport and print building statistics
    Fetch {
        /// Bounding box as west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: BoundingBox,

        /// Feature layer (defaults to [service] layer)
        #[arg(long)]
        layer: Option<String>,

        /// WFS endpoint (defaults to [service] url)
        #[arg(long)]
        url: Option<String>,

        /// Count buildings at least this tall
        #[arg(long)]
        min_height: Option<f64>,

        /// Count buildings at most this tall
        #[arg(long)]
        max_height: Option<f64>,

        /// Print log output to stdout
        #[arg(short, long)]
        verbose: bool,
    },

    /// Replay a viewport script and report request metrics
    Replay {
        /// Script with one bounding box or 'wait <ms>' per line
        script: PathBuf,

        /// Time to wait after the last step before reporting
        #[arg(long, default_value = "1000")]
        settle_ms: u64,

        /// WFS endpoint (defaults to [service] url)
        #[arg(long)]
        url: Option<String>,

        /// Print log output to stdout
        #[arg(short, long)]
        verbose: bool,
    },

    /// Manage configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Key {
            bbox,
            layer,
            precision,
        } => commands::key::run(commands::key::KeyArgs {
            bbox,
            layer,
            precision,
        }),

        Commands::Fetch {
            bbox,
            layer,
            url,
            min_height,
            max_height,
            verbose,
        } => commands::fetch::run(commands::fetch::FetchArgs {
            bbox,
            layer,
            url,
            min_height,
            max_height,
            verbose,
        }),

        Commands::Replay {
            script,
            settle_ms,
            url,
            verbose,
        } => commands::replay::run(commands::replay::ReplayArgs {
            script,
            settle_ms,
            url,
            verbose,
        }),

        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
