//! Replay command - drive the fetch service with a recorded viewport script.
//!
//! A script has one entry per line:
//!
//! ```text
//! # pan from A to B and back
//! 11.50,48.10,11.55,48.15
//! wait 1000
//! 11.60,48.10,11.65,48.15
//! wait 1000
//! 11.50,48.10,11.55,48.15
//! ```
//!
//! Consecutive boxes without a `wait` between them arrive as one burst.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use featurelayer::bbox::BoundingBox;
use featurelayer::orchestrator::{FeatureFetchService, FeatureQuery};

use crate::error::CliError;
use crate::runner::CliRunner;

/// One script instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayStep {
    Viewport(BoundingBox),
    Wait(Duration),
}

/// Arguments for the replay command.
pub struct ReplayArgs {
    pub script: PathBuf,
    pub settle_ms: u64,
    pub url: Option<String>,
    pub verbose: bool,
}

/// Parse a viewport script.
pub fn parse_script(content: &str) -> Result<Vec<ReplayStep>, CliError> {
    let mut steps = Vec::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let step = match line.strip_prefix("wait") {
            Some(rest) => {
                let ms: u64 = rest.trim().parse().map_err(|_| CliError::Script {
                    line: index + 1,
                    reason: format!("invalid wait duration '{}'", rest.trim()),
                })?;
                ReplayStep::Wait(Duration::from_millis(ms))
            }
            None => ReplayStep::Viewport(line.parse().map_err(
                |e: featurelayer::bbox::BboxError| CliError::Script {
                    line: index + 1,
                    reason: e.to_string(),
                },
            )?),
        };
        steps.push(step);
    }

    Ok(steps)
}

/// Run the replay command.
pub fn run(args: ReplayArgs) -> Result<(), CliError> {
    let content = std::fs::read_to_string(&args.script).map_err(|error| CliError::ScriptRead {
        path: args.script.display().to_string(),
        error,
    })?;
    let steps = parse_script(&content)?;

    let runner = CliRunner::new(args.verbose)?;
    runner.log_startup("replay");

    let fetch_config = runner.config().fetch_config();
    let layer = fetch_config.layer.clone();
    let provider = Arc::new(runner.create_provider(args.url)?);
    let runtime = runner.runtime()?;
    let settle = Duration::from_millis(args.settle_ms);

    let viewports = steps
        .iter()
        .filter(|s| matches!(s, ReplayStep::Viewport(_)))
        .count();
    println!(
        "Replaying {} viewports on {} ({} steps)...",
        viewports,
        layer,
        steps.len()
    );

    runtime.block_on(async move {
        let (service, handle) = FeatureFetchService::new(fetch_config, provider)?;
        let shutdown = CancellationToken::new();
        let service_task = tokio::spawn(service.run(shutdown.clone()));

        for step in steps {
            match step {
                ReplayStep::Viewport(bbox) => {
                    handle.update(FeatureQuery::new(layer.clone(), bbox)).await?;
                }
                ReplayStep::Wait(duration) => tokio::time::sleep(duration).await,
            }
        }

        tokio::time::sleep(settle).await;
        let mut state_rx = handle.subscribe();
        let settled = tokio::time::timeout(
            settle.max(Duration::from_secs(1)) * 10,
            state_rx.wait_for(|s| !s.loading),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        if !settled {
            println!("Warning: last request still running when replay ended");
        }

        let state = handle.state();
        let metrics = handle.metrics();
        info!(requests = metrics.requests_issued, "Replay complete");

        println!();
        println!("{}", metrics);
        println!();
        println!("Displayed features: {}", state.feature_count());
        if let Some(error) = &state.error {
            println!("Last error: {}", error);
        }

        shutdown.cancel();
        let _ = service_task.await;
        Ok::<(), CliError>(())
    })
}
