//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, runtime and provider
//! creation so command handlers stay small.

use tokio::runtime::Runtime;
use tracing::info;

use featurelayer::config::ConfigFile;
use featurelayer::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use featurelayer::provider::{AsyncReqwestClient, WfsProvider};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load config and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `verbose` - Also print log output to stdout
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = match &config.logging.file {
            Some(path) => (
                path.parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(default_log_dir),
                path.file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| default_log_file().to_string()),
            ),
            None => (default_log_dir(), default_log_file().to_string()),
        };

        let logging_guard = init_logging(&log_dir, &log_file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("FeatureLayer v{}", featurelayer::VERSION);
        info!("FeatureLayer CLI: {} command", command);
    }

    /// Build a multi-threaded tokio runtime.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }

    /// Create a WFS provider, preferring `url` over the configured endpoint.
    pub fn create_provider(
        &self,
        url: Option<String>,
    ) -> Result<WfsProvider<AsyncReqwestClient>, CliError> {
        let service = &self.config.service;
        let client = AsyncReqwestClient::with_timeout(service.timeout)?;
        let url = url.unwrap_or_else(|| service.url.clone());

        info!(url = %url, timeout_secs = service.timeout, "Using WFS endpoint");
        Ok(WfsProvider::with_url(client, url).with_max_features(service.max_features))
    }
}
