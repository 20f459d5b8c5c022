//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use featurelayer::bbox::BboxError;
use featurelayer::config::ConfigFileError;
use featurelayer::orchestrator::ServiceError;
use featurelayer::provider::FetchError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load or save the config file
    ConfigFile(ConfigFileError),
    /// Bounding box could not be used
    Bbox(BboxError),
    /// Feature request failed
    Fetch(FetchError),
    /// Fetch service stopped or rejected its configuration
    Service(ServiceError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Failed to read a replay script
    ScriptRead { path: String, error: std::io::Error },
    /// Replay script line could not be parsed
    Script { line: usize, reason: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Fetch(FetchError::Transport(_)) | CliError::Fetch(FetchError::Http { .. }) => {
                eprintln!();
                eprintln!("Check that the WFS endpoint is reachable:");
                eprintln!("  1. Verify [service] url in config.ini or pass --url");
                eprintln!("  2. Verify the layer name with the service's GetCapabilities");
            }
            CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Run 'featurelayer config path' to locate the configuration file.");
            }
            CliError::Script { .. } => {
                eprintln!();
                eprintln!("Script lines are 'west,south,east,north', 'wait <ms>' or '# comment'.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Bbox(e) => write!(f, "Invalid bounding box: {}", e),
            CliError::Fetch(e) => write!(f, "Failed to fetch features: {}", e),
            CliError::Service(e) => write!(f, "Fetch service error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ScriptRead { path, error } => {
                write!(f, "Failed to read script '{}': {}", path, error)
            }
            CliError::Script { line, reason } => write!(f, "Script line {}: {}", line, reason),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Bbox(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::ScriptRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<BboxError> for CliError {
    fn from(e: BboxError) -> Self {
        CliError::Bbox(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}
