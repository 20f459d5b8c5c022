//! User configuration (`~/.featurelayer/config.ini`).
//!
//! Settings structs live in `settings`, constants in `defaults`, parsing in
//! `parser` and serialization in `writer`.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, LoggingSettings, ServiceSettings, ViewportSettings};
