//! CLI command implementations.

pub mod common;
pub mod config;
pub mod fetch;
pub mod key;
pub mod replay;
