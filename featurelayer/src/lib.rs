//! FeatureLayer - viewport-keyed fetching of WFS building footprints
//!
//! While a map is panned or zoomed, every frame reports a new extent. This
//! library turns that stream into as few feature service requests as
//! possible:
//!
//! - [`debounce`] waits for the viewport to settle
//! - [`bbox`] snaps the settled extent to a decimal grid and derives a key
//! - [`cache`] serves fresh results for a key without touching the network
//! - [`inflight`] keeps one request per key and cancels superseded ones
//! - [`orchestrator`] wires these together behind a consumer handle
//!
//! [`provider`] talks to the WFS endpoint, [`analysis`] summarises the
//! returned buildings, and [`config`] and [`logging`] provide the ambient
//! setup used by the command-line tool.

pub mod analysis;
pub mod bbox;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod feature;
pub mod inflight;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod provider;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
