//! Viewport-driven feature fetch orchestration.
//!
//! Combines quantization, debouncing, the request cache and in-flight
//! tracking. [`FetchStateMachine`] holds the rules and is driven by
//! [`FeatureFetchService`], which consumers talk to through a
//! [`FeatureDataHandle`].

mod config;
mod machine;
mod service;
mod state;

pub use config::{FetchConfig, DEFAULT_QUERY_CHANNEL_CAPACITY};
pub use machine::FetchStateMachine;
pub use service::{FeatureDataHandle, FeatureFetchService, ServiceError};
pub use state::{FeatureDataState, FeatureQuery, FetchPhase, FetchTicket};
