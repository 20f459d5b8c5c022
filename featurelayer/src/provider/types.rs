//! Core types for feature providers.

use std::future::Future;

use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::feature::FeatureCollection;

/// Errors that can occur while fetching features.
///
/// Cancellation is not represented here; a cancelled request never produces
/// an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The service answered with a non-success status.
    #[error("WFS request failed: HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The request could not be sent or the body could not be read.
    #[error("WFS transport error: {0}")]
    Transport(String),

    /// The body was not a valid feature collection.
    #[error("Invalid feature collection: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Source of feature collections for a layer and bounding box.
///
/// The orchestrator issues one `fetch` per request and drops the returned
/// future when the request is cancelled, so implementations must be
/// cancel-safe.
pub trait FeatureSource: Send + Sync + 'static {
    /// Fetch the features of `layer` inside `bbox`.
    fn fetch(
        &self,
        layer: &str,
        bbox: &BoundingBox,
    ) -> impl Future<Output = Result<FeatureCollection, FetchError>> + Send;
}
