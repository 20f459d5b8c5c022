//! Published fetch state.

use std::fmt;
use std::sync::Arc;

use crate::bbox::{BoundingBox, QuantizedKey};
use crate::feature::FeatureCollection;
use crate::inflight::RequestId;
use crate::provider::FetchError;

/// What consumers see: the displayed collection, whether a request for the
/// current viewport is running, and the last failure for it.
///
/// `data` and `error` may both be set: the last-known collection stays
/// visible alongside the error of a failed refetch.
#[derive(Debug, Clone, Default)]
pub struct FeatureDataState {
    pub data: Option<Arc<FeatureCollection>>,
    pub loading: bool,
    pub error: Option<FetchError>,

    /// Key of the most recently settled viewport.
    pub active_key: Option<QuantizedKey>,
}

impl FeatureDataState {
    /// Number of displayed features.
    pub fn feature_count(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }
}

/// Lifecycle of a request for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    Fetching,
    Resolved,
    Cancelled,
    Failed,
}

impl fmt::Display for FetchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchPhase::Idle => "idle",
            FetchPhase::Fetching => "fetching",
            FetchPhase::Resolved => "resolved",
            FetchPhase::Cancelled => "cancelled",
            FetchPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Consumer input: the equivalent of one render of the data hook.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub layer: String,
    pub bbox: Option<BoundingBox>,
    pub enabled: bool,
}

impl FeatureQuery {
    /// An enabled query for `layer` at `bbox`.
    pub fn new(layer: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            layer: layer.into(),
            bbox: Some(bbox),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn without_bbox(mut self) -> Self {
        self.bbox = None;
        self
    }
}

/// Work order for one network request.
///
/// `bbox` is the snapped extent of `key`, so the response belongs to exactly
/// that key.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub id: RequestId,
    pub key: QuantizedKey,
    pub layer: String,
    pub bbox: BoundingBox,
    pub token: tokio_util::sync::CancellationToken,
}
