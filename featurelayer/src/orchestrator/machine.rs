//! Synchronous fetch state machine.
//!
//! Owns the debouncer, the in-flight tracker and a handle to the session's
//! request cache, and turns consumer input into [`FetchTicket`]s. It performs
//! no I/O and reads no clock: every event carries the instant it happened,
//! which keeps the ordering rules testable without a runtime.
//!
//! # Settle rules
//!
//! For the settled key K:
//!
//! 1. Fresh cache entry: expose it, no request. Other requests keep running.
//! 2. K already in flight: reuse that request.
//! 3. Otherwise cancel requests for other keys and issue one for K. A stale
//!    entry for K is displayed until the new request resolves.
//!
//! Completions whose request id is no longer tracked are dropped.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::config::FetchConfig;
use super::state::{FeatureDataState, FeatureQuery, FetchPhase, FetchTicket};
use crate::bbox::{quantize, snap, BboxError, BoundingBox, QuantizedKey};
use crate::cache::{CacheLookup, RequestCache};
use crate::debounce::Debouncer;
use crate::feature::FeatureCollection;
use crate::inflight::{InFlightTracker, RequestId};
use crate::metrics::FetchMetrics;
use crate::provider::FetchError;

/// Coalescing state machine for viewport-driven feature fetches.
pub struct FetchStateMachine {
    precision: u32,
    layer: String,
    enabled: bool,

    cache: Arc<RequestCache>,
    inflight: InFlightTracker,
    debouncer: Debouncer,
    metrics: Arc<FetchMetrics>,

    /// Last raw viewport received from the consumer.
    viewport: Option<BoundingBox>,

    /// Last viewport that settled (or arrived while disabled).
    settled: Option<BoundingBox>,

    state: FeatureDataState,
    changed: bool,
}

impl FetchStateMachine {
    /// Create a state machine over an existing cache.
    pub fn new(
        config: &FetchConfig,
        cache: Arc<RequestCache>,
        metrics: Arc<FetchMetrics>,
    ) -> Result<Self, BboxError> {
        config.validate()?;

        Ok(Self {
            precision: config.precision,
            layer: config.layer.clone(),
            enabled: true,
            cache,
            inflight: InFlightTracker::new(),
            debouncer: Debouncer::new(config.debounce_config()),
            metrics,
            viewport: None,
            settled: None,
            state: FeatureDataState::default(),
            changed: false,
        })
    }

    /// Apply a full consumer query.
    ///
    /// Disabling is handled first so no ticket is issued only to be
    /// cancelled; the viewport is handled last so a moved box starts a new
    /// debounce window. An invalid viewport rejects the whole query before
    /// any state changes.
    pub fn apply_query(
        &mut self,
        query: FeatureQuery,
        now: Instant,
    ) -> Result<Vec<FetchTicket>, BboxError> {
        if let Some(bbox) = &query.bbox {
            bbox.validate()?;
        }

        let mut tickets = Vec::new();

        if !query.enabled {
            self.set_enabled(false, now)?;
        }

        if query.layer != self.layer {
            tickets.extend(self.set_layer(query.layer, now)?);
        }

        if query.enabled && !self.enabled {
            tickets.extend(self.set_enabled(true, now)?);
        }

        if query.bbox != self.viewport {
            self.viewport_changed(query.bbox, now)?;
        }

        tickets.retain(|t| !t.token.is_cancelled());
        Ok(tickets)
    }

    /// Record a raw viewport change at `now`.
    ///
    /// `None` clears the viewport. While disabled the box is remembered
    /// without debouncing and evaluated on re-enable.
    pub fn viewport_changed(
        &mut self,
        bbox: Option<BoundingBox>,
        now: Instant,
    ) -> Result<(), BboxError> {
        self.metrics.viewport_signal();

        let Some(bbox) = bbox else {
            self.clear_viewport();
            return Ok(());
        };

        bbox.validate()?;
        self.viewport = Some(bbox);

        if self.enabled {
            trace!(bbox = %bbox, "Viewport changed");
            self.debouncer.record(bbox, now);
        } else {
            self.settled = Some(bbox);
        }
        Ok(())
    }

    /// Settle the pending viewport if its quiet period has elapsed.
    pub fn poll_debounce(&mut self, now: Instant) -> Result<Option<FetchTicket>, BboxError> {
        match self.debouncer.poll(now) {
            Some(bbox) => self.settle(bbox, now),
            None => Ok(None),
        }
    }

    /// When the pending viewport settles, if one is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Evaluate a settled viewport against the cache and in-flight requests.
    pub fn settle(
        &mut self,
        bbox: BoundingBox,
        now: Instant,
    ) -> Result<Option<FetchTicket>, BboxError> {
        let snapped = snap(&bbox, self.precision)?;
        let key = quantize(&self.layer, &bbox, self.precision)?;

        self.settled = Some(bbox);
        self.metrics.settled();
        self.state.active_key = Some(key.clone());
        self.changed = true;

        let stale = match self.cache.lookup(&key, now) {
            CacheLookup::Fresh(entry) => {
                debug!(key = %key, "Fresh cache hit");
                self.metrics.cache_hit();
                self.state.data = Some(Arc::clone(&entry.features));
                self.state.loading = false;
                self.state.error = None;
                return Ok(None);
            }
            CacheLookup::Stale(entry) => {
                debug!(key = %key, age_secs = entry.age(now).as_secs(), "Stale cache entry, refetching");
                self.metrics.stale_refetch();
                Some(entry)
            }
            CacheLookup::Miss => None,
        };

        let cancelled = self.inflight.cancel_except(&key);
        if !cancelled.is_empty() {
            debug!(count = cancelled.len(), "Cancelled superseded requests");
            self.metrics.requests_cancelled(cancelled.len());
        }

        if let Some(stale) = stale {
            self.state.data = Some(Arc::clone(&stale.features));
        }
        self.state.loading = true;
        self.state.error = None;

        if let Some(existing) = self.inflight.get(&key) {
            debug!(key = %key, id = %existing.id, "Reusing in-flight request");
            self.metrics.request_reused();
            return Ok(None);
        }

        let request = self.inflight.issue(key.clone());
        self.metrics.request_issued();
        debug!(key = %key, id = %request.id, "Issuing request");

        Ok(Some(FetchTicket {
            id: request.id,
            key,
            layer: self.layer.clone(),
            bbox: snapped,
            token: request.token,
        }))
    }

    /// Apply the outcome of request `id` for `key`.
    ///
    /// Returns the phase the request ended in. `Cancelled` means the result
    /// was discarded because the request was no longer tracked.
    pub fn complete(
        &mut self,
        id: RequestId,
        key: QuantizedKey,
        result: Result<FeatureCollection, FetchError>,
        now: Instant,
    ) -> FetchPhase {
        if !self.inflight.resolve(&key, id) {
            debug!(key = %key, id = %id, "Discarding result of untracked request");
            self.metrics.late_result_discarded();
            return FetchPhase::Cancelled;
        }

        let active = self.state.active_key.as_ref() == Some(&key);

        match result {
            Ok(features) => {
                let entry = self.cache.put_at(key, Arc::new(features), now);
                self.metrics.request_succeeded();
                if active {
                    self.state.data = Some(Arc::clone(&entry.features));
                    self.state.loading = false;
                    self.state.error = None;
                    self.changed = true;
                }
                FetchPhase::Resolved
            }
            Err(error) => {
                warn!(key = %key, id = %id, error = %error, "Feature fetch failed");
                self.metrics.request_failed();
                if active {
                    self.state.error = Some(error);
                    self.state.loading = false;
                    self.changed = true;
                }
                FetchPhase::Failed
            }
        }
    }

    /// Switch to another layer.
    ///
    /// The last settled viewport is re-evaluated immediately because its key
    /// changed.
    pub fn set_layer(
        &mut self,
        layer: impl Into<String>,
        now: Instant,
    ) -> Result<Option<FetchTicket>, BboxError> {
        let layer = layer.into();
        if layer == self.layer {
            return Ok(None);
        }

        debug!(from = %self.layer, to = %layer, "Layer changed");
        self.layer = layer;

        match (self.enabled, self.settled) {
            (true, Some(bbox)) => self.settle(bbox, now),
            _ => Ok(None),
        }
    }

    /// Enable or disable fetching.
    ///
    /// Disabling cancels the debounce and every request and clears `loading`.
    /// Re-enabling re-evaluates the last settled viewport.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        now: Instant,
    ) -> Result<Option<FetchTicket>, BboxError> {
        if enabled == self.enabled {
            return Ok(None);
        }
        self.enabled = enabled;

        if !enabled {
            debug!("Fetching disabled");
            if let Some(bbox) = self.debouncer.pending().copied() {
                self.settled = Some(bbox);
            }
            self.debouncer.cancel();
            self.cancel_requests();
            return Ok(None);
        }

        debug!("Fetching enabled");
        match self.settled {
            Some(bbox) => self.settle(bbox, now),
            None => Ok(None),
        }
    }

    /// Forget the viewport and cancel all pending work. Data is kept.
    pub fn clear_viewport(&mut self) {
        debug!("Viewport cleared");
        self.viewport = None;
        self.settled = None;
        self.debouncer.cancel();
        self.cancel_requests();
    }

    /// Cancel everything before the owner goes away.
    pub fn shutdown(&mut self) {
        self.debouncer.cancel();
        self.cancel_requests();
    }

    fn cancel_requests(&mut self) {
        let cancelled = self.inflight.cancel_all();
        if !cancelled.is_empty() {
            self.metrics.requests_cancelled(cancelled.len());
        }
        if self.state.loading {
            self.state.loading = false;
            self.changed = true;
        }
    }

    /// Phase of the latest request for `key`.
    pub fn phase(&self, key: &QuantizedKey) -> FetchPhase {
        if self.inflight.get(key).is_some() {
            FetchPhase::Fetching
        } else if self.state.active_key.as_ref() == Some(key) && self.state.error.is_some() {
            FetchPhase::Failed
        } else if self.cache.get(key).is_some() {
            FetchPhase::Resolved
        } else {
            FetchPhase::Idle
        }
    }

    /// Current consumer-visible state.
    pub fn state(&self) -> &FeatureDataState {
        &self.state
    }

    /// Returns whether the state changed since the last call, and resets it.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.active()
    }

    pub fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<FetchMetrics> {
        &self.metrics
    }
}
