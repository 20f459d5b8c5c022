//! Viewport change debouncing.
//!
//! While the user pans or zooms, the map reports a new extent on every frame
//! of motion. Only the extent where motion stops is worth fetching, so the
//! debouncer holds the most recent box and releases it once no further change
//! has arrived for a quiet period.
//!
//! The debouncer is driven by caller-supplied instants. The orchestrator
//! sleeps until [`Debouncer::deadline`] and then calls [`Debouncer::poll`];
//! tests feed synthetic instants directly.

use std::time::Duration;

use tokio::time::Instant;

use crate::bbox::BoundingBox;

/// Default quiet period before a viewport is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Configuration for viewport debouncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Duration without new signals after which the latest box settles.
    pub quiet_period: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_DEBOUNCE,
        }
    }
}

impl DebounceConfig {
    /// Create a new debounce configuration.
    pub fn new(quiet_period: Duration) -> Self {
        Self { quiet_period }
    }
}

/// State machine that collapses bursts of viewport signals.
///
/// Each new signal discards the previous pending box and restarts the quiet
/// period. There is no queueing: only the latest box can ever settle.
#[derive(Debug)]
pub struct Debouncer {
    config: DebounceConfig,

    /// Latest box waiting for the quiet period to elapse.
    pending: Option<BoundingBox>,

    /// Arrival time of the latest signal.
    last_signal: Option<Instant>,

    /// Signals that were replaced before settling.
    superseded: u64,
}

impl Debouncer {
    /// Create a new debouncer with the given configuration.
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: None,
            last_signal: None,
            superseded: 0,
        }
    }

    /// Create a debouncer with the default 500 ms quiet period.
    pub fn with_defaults() -> Self {
        Self::new(DebounceConfig::default())
    }

    /// Record a viewport signal that arrived at `now`.
    pub fn record(&mut self, bbox: BoundingBox, now: Instant) {
        if self.pending.replace(bbox).is_some() {
            self.superseded += 1;
        }
        self.last_signal = Some(now);
    }

    /// Release the pending box if the quiet period has elapsed by `now`.
    ///
    /// # Returns
    ///
    /// `Some(bbox)` exactly once per settled burst, `None` otherwise.
    pub fn poll(&mut self, now: Instant) -> Option<BoundingBox> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.last_signal = None;
        self.pending.take()
    }

    /// Instant at which the pending box settles, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match (self.pending, self.last_signal) {
            (Some(_), Some(last)) => Some(last + self.config.quiet_period),
            _ => None,
        }
    }

    /// Drop any pending box so nothing settles after teardown.
    ///
    /// Returns `true` if a box was pending.
    pub fn cancel(&mut self) -> bool {
        self.last_signal = None;
        self.pending.take().is_some()
    }

    /// Check whether a box is waiting to settle.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The box waiting to settle, if any.
    pub fn pending(&self) -> Option<&BoundingBox> {
        self.pending.as_ref()
    }

    /// Number of signals discarded because a newer one replaced them.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }

    /// Get the current configuration.
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }
}
