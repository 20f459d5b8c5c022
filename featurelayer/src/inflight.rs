//! In-flight request tracking.
//!
//! Keeps at most one pending request per [`QuantizedKey`]. Each request
//! carries a unique [`RequestId`] and a [`CancellationToken`]; completions are
//! only honoured while their id is still tracked, so a superseded request can
//! never touch displayed state even if its transport ignores cancellation.

use std::collections::HashMap;
use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::bbox::QuantizedKey;

/// Monotonic identifier assigned to every issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request between issuance and resolution.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub id: RequestId,
    pub key: QuantizedKey,
    pub token: CancellationToken,
}

/// Tracks live requests, one per key.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    pending: HashMap<QuantizedKey, PendingRequest>,
    next_id: u64,
}

impl InFlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request for `key`.
    ///
    /// An existing request for the same key is cancelled and replaced.
    /// Requests for other keys are left alone.
    pub fn issue(&mut self, key: QuantizedKey) -> PendingRequest {
        self.next_id += 1;
        let request = PendingRequest {
            id: RequestId(self.next_id),
            key: key.clone(),
            token: CancellationToken::new(),
        };

        if let Some(previous) = self.pending.insert(key, request.clone()) {
            trace!(id = %previous.id, key = %previous.key, "Replacing request for same key");
            previous.token.cancel();
        }

        request
    }

    /// The pending request for `key`, if any.
    pub fn get(&self, key: &QuantizedKey) -> Option<&PendingRequest> {
        self.pending.get(key)
    }

    /// Check whether `id` is still the live request for `key`.
    pub fn is_tracked(&self, key: &QuantizedKey, id: RequestId) -> bool {
        self.pending.get(key).is_some_and(|r| r.id == id)
    }

    /// Remove the request for `key` if it is still `id`.
    ///
    /// Returns false when the request was cancelled or replaced, in which case
    /// the caller must discard its result.
    pub fn resolve(&mut self, key: &QuantizedKey, id: RequestId) -> bool {
        if self.is_tracked(key, id) {
            self.pending.remove(key);
            true
        } else {
            false
        }
    }

    /// Cancel the request for `key`. Returns true if one was pending.
    pub fn cancel(&mut self, key: &QuantizedKey) -> bool {
        match self.pending.remove(key) {
            Some(request) => {
                request.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending request except the one for `keep`.
    ///
    /// Returns the cancelled requests.
    pub fn cancel_except(&mut self, keep: &QuantizedKey) -> Vec<PendingRequest> {
        let doomed: Vec<QuantizedKey> = self
            .pending
            .keys()
            .filter(|k| *k != keep)
            .cloned()
            .collect();

        doomed
            .into_iter()
            .filter_map(|k| self.pending.remove(&k))
            .inspect(|r| r.token.cancel())
            .collect()
    }

    /// Cancel every pending request.
    pub fn cancel_all(&mut self) -> Vec<PendingRequest> {
        self.pending
            .drain()
            .map(|(_, r)| {
                r.token.cancel();
                r
            })
            .collect()
    }

    /// Number of live requests.
    pub fn active(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
