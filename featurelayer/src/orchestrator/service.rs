//! Async owner of the fetch state machine.
//!
//! ```text
//! FeatureDataHandle ──query──►┌──────────────────────┐
//!                             │  FeatureFetchService │──spawn──► fetch task
//!   sleep_until(deadline) ───►│  (FetchStateMachine) │◄─result── (races token)
//!                             └──────────┬───────────┘
//!                                        │ watch
//!                                        ▼
//!                              FeatureDataState
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use featurelayer::bbox::BoundingBox;
//! use featurelayer::orchestrator::{FeatureFetchService, FeatureQuery, FetchConfig};
//! use featurelayer::provider::{AsyncReqwestClient, WfsProvider, DEFAULT_LAYER};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = WfsProvider::new(AsyncReqwestClient::new()?);
//!     let (service, handle) =
//!         FeatureFetchService::new(FetchConfig::default(), Arc::new(provider))?;
//!     let shutdown = CancellationToken::new();
//!     tokio::spawn(service.run(shutdown.clone()));
//!
//!     let bbox = BoundingBox::new(11.575, 48.137, 11.59, 48.145);
//!     handle.update(FeatureQuery::new(DEFAULT_LAYER, bbox)).await?;
//!
//!     let mut states = handle.subscribe();
//!     states.wait_for(|s| s.data.is_some() || s.error.is_some()).await?;
//!     println!("{} buildings", handle.state().feature_count());
//!
//!     shutdown.cancel();
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::FetchConfig;
use super::machine::FetchStateMachine;
use super::state::{FeatureDataState, FeatureQuery, FetchTicket};
use crate::bbox::{BboxError, QuantizedKey};
use crate::cache::RequestCache;
use crate::feature::FeatureCollection;
use crate::inflight::RequestId;
use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::provider::{FeatureSource, FetchError};

/// Errors surfaced by the fetch service and its handle.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service task is no longer running.
    #[error("Feature fetch service has stopped")]
    Stopped,

    /// The configuration was rejected.
    #[error("Invalid fetch configuration: {0}")]
    Config(#[from] BboxError),
}

/// Result of a spawned fetch, sent back to the service.
struct FetchCompletion {
    id: RequestId,
    key: QuantizedKey,
    result: Result<FeatureCollection, FetchError>,
}

/// Long-running task that owns the [`FetchStateMachine`].
pub struct FeatureFetchService<S: FeatureSource> {
    machine: FetchStateMachine,
    source: Arc<S>,
    query_rx: mpsc::Receiver<FeatureQuery>,
    state_tx: watch::Sender<FeatureDataState>,
}

impl<S: FeatureSource> FeatureFetchService<S> {
    /// Create a service with a fresh session cache.
    ///
    /// Returns the service and a cloneable handle for consumers.
    pub fn new(
        config: FetchConfig,
        source: Arc<S>,
    ) -> Result<(Self, FeatureDataHandle), ServiceError> {
        let cache = Arc::new(RequestCache::new(config.cache_config()));
        Self::with_cache(config, source, cache)
    }

    /// Create a service over an existing cache.
    pub fn with_cache(
        config: FetchConfig,
        source: Arc<S>,
        cache: Arc<RequestCache>,
    ) -> Result<(Self, FeatureDataHandle), ServiceError> {
        let metrics = Arc::new(FetchMetrics::new());
        let machine = FetchStateMachine::new(&config, cache, Arc::clone(&metrics))?;

        let (query_tx, query_rx) = mpsc::channel(config.channel_capacity);
        let (state_tx, state_rx) = watch::channel(FeatureDataState::default());

        let service = Self {
            machine,
            source,
            query_rx,
            state_tx,
        };
        let handle = FeatureDataHandle {
            query_tx,
            state_rx,
            metrics,
        };

        Ok((service, handle))
    }

    /// Runs until shutdown is signalled or every handle is dropped.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(layer = self.machine.layer(), "Feature fetch service starting");

        let Self {
            mut machine,
            source,
            mut query_rx,
            state_tx,
        } = self;

        let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<FetchCompletion>();

        loop {
            let deadline = machine.next_deadline();
            let mut tickets = Vec::new();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Feature fetch service shutting down");
                    break;
                }

                Some(completion) = completion_rx.recv() => {
                    let phase = machine.complete(
                        completion.id,
                        completion.key,
                        completion.result,
                        Instant::now(),
                    );
                    debug!(id = %completion.id, phase = %phase, "Request completed");
                }

                query = query_rx.recv() => {
                    let Some(query) = query else {
                        info!("All feature data handles dropped");
                        break;
                    };
                    match machine.apply_query(query, Instant::now()) {
                        Ok(issued) => tickets = issued,
                        Err(e) => warn!(error = %e, "Rejected feature query"),
                    }
                }

                _ = sleep_until(deadline) => {
                    match machine.poll_debounce(Instant::now()) {
                        Ok(issued) => tickets.extend(issued),
                        Err(e) => warn!(error = %e, "Failed to settle viewport"),
                    }
                }
            }

            for ticket in tickets {
                spawn_fetch(Arc::clone(&source), ticket, completion_tx.clone());
            }

            if machine.take_changed() {
                state_tx.send_replace(machine.state().clone());
            }
        }

        machine.shutdown();
        if machine.take_changed() {
            state_tx.send_replace(machine.state().clone());
        }
        info!("Feature fetch service stopped");
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Runs one fetch in its own task. Cancelling the ticket drops the transport
/// future, which aborts the connection.
fn spawn_fetch<S: FeatureSource>(
    source: Arc<S>,
    ticket: FetchTicket,
    completion_tx: mpsc::UnboundedSender<FetchCompletion>,
) {
    let FetchTicket {
        id,
        key,
        layer,
        bbox,
        token,
    } = ticket;

    tokio::spawn(async move {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                debug!(id = %id, key = %key, "Fetch cancelled");
            }

            result = source.fetch(&layer, &bbox) => {
                let _ = completion_tx.send(FetchCompletion { id, key, result });
            }
        }
    });
}

/// Consumer side of the fetch service.
///
/// Cloneable; the service stops once every handle is dropped.
#[derive(Clone)]
pub struct FeatureDataHandle {
    query_tx: mpsc::Sender<FeatureQuery>,
    state_rx: watch::Receiver<FeatureDataState>,
    metrics: Arc<FetchMetrics>,
}

impl FeatureDataHandle {
    /// Submit the current layer, viewport and enabled flag.
    pub async fn update(&self, query: FeatureQuery) -> Result<(), ServiceError> {
        self.query_tx
            .send(query)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    /// Latest published state.
    pub fn state(&self) -> FeatureDataState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeatureDataState> {
        self.state_rx.clone()
    }

    /// Current request metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
