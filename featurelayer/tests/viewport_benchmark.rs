//! Integration tests for viewport-driven fetching.
//!
//! These tests replay map interaction through the full fetch service with a
//! mock feature source and a paused clock:
//! - Pan benchmark request counts (A,B,C,A and A,B,A,B,A,B)
//! - Debounce under continuous motion
//! - Cancellation of superseded requests
//! - Stale entries shown while refetching
//! - Failures keeping the last-known data
//!
//! Run with: `cargo test --test viewport_benchmark`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use featurelayer::bbox::{quantize, BoundingBox};
use featurelayer::cache::RequestCache;
use featurelayer::feature::{BuildingProperties, Feature, FeatureCollection};
use featurelayer::orchestrator::{
    FeatureDataHandle, FeatureDataState, FeatureFetchService, FeatureQuery, FetchConfig,
};
use featurelayer::provider::{FeatureSource, FetchError};

// ============================================================================
// Helper Functions
// ============================================================================

const LAYER: &str = "global3D:lod1_global";

/// Longer than the 500 ms debounce plus the default source delay.
const SETTLE: Duration = Duration::from_millis(1000);

/// Mock WFS that tags each response with the requested box and a sequence
/// number.
struct MockWfs {
    delay: Duration,
    started: Mutex<Vec<BoundingBox>>,
    completed: AtomicUsize,
    fail_west: Mutex<Option<f64>>,
}

impl MockWfs {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
            fail_west: Mutex::new(None),
        })
    }

    fn requests(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    fn fail_for(&self, bbox: &BoundingBox) {
        *self.fail_west.lock().unwrap() = Some(bbox.west);
    }
}

impl FeatureSource for MockWfs {
    async fn fetch(
        &self,
        _layer: &str,
        bbox: &BoundingBox,
    ) -> Result<FeatureCollection, FetchError> {
        let sequence = {
            let mut started = self.started.lock().unwrap();
            started.push(*bbox);
            started.len() as i64
        };

        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);

        let fail = *self.fail_west.lock().unwrap();
        if fail.is_some_and(|w| (w - bbox.west).abs() < 1e-9) {
            return Err(FetchError::Http {
                status: 503,
                url: "https://example.com/ows".to_string(),
            });
        }

        Ok(FeatureCollection {
            features: vec![Feature {
                id: None,
                geometry: None,
                properties: BuildingProperties {
                    ogc_fid: Some(sequence.into()),
                    region: Some(bbox.to_string().into()),
                    height: Some(12.0),
                    ..Default::default()
                },
            }],
            ..Default::default()
        })
    }
}

struct Harness {
    handle: FeatureDataHandle,
    source: Arc<MockWfs>,
    cache: Arc<RequestCache>,
    shutdown: CancellationToken,
}

impl Harness {
    fn start(config: FetchConfig, source: Arc<MockWfs>) -> Self {
        let cache = Arc::new(RequestCache::new(config.cache_config()));
        let (service, handle) =
            FeatureFetchService::with_cache(config, Arc::clone(&source), Arc::clone(&cache))
                .unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(service.run(shutdown.clone()));

        Self {
            handle,
            source,
            cache,
            shutdown,
        }
    }

    fn with_defaults() -> Self {
        Self::start(FetchConfig::new(LAYER), MockWfs::new(Duration::from_millis(100)))
    }

    async fn show(&self, bbox: BoundingBox) {
        self.handle
            .update(FeatureQuery::new(LAYER, bbox))
            .await
            .unwrap();
    }

    /// Animate from `from` to `to` at 60 fps, then wait for the fetch.
    async fn pan(&self, from: BoundingBox, to: BoundingBox) {
        let frames = 12;
        for i in 1..=frames {
            let t = i as f64 / frames as f64;
            let frame = from.translate((to.west - from.west) * t, (to.south - from.south) * t);
            self.show(frame).await;
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        self.show(to).await;
        tokio::time::sleep(SETTLE).await;
    }

    fn state(&self) -> FeatureDataState {
        self.handle.state()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn viewport_a() -> BoundingBox {
    BoundingBox::new(11.50, 48.10, 11.55, 48.15)
}

fn viewport_b() -> BoundingBox {
    viewport_a().translate(0.1, 0.0)
}

fn viewport_c() -> BoundingBox {
    viewport_a().translate(0.2, 0.05)
}

/// Region tag and sequence number of the displayed collection.
fn displayed(state: &FeatureDataState) -> Option<(String, i64)> {
    let data = state.data.as_ref()?;
    let props = &data.features.first()?.properties;
    let region = props.region.as_ref()?.as_str()?.to_string();
    Some((region, props.ogc_fid.as_ref()?.as_i64()?))
}

fn snapped(bbox: BoundingBox) -> String {
    featurelayer::bbox::snap(&bbox, 3).unwrap().to_string()
}

// ============================================================================
// Pan Benchmark
// ============================================================================

/// A → B → C → A: the return to A is served from cache.
#[tokio::test(start_paused = true)]
async fn test_pan_revisit_hits_cache() {
    let h = Harness::with_defaults();

    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;
    assert_eq!(h.source.requests(), 1);

    h.pan(viewport_a(), viewport_b()).await;
    h.pan(viewport_b(), viewport_c()).await;
    h.pan(viewport_c(), viewport_a()).await;

    assert_eq!(h.source.requests(), 3, "initial load plus two new viewports");

    let state = h.state();
    assert!(!state.loading);
    assert_eq!(displayed(&state), Some((snapped(viewport_a()), 1)));

    let metrics = h.handle.metrics();
    assert_eq!(metrics.settles, 4);
    assert_eq!(metrics.cache_hits, 1);
}

/// A,B,A,B,A,B issues two requests, not six.
#[tokio::test(start_paused = true)]
async fn test_back_and_forth_issues_two_requests() {
    let h = Harness::with_defaults();

    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;
    for _ in 0..2 {
        h.pan(viewport_a(), viewport_b()).await;
        h.pan(viewport_b(), viewport_a()).await;
    }
    h.pan(viewport_a(), viewport_b()).await;

    assert_eq!(h.source.requests(), 2);
    assert_eq!(h.handle.metrics().cache_hits, 4);
    assert_eq!(displayed(&h.state()), Some((snapped(viewport_b()), 2)));
}

/// Sub-grid camera jitter keeps the key and issues nothing.
#[tokio::test(start_paused = true)]
async fn test_jitter_reuses_cached_viewport() {
    let h = Harness::with_defaults();

    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;

    h.show(viewport_a().translate(0.0002, -0.0003)).await;
    tokio::time::sleep(SETTLE).await;

    assert_eq!(h.source.requests(), 1);
    assert_eq!(h.handle.metrics().cache_hits, 1);
}

// ============================================================================
// Debounce
// ============================================================================

/// Continuous motion produces no request until it stops.
#[tokio::test(start_paused = true)]
async fn test_continuous_motion_fetches_only_after_stop() {
    let h = Harness::with_defaults();

    let mut frame = viewport_a();
    for _ in 0..120 {
        frame = frame.translate(0.001, 0.0);
        h.show(frame).await;
        tokio::time::sleep(Duration::from_millis(16)).await;
    }
    assert_eq!(h.source.requests(), 0);

    tokio::time::sleep(SETTLE).await;

    let started = h.source.started.lock().unwrap().clone();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].to_string(), snapped(frame));
}

// ============================================================================
// Cancellation
// ============================================================================

/// A request superseded by a newer viewport never reaches the cache or the
/// displayed state.
#[tokio::test(start_paused = true)]
async fn test_superseded_request_is_cancelled() {
    let h = Harness::start(FetchConfig::new(LAYER), MockWfs::new(Duration::from_secs(2)));

    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.source.requests(), 1);
    assert!(h.state().loading);

    h.show(viewport_b()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.source.requests(), 2);

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.source.completed.load(Ordering::SeqCst), 1, "A was dropped");
    assert!(h.cache.get(&quantize(LAYER, &viewport_a(), 3).unwrap()).is_none());
    assert!(h.cache.get(&quantize(LAYER, &viewport_b(), 3).unwrap()).is_some());

    let state = h.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(displayed(&state), Some((snapped(viewport_b()), 2)));

    let metrics = h.handle.metrics();
    assert_eq!(metrics.requests_cancelled, 1);
    assert_eq!(metrics.late_results_discarded, 0);
}

/// Disabling mid-flight cancels the request and clears loading.
#[tokio::test(start_paused = true)]
async fn test_disable_cancels_in_flight_request() {
    let h = Harness::start(FetchConfig::new(LAYER), MockWfs::new(Duration::from_secs(2)));

    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(h.state().loading);

    h.handle
        .update(FeatureQuery::new(LAYER, viewport_a()).with_enabled(false))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    let state = h.state();
    assert!(!state.loading);
    assert!(state.data.is_none());
    assert_eq!(h.source.completed.load(Ordering::SeqCst), 0);

    // Re-enabling refetches the same viewport immediately.
    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(h.source.requests(), 2);
    assert!(h.state().data.is_some());
}

// ============================================================================
// Staleness and Failures
// ============================================================================

/// A stale entry triggers a refetch and stays visible until it resolves.
#[tokio::test(start_paused = true)]
async fn test_stale_entry_refetched_with_old_data_visible() {
    let config = FetchConfig::new(LAYER).with_stale_time(Duration::from_secs(60));
    let h = Harness::start(config, MockWfs::new(Duration::from_secs(1)));

    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.show(viewport_b()).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.source.requests(), 2);

    tokio::time::sleep(Duration::from_secs(61)).await;

    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    let during = h.state();
    assert!(during.loading);
    assert_eq!(displayed(&during), Some((snapped(viewport_a()), 1)));
    assert_eq!(h.source.requests(), 3);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let after = h.state();
    assert!(!after.loading);
    assert_eq!(displayed(&after), Some((snapped(viewport_a()), 3)));
    assert_eq!(h.handle.metrics().stale_refetches, 1);
}

/// A superseded request that would fail leaves no error behind.
#[tokio::test(start_paused = true)]
async fn test_superseded_failure_is_silent() {
    let h = Harness::start(FetchConfig::new(LAYER), MockWfs::new(Duration::from_secs(2)));
    h.source.fail_for(&viewport_a());

    h.show(viewport_a()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.source.requests(), 1);

    h.show(viewport_b()).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(h.state().loading);
    assert!(h.state().error.is_none());

    tokio::time::sleep(Duration::from_secs(3)).await;

    let state = h.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(displayed(&state), Some((snapped(viewport_b()), 2)));
    assert_eq!(h.handle.metrics().requests_failed, 0);
}

/// A failed fetch exposes the error and keeps the previous collection.
#[tokio::test(start_paused = true)]
async fn test_failure_keeps_last_known_data() {
    let h = Harness::with_defaults();
    h.source.fail_for(&viewport_b());

    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;

    h.show(viewport_b()).await;
    tokio::time::sleep(SETTLE).await;

    let state = h.state();
    assert!(!state.loading);
    assert!(matches!(
        state.error,
        Some(FetchError::Http { status: 503, .. })
    ));
    assert_eq!(displayed(&state), Some((snapped(viewport_a()), 1)));
    assert!(h.cache.get(&quantize(LAYER, &viewport_b(), 3).unwrap()).is_none());

    // Returning to A clears the error from the cached entry.
    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;
    assert!(h.state().error.is_none());
    assert_eq!(h.source.requests(), 2);
}

/// Switching layers refetches the current viewport without waiting.
#[tokio::test(start_paused = true)]
async fn test_layer_switch_refetches_immediately() {
    let h = Harness::with_defaults();

    h.show(viewport_a()).await;
    tokio::time::sleep(SETTLE).await;

    h.handle
        .update(FeatureQuery::new("global3D:lod2_global", viewport_a()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(h.source.requests(), 2);
    assert!(!h.state().loading);
    assert_eq!(
        h.state().active_key.map(|k| k.layer().to_string()),
        Some("global3D:lod2_global".to_string())
    );
}
