//! Lock-free fetch metrics.
//!
//! Counters are shared via `Arc` between the fetch service and its
//! consumers. All operations use `Relaxed` ordering; the counters are
//! independent measurements.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing how viewport changes turned into network requests.
#[derive(Debug, Default)]
pub struct FetchMetrics {
    /// Viewport signals received
    viewport_signals: AtomicU64,
    /// Debounced settles evaluated
    settles: AtomicU64,
    /// Settles served from a fresh cache entry
    cache_hits: AtomicU64,
    /// Settles that found a stale entry and refetched
    stale_refetches: AtomicU64,
    /// Settles that reused the active in-flight request
    requests_reused: AtomicU64,
    /// Network requests issued
    requests_issued: AtomicU64,
    /// Requests cancelled before resolving
    requests_cancelled: AtomicU64,
    /// Requests that resolved successfully
    requests_succeeded: AtomicU64,
    /// Requests that failed
    requests_failed: AtomicU64,
    /// Results dropped because their request was no longer tracked
    late_results_discarded: AtomicU64,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport_signal(&self) {
        self.viewport_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn settled(&self) {
        self.settles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stale_refetch(&self) {
        self.stale_refetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_reused(&self) {
        self.requests_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_issued(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_cancelled(&self, count: usize) {
        self.requests_cancelled
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn request_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn late_result_discarded(&self) {
        self.late_results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            viewport_signals: self.viewport_signals.load(Ordering::Relaxed),
            settles: self.settles.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            stale_refetches: self.stale_refetches.load(Ordering::Relaxed),
            requests_reused: self.requests_reused.load(Ordering::Relaxed),
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            requests_cancelled: self.requests_cancelled.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            late_results_discarded: self.late_results_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Immutable copy of [`FetchMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub viewport_signals: u64,
    pub settles: u64,
    pub cache_hits: u64,
    pub stale_refetches: u64,
    pub requests_reused: u64,
    pub requests_issued: u64,
    pub requests_cancelled: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub late_results_discarded: u64,
}

impl MetricsSnapshot {
    /// Fraction of settles served from a fresh cache entry.
    pub fn cache_hit_rate(&self) -> f64 {
        if self.settles == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.settles as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Viewport:")?;
        writeln!(f, "  Signals: {}", self.viewport_signals)?;
        writeln!(f, "  Settles: {}", self.settles)?;
        writeln!(f)?;

        writeln!(f, "Cache:")?;
        writeln!(
            f,
            "  Hits: {} ({:.1}%)",
            self.cache_hits,
            self.cache_hit_rate() * 100.0
        )?;
        writeln!(f, "  Stale refetches: {}", self.stale_refetches)?;
        writeln!(f)?;

        writeln!(f, "Requests:")?;
        writeln!(f, "  Issued: {}", self.requests_issued)?;
        writeln!(f, "  Reused: {}", self.requests_reused)?;
        writeln!(f, "  Cancelled: {}", self.requests_cancelled)?;
        writeln!(f, "  Succeeded: {}", self.requests_succeeded)?;
        writeln!(f, "  Failed: {}", self.requests_failed)?;
        write!(f, "  Late results discarded: {}", self.late_results_discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(FetchMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let metrics = FetchMetrics::new();
        metrics.settled();
        metrics.settled();
        metrics.cache_hit();
        metrics.request_issued();
        metrics.requests_cancelled(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.settles, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.requests_issued, 1);
        assert_eq!(snapshot.requests_cancelled, 3);
        assert!((snapshot.cache_hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_without_settles() {
        assert_eq!(MetricsSnapshot::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let metrics = FetchMetrics::new();
        metrics.request_issued();
        let text = metrics.snapshot().to_string();

        assert!(text.contains("Issued: 1"));
        assert!(text.contains("Late results discarded: 0"));
    }
}
