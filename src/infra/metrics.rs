//! Lock-free metrics for dispatch, enrichment and lifecycle outcomes
//!
//! Uses atomics on the dispatch path so strategy threads never contend.
//! `report()` is the only operation that resets anything (via atomic swap).
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only; do not use them for coordination or logic decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Geocoding latency bucket boundaries (milliseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
pub const METRICS_NUM_BUCKETS: usize = 11;

#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
}

#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

#[inline]
fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile).ceil() as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// How a single address lookup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodeOutcome {
    Resolved,
    NoCandidates,
    Failed,
    TimedOut,
}

/// How a single cue request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOutcome {
    Emitted,
    /// Debugging disabled
    Suppressed,
    /// Platform refused to play
    Failed,
}

pub struct Metrics {
    locations_total: AtomicU64,
    stationaries_total: AtomicU64,
    activities_total: AtomicU64,
    failures_total: AtomicU64,
    events_delivered: AtomicU64,
    /// Location/stationary/activity events discarded because no delegate was set
    events_dropped_no_delegate: AtomicU64,
    failures_dropped_no_delegate: AtomicU64,
    /// Events dropped by the channel delegate (full or closed)
    channel_dropped: AtomicU64,
    geocode_resolved: AtomicU64,
    geocode_empty: AtomicU64,
    geocode_failed: AtomicU64,
    geocode_timed_out: AtomicU64,
    /// Geocode latency histogram (reset on report)
    geocode_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    geocode_latency_sum_ms: AtomicU64,
    geocode_latency_max_ms: AtomicU64,
    geocode_since_report: AtomicU64,
    cues_emitted: AtomicU64,
    cues_suppressed: AtomicU64,
    cues_failed: AtomicU64,
    /// Cue attempts outside the acquired lifetime
    cues_rejected: AtomicU64,
    receivers_registered: AtomicU64,
    receivers_unregistered: AtomicU64,
    /// Receivers still registered when the provider was torn down
    receivers_released_on_destroy: AtomicU64,
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            locations_total: AtomicU64::new(0),
            stationaries_total: AtomicU64::new(0),
            activities_total: AtomicU64::new(0),
            failures_total: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            events_dropped_no_delegate: AtomicU64::new(0),
            failures_dropped_no_delegate: AtomicU64::new(0),
            channel_dropped: AtomicU64::new(0),
            geocode_resolved: AtomicU64::new(0),
            geocode_empty: AtomicU64::new(0),
            geocode_failed: AtomicU64::new(0),
            geocode_timed_out: AtomicU64::new(0),
            geocode_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            geocode_latency_sum_ms: AtomicU64::new(0),
            geocode_latency_max_ms: AtomicU64::new(0),
            geocode_since_report: AtomicU64::new(0),
            cues_emitted: AtomicU64::new(0),
            cues_suppressed: AtomicU64::new(0),
            cues_failed: AtomicU64::new(0),
            cues_rejected: AtomicU64::new(0),
            receivers_registered: AtomicU64::new(0),
            receivers_unregistered: AtomicU64::new(0),
            receivers_released_on_destroy: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_location(&self) {
        self.locations_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_stationary(&self) {
        self.stationaries_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_activity(&self) {
        self.activities_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record whether an event reached a delegate
    #[inline]
    pub fn record_delivery(&self, delivered: bool) {
        if delivered {
            self.events_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.events_dropped_no_delegate.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_failure_dropped(&self) {
        self.failures_dropped_no_delegate.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_channel_dropped(&self) {
        self.channel_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished address lookup and its latency
    #[inline]
    pub fn record_geocode(&self, outcome: GeocodeOutcome, latency_ms: u64) {
        let counter = match outcome {
            GeocodeOutcome::Resolved => &self.geocode_resolved,
            GeocodeOutcome::NoCandidates => &self.geocode_empty,
            GeocodeOutcome::Failed => &self.geocode_failed,
            GeocodeOutcome::TimedOut => &self.geocode_timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.geocode_since_report.fetch_add(1, Ordering::Relaxed);
        self.geocode_latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.geocode_latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.geocode_latency_max_ms, latency_ms);
    }

    #[inline]
    pub fn record_cue(&self, outcome: CueOutcome) {
        let counter = match outcome {
            CueOutcome::Emitted => &self.cues_emitted,
            CueOutcome::Suppressed => &self.cues_suppressed,
            CueOutcome::Failed => &self.cues_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cue_rejected(&self) {
        self.cues_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_receiver_registered(&self) {
        self.receivers_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_receiver_unregistered(&self, on_destroy: bool) {
        self.receivers_unregistered.fetch_add(1, Ordering::Relaxed);
        if on_destroy {
            self.receivers_released_on_destroy.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn events_delivered(&self) -> u64 {
        self.events_delivered.load(Ordering::Relaxed)
    }

    pub fn events_dropped_no_delegate(&self) -> u64 {
        self.events_dropped_no_delegate.load(Ordering::Relaxed)
    }

    pub fn failures_dropped_no_delegate(&self) -> u64 {
        self.failures_dropped_no_delegate.load(Ordering::Relaxed)
    }

    pub fn channel_dropped(&self) -> u64 {
        self.channel_dropped.load(Ordering::Relaxed)
    }

    pub fn cues_emitted(&self) -> u64 {
        self.cues_emitted.load(Ordering::Relaxed)
    }

    pub fn cues_rejected(&self) -> u64 {
        self.cues_rejected.load(Ordering::Relaxed)
    }

    pub fn geocode_timed_out(&self) -> u64 {
        self.geocode_timed_out.load(Ordering::Relaxed)
    }

    pub fn geocode_failed(&self) -> u64 {
        self.geocode_failed.load(Ordering::Relaxed)
    }

    pub fn receivers_released_on_destroy(&self) -> u64 {
        self.receivers_released_on_destroy.load(Ordering::Relaxed)
    }

    /// Calculate and return a summary, then reset the geocode histogram
    pub fn report(&self) -> MetricsSummary {
        let geocode_count = self.geocode_since_report.swap(0, Ordering::Relaxed);
        let geocode_sum = self.geocode_latency_sum_ms.swap(0, Ordering::Relaxed);
        let geocode_max = self.geocode_latency_max_ms.swap(0, Ordering::Relaxed);
        let geocode_buckets = swap_buckets(&self.geocode_latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let geocode_avg = if geocode_count > 0 { geocode_sum / geocode_count } else { 0 };

        MetricsSummary {
            elapsed_secs: elapsed.as_secs_f64(),
            locations_total: self.locations_total.load(Ordering::Relaxed),
            stationaries_total: self.stationaries_total.load(Ordering::Relaxed),
            activities_total: self.activities_total.load(Ordering::Relaxed),
            failures_total: self.failures_total.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_dropped_no_delegate: self.events_dropped_no_delegate.load(Ordering::Relaxed),
            failures_dropped_no_delegate: self.failures_dropped_no_delegate.load(Ordering::Relaxed),
            channel_dropped: self.channel_dropped.load(Ordering::Relaxed),
            geocode_resolved: self.geocode_resolved.load(Ordering::Relaxed),
            geocode_empty: self.geocode_empty.load(Ordering::Relaxed),
            geocode_failed: self.geocode_failed.load(Ordering::Relaxed),
            geocode_timed_out: self.geocode_timed_out.load(Ordering::Relaxed),
            geocode_lat_buckets: geocode_buckets,
            geocode_avg_ms: geocode_avg,
            geocode_max_ms: geocode_max,
            geocode_p95_ms: percentile_from_buckets(&geocode_buckets, 0.95),
            cues_emitted: self.cues_emitted.load(Ordering::Relaxed),
            cues_suppressed: self.cues_suppressed.load(Ordering::Relaxed),
            cues_failed: self.cues_failed.load(Ordering::Relaxed),
            cues_rejected: self.cues_rejected.load(Ordering::Relaxed),
            receivers_registered: self.receivers_registered.load(Ordering::Relaxed),
            receivers_unregistered: self.receivers_unregistered.load(Ordering::Relaxed),
            receivers_released_on_destroy: self
                .receivers_released_on_destroy
                .load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub elapsed_secs: f64,
    pub locations_total: u64,
    pub stationaries_total: u64,
    pub activities_total: u64,
    pub failures_total: u64,
    pub events_delivered: u64,
    pub events_dropped_no_delegate: u64,
    pub failures_dropped_no_delegate: u64,
    pub channel_dropped: u64,
    pub geocode_resolved: u64,
    pub geocode_empty: u64,
    pub geocode_failed: u64,
    pub geocode_timed_out: u64,
    pub geocode_lat_buckets: [u64; METRICS_NUM_BUCKETS],
    pub geocode_avg_ms: u64,
    pub geocode_max_ms: u64,
    pub geocode_p95_ms: u64,
    pub cues_emitted: u64,
    pub cues_suppressed: u64,
    pub cues_failed: u64,
    pub cues_rejected: u64,
    pub receivers_registered: u64,
    pub receivers_unregistered: u64,
    pub receivers_released_on_destroy: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            locations = %self.locations_total,
            stationaries = %self.stationaries_total,
            activities = %self.activities_total,
            failures = %self.failures_total,
            delivered = %self.events_delivered,
            dropped_no_delegate = %self.events_dropped_no_delegate,
            failures_dropped = %self.failures_dropped_no_delegate,
            channel_dropped = %self.channel_dropped,
            geocode_ok = %self.geocode_resolved,
            geocode_empty = %self.geocode_empty,
            geocode_failed = %self.geocode_failed,
            geocode_timeouts = %self.geocode_timed_out,
            geocode_avg_ms = %self.geocode_avg_ms,
            geocode_p95_ms = %self.geocode_p95_ms,
            cues = %self.cues_emitted,
            cues_rejected = %self.cues_rejected,
            receivers_leaked = %self.receivers_released_on_destroy,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10), 0);
        assert_eq!(bucket_index(11), 1);
        assert_eq!(bucket_index(5120), 9);
        assert_eq!(bucket_index(60_000), 10);
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile_from_buckets(&[0; METRICS_NUM_BUCKETS], 0.95), 0);
    }

    #[test]
    fn test_record_delivery() {
        let metrics = Metrics::new();
        metrics.record_delivery(true);
        metrics.record_delivery(false);
        metrics.record_delivery(false);
        assert_eq!(metrics.events_delivered(), 1);
        assert_eq!(metrics.events_dropped_no_delegate(), 2);
    }

    #[test]
    fn test_geocode_report_resets_histogram_only() {
        let metrics = Metrics::new();
        metrics.record_geocode(GeocodeOutcome::Resolved, 15);
        metrics.record_geocode(GeocodeOutcome::TimedOut, 5000);

        let summary = metrics.report();
        assert_eq!(summary.geocode_resolved, 1);
        assert_eq!(summary.geocode_timed_out, 1);
        assert_eq!(summary.geocode_avg_ms, 2507);
        assert_eq!(summary.geocode_max_ms, 5000);
        assert_eq!(summary.geocode_lat_buckets.iter().sum::<u64>(), 2);

        let second = metrics.report();
        assert_eq!(second.geocode_avg_ms, 0);
        assert_eq!(second.geocode_lat_buckets.iter().sum::<u64>(), 0);
        // Monotonic counters survive
        assert_eq!(second.geocode_timed_out, 1);
    }

    #[test]
    fn test_receivers_released_on_destroy() {
        let metrics = Metrics::new();
        metrics.record_receiver_registered();
        metrics.record_receiver_registered();
        metrics.record_receiver_unregistered(false);
        metrics.record_receiver_unregistered(true);

        let summary = metrics.report();
        assert_eq!(summary.receivers_registered, 2);
        assert_eq!(summary.receivers_unregistered, 2);
        assert_eq!(summary.receivers_released_on_destroy, 1);
    }
}
