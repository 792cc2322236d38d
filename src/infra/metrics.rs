//! Lock-free counters for sheet reads and RSVP submissions
//!
//! All atomics are Relaxed. They feed the periodic report and nothing else;
//! do not branch on them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Sentinel for "no successful read yet"
const HEADCOUNT_UNKNOWN: u64 = u64::MAX;

/// Update an atomic max value using compare-and-swap loop
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

pub struct Metrics {
    /// Sheet reads that produced a snapshot (monotonic)
    fetches_total: AtomicU64,
    /// Sheet reads that failed (monotonic)
    fetch_failures_total: AtomicU64,
    /// Reads since last report (reset on report)
    fetches_since_report: AtomicU64,
    /// Sum of read latencies (reset on report)
    fetch_latency_sum_us: AtomicU64,
    /// Max read latency (reset on report)
    fetch_latency_max_us: AtomicU64,
    /// Headcount from the latest successful read
    last_headcount: AtomicU64,
    /// Submissions handed to the form endpoint (monotonic)
    submissions_total: AtomicU64,
    /// Submissions that failed validation or delivery (monotonic)
    submission_failures_total: AtomicU64,
    last_report: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            fetches_total: AtomicU64::new(0),
            fetch_failures_total: AtomicU64::new(0),
            fetches_since_report: AtomicU64::new(0),
            fetch_latency_sum_us: AtomicU64::new(0),
            fetch_latency_max_us: AtomicU64::new(0),
            last_headcount: AtomicU64::new(HEADCOUNT_UNKNOWN),
            submissions_total: AtomicU64::new(0),
            submission_failures_total: AtomicU64::new(0),
            last_report: parking_lot::Mutex::new(Instant::now()),
        }
    }

    fn record_fetch_latency(&self, latency_us: u64) {
        self.fetches_since_report.fetch_add(1, Ordering::Relaxed);
        self.fetch_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.fetch_latency_max_us, latency_us);
    }

    pub fn record_fetch(&self, latency_us: u64, headcount: u32) {
        self.fetches_total.fetch_add(1, Ordering::Relaxed);
        self.last_headcount.store(u64::from(headcount), Ordering::Relaxed);
        self.record_fetch_latency(latency_us);
    }

    /// A failed read makes the headcount unknown, like the views show it
    pub fn record_fetch_failure(&self, latency_us: u64) {
        self.fetch_failures_total.fetch_add(1, Ordering::Relaxed);
        self.last_headcount.store(HEADCOUNT_UNKNOWN, Ordering::Relaxed);
        self.record_fetch_latency(latency_us);
    }

    pub fn record_submission(&self) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_submission_failure(&self) {
        self.submission_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_headcount(&self) -> Option<u32> {
        match self.last_headcount.load(Ordering::Relaxed) {
            HEADCOUNT_UNKNOWN => None,
            n => u32::try_from(n).ok(),
        }
    }

    /// Snapshot counters and reset the per-interval ones
    pub fn report(&self) -> MetricsSummary {
        let elapsed_secs = {
            let mut last = self.last_report.lock();
            let secs = last.elapsed().as_secs_f64();
            *last = Instant::now();
            secs
        };

        let fetches = self.fetches_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.fetch_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.fetch_latency_max_us.swap(0, Ordering::Relaxed);

        MetricsSummary {
            fetches_total: self.fetches_total.load(Ordering::Relaxed),
            fetch_failures_total: self.fetch_failures_total.load(Ordering::Relaxed),
            fetches_per_min: if elapsed_secs > 0.0 { fetches as f64 * 60.0 / elapsed_secs } else { 0.0 },
            avg_fetch_latency_us: if fetches > 0 { latency_sum / fetches } else { 0 },
            max_fetch_latency_us: latency_max,
            headcount: self.last_headcount(),
            submissions_total: self.submissions_total.load(Ordering::Relaxed),
            submission_failures_total: self.submission_failures_total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSummary {
    pub fetches_total: u64,
    pub fetch_failures_total: u64,
    pub fetches_per_min: f64,
    pub avg_fetch_latency_us: u64,
    pub max_fetch_latency_us: u64,
    pub headcount: Option<u32>,
    pub submissions_total: u64,
    pub submission_failures_total: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            fetches_total = %self.fetches_total,
            fetch_failures_total = %self.fetch_failures_total,
            fetches_per_min = %format!("{:.1}", self.fetches_per_min),
            avg_fetch_latency_us = %self.avg_fetch_latency_us,
            max_fetch_latency_us = %self.max_fetch_latency_us,
            headcount = ?self.headcount,
            submissions_total = %self.submissions_total,
            submission_failures_total = %self.submission_failures_total,
            "metrics"
        );
    }
}
