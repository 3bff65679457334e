//! Progress tracking

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Counters for one scheduler run. Lock-free; shared by all pool workers.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    total: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// A worker picked up an item.
    pub fn started(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    /// A worker finished an item; `ok` is false when it had to be replaced
    /// by a failure result.
    pub fn finished(&self, ok: bool) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Highest number of items ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn log_summary(&self) {
        info!(
            total = self.total(),
            completed = self.completed(),
            failed = self.failed(),
            peak_in_flight = self.peak_in_flight(),
            "scheduler run finished"
        );
    }
}
