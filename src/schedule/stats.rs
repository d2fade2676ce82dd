//! Per-run counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::download::PersistOutcome;

/// Statistics from one mirror run.
///
/// Uses atomic counters so concurrent units can record outcomes without
/// locking. Failures are only counted here, never propagated.
#[derive(Debug, Default)]
pub struct RunStats {
    fetched: AtomicUsize,
    fresh: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
    pages: AtomicUsize,
    bytes: AtomicU64,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one fetch-and-persist task.
    pub fn record(&self, outcome: PersistOutcome) {
        match outcome {
            PersistOutcome::Fresh => {
                self.fresh.fetch_add(1, Ordering::SeqCst);
            }
            PersistOutcome::Fetched { bytes } => {
                self.fetched.fetch_add(1, Ordering::SeqCst);
                self.bytes.fetch_add(bytes, Ordering::SeqCst);
            }
            PersistOutcome::Failed => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
            PersistOutcome::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Records one rendered HTML page.
    pub fn record_page(&self) {
        self.pages.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a failure that happened outside a fetch-and-persist task.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns the number of resources downloaded.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }

    /// Returns the number of resources skipped as up to date.
    #[must_use]
    pub fn fresh(&self) -> usize {
        self.fresh.load(Ordering::SeqCst)
    }

    /// Returns the number of failed tasks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of tasks refused during shutdown.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the number of HTML pages written.
    #[must_use]
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    /// Returns the total bytes downloaded.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }
}
