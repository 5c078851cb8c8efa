// ═══════════════════════════════════════════════════════════════
// RUN STATISTICS - what happened during this pass, in numbers
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters shared by every collector task and the aggregator.
// One pass, one summary line at the end. Lock-free because the
// collectors bump them from separate tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Serialized into the final log line of a run.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub index_pages_fetched: u64,
    pub index_pages_failed: u64,
    pub candidates_discovered: u64,
    pub detail_pages_fetched: u64,
    pub detail_pages_failed: u64,
    pub dropped_undated: u64,
    pub stamped_now: u64,
    pub source_failures: u64,
    pub stale: u64,
    pub duplicates: u64,
    pub notified: u64,
    pub elapsed_ms: u64,
}

pub struct RunStats {
    index_pages_fetched: AtomicU64,
    index_pages_failed: AtomicU64,
    candidates_discovered: AtomicU64,
    detail_pages_fetched: AtomicU64,
    detail_pages_failed: AtomicU64,
    dropped_undated: AtomicU64,
    stamped_now: AtomicU64,
    source_failures: AtomicU64,
    stale: AtomicU64,
    duplicates: AtomicU64,
    notified: AtomicU64,
    start_time: Instant,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            index_pages_fetched: AtomicU64::new(0),
            index_pages_failed: AtomicU64::new(0),
            candidates_discovered: AtomicU64::new(0),
            detail_pages_fetched: AtomicU64::new(0),
            detail_pages_failed: AtomicU64::new(0),
            dropped_undated: AtomicU64::new(0),
            stamped_now: AtomicU64::new(0),
            source_failures: AtomicU64::new(0),
            stale: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            notified: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_index_page(&self, ok: bool) {
        if ok {
            self.index_pages_fetched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.index_pages_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_detail_page(&self, ok: bool) {
        if ok {
            self.detail_pages_fetched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.detail_pages_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_candidates(&self, n: usize) {
        self.candidates_discovered.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_undated(&self) {
        self.dropped_undated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stamped_now(&self) {
        self.stamped_now.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_source_failure(&self) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_notified(&self, n: usize) {
        self.notified.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            index_pages_fetched: self.index_pages_fetched.load(Ordering::Relaxed),
            index_pages_failed: self.index_pages_failed.load(Ordering::Relaxed),
            candidates_discovered: self.candidates_discovered.load(Ordering::Relaxed),
            detail_pages_fetched: self.detail_pages_fetched.load(Ordering::Relaxed),
            detail_pages_failed: self.detail_pages_failed.load(Ordering::Relaxed),
            dropped_undated: self.dropped_undated.load(Ordering::Relaxed),
            stamped_now: self.stamped_now.load(Ordering::Relaxed),
            source_failures: self.source_failures.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }

    /// The snapshot as a single JSON string, for the end-of-run log line.
    pub fn summary_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
