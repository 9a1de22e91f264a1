//! Run statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::results::CombinedResult;

/// Atomic counters updated by workers as names complete.
pub struct RunStats {
    names: AtomicU64,
    plain_failures: AtomicU64,
    tor_failures: AtomicU64,
    /// Total bytes of captured pages.
    page_bytes: AtomicU64,
    started: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            names: AtomicU64::new(0),
            plain_failures: AtomicU64::new(0),
            tor_failures: AtomicU64::new(0),
            page_bytes: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record(&self, result: &CombinedResult) {
        self.names.fetch_add(1, Ordering::Relaxed);
        if result.plain.is_failure() {
            self.plain_failures.fetch_add(1, Ordering::Relaxed);
        }
        if result.tor.is_failure() {
            self.tor_failures.fetch_add(1, Ordering::Relaxed);
        }
        let captured = result.tor.page.as_ref().map_or(0, String::len)
            + result.plain.page.as_ref().map_or(0, String::len);
        self.page_bytes.fetch_add(captured as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            names: self.names.load(Ordering::Relaxed),
            plain_failures: self.plain_failures.load(Ordering::Relaxed),
            tor_failures: self.tor_failures.load(Ordering::Relaxed),
            page_bytes: self.page_bytes.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub names: u64,
    pub plain_failures: u64,
    pub tor_failures: u64,
    pub page_bytes: u64,
    pub elapsed_secs: f64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "names={} plain_failed={} tor_failed={} page_bytes={} elapsed={:.1}s",
            self.names, self.plain_failures, self.tor_failures, self.page_bytes, self.elapsed_secs
        )
    }
}
