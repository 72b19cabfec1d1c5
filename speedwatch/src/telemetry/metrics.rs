//! Atomic counters for limit resolution.

use std::sync::atomic::{AtomicU64, Ordering};

use super::snapshot::TelemetrySnapshot;

/// Counters shared between the resolver and whoever reports on it.
///
/// All updates use relaxed ordering; the counters are independent and only
/// read for display.
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    lookups: AtomicU64,
    throttled: AtomicU64,
    api_calls: AtomicU64,
    api_successes: AtomicU64,
    api_failures: AtomicU64,
    timeouts: AtomicU64,
    exact_hits: AtomicU64,
    nearby_hits: AtomicU64,
    unknown: AtomicU64,
}

impl ResolverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_success(&self) {
        self.api_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_failure(&self) {
        self.api_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A request that hit the resolver timeout. Also counts as a failure.
    pub fn timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        self.api_failure();
    }

    /// A geo cache hit; `nearby` if it came from a neighbouring cell.
    pub fn cache_hit(&self, nearby: bool) {
        if nearby {
            self.nearby_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.exact_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn unknown(&self) {
        self.unknown.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_successes: self.api_successes.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            nearby_hits: self.nearby_hits.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
        }
    }
}
