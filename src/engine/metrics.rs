use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-local observability counters. Cheap to bump from the hot path;
/// read as a snapshot for logs or an operator endpoint.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub events_ingested: AtomicU64,
    pub events_dropped: AtomicU64,
    pub scorer_timeouts: AtomicU64,
    pub scorer_failures: AtomicU64,
    pub spam_violations: AtomicU64,
    pub toxicity_violations: AtomicU64,
    pub sanctions_issued: AtomicU64,
    pub duplicate_decisions: AtomicU64,
    pub dead_letters: AtomicU64,
    pub cache_invalidations: AtomicU64,
    pub sink_failures: AtomicU64,
    pub expiries_fired: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub events_ingested: u64,
    pub events_dropped: u64,
    pub scorer_timeouts: u64,
    pub scorer_failures: u64,
    pub spam_violations: u64,
    pub toxicity_violations: u64,
    pub sanctions_issued: u64,
    pub duplicate_decisions: u64,
    pub dead_letters: u64,
    pub cache_invalidations: u64,
    pub sink_failures: u64,
    pub expiries_fired: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            scorer_timeouts: self.scorer_timeouts.load(Ordering::Relaxed),
            scorer_failures: self.scorer_failures.load(Ordering::Relaxed),
            spam_violations: self.spam_violations.load(Ordering::Relaxed),
            toxicity_violations: self.toxicity_violations.load(Ordering::Relaxed),
            sanctions_issued: self.sanctions_issued.load(Ordering::Relaxed),
            duplicate_decisions: self.duplicate_decisions.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
            cache_invalidations: self.cache_invalidations.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            expiries_fired: self.expiries_fired.load(Ordering::Relaxed),
        }
    }
}

pub(crate) fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
