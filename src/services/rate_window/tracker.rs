use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::events::ModKey;
use crate::services::ViolationSignal;

struct Window {
    events: VecDeque<Instant>,
    last_seen: Instant,
}

/// Sliding-window event counter per `(guild, user)` key for spam-burst
/// detection. Keys are per guild, so activity on one server can never
/// trip a burst on another.
pub struct RateWindowTracker {
    windows: DashMap<ModKey, Window>,
    threshold: u32,
    window: Duration,
}

impl RateWindowTracker {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            threshold,
            window,
        }
    }

    /// Record one event and report a burst if the count crossed the
    /// threshold. The window is drained on fire so the burst signals exactly
    /// once at the crossing event, not on every event after it.
    pub fn record(&self, key: ModKey) -> Option<ViolationSignal> {
        self.record_at(key, Instant::now())
    }

    pub fn record_at(&self, key: ModKey, now: Instant) -> Option<ViolationSignal> {
        let mut entry = self.windows.entry(key).or_insert_with(|| Window {
            events: VecDeque::new(),
            last_seen: now,
        });
        entry.last_seen = now;

        // Prune timestamps that slid out of the window
        while let Some(front) = entry.events.front() {
            if now.duration_since(*front) > self.window {
                entry.events.pop_front();
            } else {
                break;
            }
        }

        entry.events.push_back(now);

        let count = entry.events.len() as u32;
        if count >= self.threshold {
            entry.events.clear();
            Some(ViolationSignal::SpamBurst {
                count,
                window: self.window,
            })
        } else {
            None
        }
    }

    /// Drop windows idle for 2x the window length to bound memory under
    /// user churn.
    pub fn evict_idle(&self) {
        self.evict_idle_at(Instant::now());
    }

    pub fn evict_idle_at(&self, now: Instant) {
        let idle_after = self.window * 2;
        self.windows
            .retain(|_, w| now.duration_since(w.last_seen) <= idle_after);
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
