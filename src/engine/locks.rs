use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::events::ModKey;

struct LockEntry {
    lock: Arc<Mutex<()>>,
    last_used: Instant,
}

/// Per-key mutual exclusion for the decide/record section. One guild/user
/// pair is processed at a time; distinct keys proceed in parallel.
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<ModKey, LockEntry>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: ModKey) -> OwnedMutexGuard<()> {
        // Clone the Arc inside the entry block so the map shard is not held
        // while waiting on the lock.
        let lock = {
            let mut entry = self.locks.entry(key).or_insert_with(|| LockEntry {
                lock: Arc::new(Mutex::new(())),
                last_used: Instant::now(),
            });
            entry.last_used = Instant::now();
            entry.lock.clone()
        };
        lock.lock_owned().await
    }

    /// Drop locks idle longer than `idle`. A lock someone still holds (or
    /// waits on) has outstanding Arc clones and is kept.
    pub fn reap_idle(&self, idle: Duration) {
        let cutoff = Instant::now();
        self.locks.retain(|_, entry| {
            Arc::strong_count(&entry.lock) > 1
                || cutoff.duration_since(entry.last_used) < idle
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }
}
