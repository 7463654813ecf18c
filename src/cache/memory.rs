use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::cache::{StateCache, UserModerationState};
use crate::engine::error::Error;
use crate::events::ModKey;

struct Entry {
    state: UserModerationState,
    stored_at: Instant,
}

/// In-process TTL cache of derived moderation state.
pub struct InMemoryStateCache {
    entries: DashMap<ModKey, Entry>,
    ttl: Duration,
}

impl InMemoryStateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StateCache for InMemoryStateCache {
    async fn get(&self, key: ModKey) -> Result<Option<UserModerationState>, Error> {
        if let Some(entry) = self.entries.get(&key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Ok(Some(entry.state.clone()));
            }
        }
        // Stale entries are dropped so they cannot be served later
        self.entries
            .remove_if(&key, |_, e| e.stored_at.elapsed() >= self.ttl);
        Ok(None)
    }

    async fn put(&self, key: ModKey, state: UserModerationState) -> Result<(), Error> {
        self.entries.insert(
            key,
            Entry {
                state,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn invalidate(&self, key: ModKey) -> Result<(), Error> {
        self.entries.remove(&key);
        Ok(())
    }
}
