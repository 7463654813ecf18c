use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::InfractionKind;
use crate::events::ModKey;

/// A sanction the ledger refused to record after retries ran out. Kept in
/// memory and surfaced through logs: a ledger outage cannot durably record
/// its own dead letters, so the queue exists for operator drain/replay.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub guild_id: i64,
    pub user_id: i64,
    pub kind: InfractionKind,
    pub reason: String,
    pub error: String,
    pub parked_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct DeadLetterQueue {
    entries: Mutex<Vec<DeadLetter>>,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn park(&self, key: ModKey, kind: InfractionKind, reason: String, error: String) {
        let mut entries = self.entries.lock().expect("dead letter lock poisoned");
        entries.push(DeadLetter {
            guild_id: key.guild_id,
            user_id: key.user_id,
            kind,
            reason,
            error,
            parked_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("dead letter lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take everything queued, e.g. for operator replay.
    pub fn drain(&self) -> Vec<DeadLetter> {
        let mut entries = self.entries.lock().expect("dead letter lock poisoned");
        std::mem::take(&mut *entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn park_and_drain() {
        let queue = DeadLetterQueue::new();
        assert!(queue.is_empty());

        queue.park(
            ModKey::new(1, 2),
            InfractionKind::Warn,
            "spam".into(),
            "db down".into(),
        );
        assert_eq!(queue.len(), 1);

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].guild_id, 1);
        assert!(queue.is_empty());
    }
}
