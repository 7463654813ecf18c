use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{Infraction, InfractionKind};
use crate::engine::error::Error;
use crate::ledger::InfractionLedger;

/// In-memory ledger. Used by tests and as a fallback when no DATABASE_URL is
/// configured; rows are lost on restart, so it is not for production.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Infraction>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InfractionLedger for MemoryLedger {
    async fn append(&self, infraction: &Infraction) -> Result<Uuid, Error> {
        let mut rows = self.rows.lock().expect("ledger lock poisoned");
        rows.push(infraction.clone());
        Ok(infraction.id)
    }

    async fn history(&self, guild_id: i64, user_id: i64) -> Result<Vec<Infraction>, Error> {
        let rows = self.rows.lock().expect("ledger lock poisoned");
        let mut out: Vec<Infraction> = rows
            .iter()
            .filter(|r| r.guild_id == guild_id && r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.issued_at);
        Ok(out)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Infraction>, Error> {
        let rows = self.rows.lock().expect("ledger lock poisoned");
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, Error> {
        let mut rows = self.rows.lock().expect("ledger lock poisoned");
        for row in rows.iter_mut() {
            if row.id == id {
                if !row.active {
                    return Ok(false);
                }
                row.active = false;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn deactivate_active_of_kind(
        &self,
        guild_id: i64,
        user_id: i64,
        kind: InfractionKind,
    ) -> Result<u64, Error> {
        let mut rows = self.rows.lock().expect("ledger lock poisoned");
        let mut changed = 0;
        for row in rows.iter_mut() {
            if row.guild_id == guild_id && row.user_id == user_id && row.kind == kind && row.active
            {
                row.active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn find_by_source_event(&self, event_id: Uuid) -> Result<Option<Infraction>, Error> {
        let rows = self.rows.lock().expect("ledger lock poisoned");
        Ok(rows
            .iter()
            .find(|r| r.source_event_id == Some(event_id))
            .cloned())
    }

    async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Infraction>, Error> {
        let rows = self.rows.lock().expect("ledger lock poisoned");
        let mut out: Vec<Infraction> = rows
            .iter()
            .filter(|r| r.active && r.expires_at.map_or(false, |e| e <= now))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.expires_at);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Issuer;
    use chrono::Duration;

    fn infraction(kind: InfractionKind, offset_secs: i64) -> Infraction {
        let now = Utc::now();
        Infraction {
            id: Uuid::new_v4(),
            guild_id: 1,
            user_id: 2,
            kind,
            reason: "test".into(),
            issued_by: Issuer::System,
            source_event_id: None,
            issued_at: now + Duration::seconds(offset_secs),
            expires_at: None,
            active: true,
        }
    }

    #[tokio::test]
    async fn history_is_chronological_and_reads_own_writes() {
        let ledger = MemoryLedger::new();
        let second = infraction(InfractionKind::Mute, 10);
        let first = infraction(InfractionKind::Warn, 0);
        ledger.append(&second).await.unwrap();
        ledger.append(&first).await.unwrap();

        let history = ledger.history(1, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, InfractionKind::Warn);
        assert_eq!(history[1].kind, InfractionKind::Mute);
    }

    #[tokio::test]
    async fn deactivate_reports_whether_row_was_active() {
        let ledger = MemoryLedger::new();
        let inf = infraction(InfractionKind::Mute, 0);
        ledger.append(&inf).await.unwrap();

        assert!(ledger.deactivate(inf.id).await.unwrap());
        assert!(!ledger.deactivate(inf.id).await.unwrap());
    }

    #[tokio::test]
    async fn supersede_only_touches_matching_kind() {
        let ledger = MemoryLedger::new();
        let warn = infraction(InfractionKind::Warn, 0);
        let mute = infraction(InfractionKind::Mute, 1);
        ledger.append(&warn).await.unwrap();
        ledger.append(&mute).await.unwrap();

        let changed = ledger
            .deactivate_active_of_kind(1, 2, InfractionKind::Mute)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let history = ledger.history(1, 2).await.unwrap();
        assert!(history.iter().any(|r| r.kind == InfractionKind::Warn && r.active));
        assert!(history.iter().any(|r| r.kind == InfractionKind::Mute && !r.active));
    }

    #[tokio::test]
    async fn expired_active_only_returns_past_due_rows() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();

        let mut due = infraction(InfractionKind::Mute, -100);
        due.expires_at = Some(now - Duration::seconds(5));
        let mut pending = infraction(InfractionKind::Mute, -100);
        pending.expires_at = Some(now + Duration::hours(1));
        ledger.append(&due).await.unwrap();
        ledger.append(&pending).await.unwrap();

        let expired = ledger.expired_active(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, due.id);
    }
}
