mod memory;
mod pg;

pub use memory::MemoryLedger;
pub use pg::PgLedger;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::models::{Infraction, InfractionKind};
use crate::engine::error::Error;

/// Durable, append-only record of every sanction. The ledger is the source
/// of truth; the hot-state cache is only a derived copy. Appends must be
/// durable before they return, and queries must reflect every acknowledged
/// append for the same key.
#[async_trait]
pub trait InfractionLedger: Send + Sync {
    async fn append(&self, infraction: &Infraction) -> Result<Uuid, Error>;

    /// Chronological (oldest-first) history for a `(guild, user)` key.
    async fn history(&self, guild_id: i64, user_id: i64) -> Result<Vec<Infraction>, Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Infraction>, Error>;

    /// Returns false when the row was already inactive.
    async fn deactivate(&self, id: Uuid) -> Result<bool, Error>;

    /// Supersede: deactivate every active sanction of `kind` for the key.
    async fn deactivate_active_of_kind(
        &self,
        guild_id: i64,
        user_id: i64,
        kind: InfractionKind,
    ) -> Result<u64, Error>;

    /// Idempotency probe: the sanction already recorded for a source event.
    async fn find_by_source_event(&self, event_id: Uuid) -> Result<Option<Infraction>, Error>;

    /// Active rows whose `expires_at` has passed; scanned by the expiry
    /// sweeper, including once at startup for crash recovery.
    async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Infraction>, Error>;
}
