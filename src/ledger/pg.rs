use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Infraction, InfractionKind};
use crate::db::queries::infraction as queries;
use crate::engine::error::Error;
use crate::ledger::InfractionLedger;

/// Postgres-backed ledger. Durability comes from the database: the INSERT
/// has committed before `append` returns.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InfractionLedger for PgLedger {
    async fn append(&self, infraction: &Infraction) -> Result<Uuid, Error> {
        queries::insert(&self.pool, infraction).await
    }

    async fn history(&self, guild_id: i64, user_id: i64) -> Result<Vec<Infraction>, Error> {
        queries::history(&self.pool, guild_id, user_id).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Infraction>, Error> {
        queries::find(&self.pool, id).await
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, Error> {
        queries::deactivate(&self.pool, id).await
    }

    async fn deactivate_active_of_kind(
        &self,
        guild_id: i64,
        user_id: i64,
        kind: InfractionKind,
    ) -> Result<u64, Error> {
        queries::deactivate_active_of_kind(&self.pool, guild_id, user_id, kind.as_str()).await
    }

    async fn find_by_source_event(&self, event_id: Uuid) -> Result<Option<Infraction>, Error> {
        queries::find_by_source_event(&self.pool, event_id).await
    }

    async fn expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Infraction>, Error> {
        queries::expired_active(&self.pool, now).await
    }
}
