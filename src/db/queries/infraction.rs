use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Infraction, InfractionRow};
use crate::engine::error::Error;

pub async fn insert(pool: &PgPool, inf: &Infraction) -> Result<Uuid, Error> {
    sqlx::query(
        r#"
        INSERT INTO infractions
            (id, guild_id, user_id, kind, reason, moderator_id, source_event_id, issued_at, expires_at, active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(inf.id)
    .bind(inf.guild_id)
    .bind(inf.user_id)
    .bind(inf.kind.as_str())
    .bind(&inf.reason)
    .bind(inf.issued_by.moderator_id())
    .bind(inf.source_event_id)
    .bind(inf.issued_at)
    .bind(inf.expires_at)
    .bind(inf.active)
    .execute(pool)
    .await?;

    Ok(inf.id)
}

/// Full history for a key, oldest first.
pub async fn history(pool: &PgPool, guild_id: i64, user_id: i64) -> Result<Vec<Infraction>, Error> {
    let rows = sqlx::query_as::<_, InfractionRow>(
        r#"
        SELECT * FROM infractions
        WHERE guild_id = $1 AND user_id = $2
        ORDER BY issued_at ASC
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Infraction::try_from).collect()
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Infraction>, Error> {
    let row = sqlx::query_as::<_, InfractionRow>("SELECT * FROM infractions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Infraction::try_from).transpose()
}

/// Flip a row inactive. Returns false if it was already inactive, which lets
/// the expiry sweeper and manual reversal race safely: only one side wins.
pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, Error> {
    let result = sqlx::query("UPDATE infractions SET active = FALSE WHERE id = $1 AND active")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deactivate any active sanction of the given kind for a key, so a new
/// mute/ban supersedes the prior one.
pub async fn deactivate_active_of_kind(
    pool: &PgPool,
    guild_id: i64,
    user_id: i64,
    kind: &str,
) -> Result<u64, Error> {
    let result = sqlx::query(
        r#"
        UPDATE infractions
        SET active = FALSE
        WHERE guild_id = $1 AND user_id = $2 AND kind = $3 AND active
        "#,
    )
    .bind(guild_id)
    .bind(user_id)
    .bind(kind)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn find_by_source_event(
    pool: &PgPool,
    source_event_id: Uuid,
) -> Result<Option<Infraction>, Error> {
    let row = sqlx::query_as::<_, InfractionRow>(
        r#"
        SELECT * FROM infractions
        WHERE source_event_id = $1
        ORDER BY issued_at ASC
        LIMIT 1
        "#,
    )
    .bind(source_event_id)
    .fetch_optional(pool)
    .await?;

    row.map(Infraction::try_from).transpose()
}

/// Active rows whose expiry has passed, due for the sweeper.
pub async fn expired_active(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<Infraction>, Error> {
    let rows = sqlx::query_as::<_, InfractionRow>(
        r#"
        SELECT * FROM infractions
        WHERE active AND expires_at IS NOT NULL AND expires_at <= $1
        ORDER BY expires_at ASC
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Infraction::try_from).collect()
}
