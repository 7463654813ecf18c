use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::error::Error;

/// Sanction kinds in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InfractionKind {
    Warn,
    Mute,
    Kick,
    Ban,
}

impl InfractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfractionKind::Warn => "warn",
            InfractionKind::Mute => "mute",
            InfractionKind::Kick => "kick",
            InfractionKind::Ban => "ban",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warn" => Some(InfractionKind::Warn),
            "mute" => Some(InfractionKind::Mute),
            "kick" => Some(InfractionKind::Kick),
            "ban" => Some(InfractionKind::Ban),
            _ => None,
        }
    }

    /// Severity ordering: warn < mute < kick < ban.
    pub fn severity(&self) -> u8 {
        match self {
            InfractionKind::Warn => 0,
            InfractionKind::Mute => 1,
            InfractionKind::Kick => 2,
            InfractionKind::Ban => 3,
        }
    }
}

/// Who issued a sanction: the engine itself or a human moderator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Issuer {
    System,
    Moderator(i64),
}

impl Issuer {
    pub fn moderator_id(&self) -> Option<i64> {
        match self {
            Issuer::System => None,
            Issuer::Moderator(id) => Some(*id),
        }
    }

    pub fn from_moderator_id(id: Option<i64>) -> Self {
        match id {
            Some(id) => Issuer::Moderator(id),
            None => Issuer::System,
        }
    }
}

/// One row of the append-only infraction ledger. Rows are never deleted;
/// reversal and expiry only flip `active`.
#[derive(Debug, Clone)]
pub struct Infraction {
    pub id: Uuid,
    pub guild_id: i64,
    pub user_id: i64,
    pub kind: InfractionKind,
    pub reason: String,
    pub issued_by: Issuer,
    /// Event that triggered this sanction; used to detect replayed decisions.
    pub source_event_id: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl Infraction {
    /// Active and not past its expiry. A mute whose expiry elapsed but which
    /// the sweeper has not yet deactivated must not count as in force.
    pub fn in_force(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.map_or(true, |e| e > now)
    }
}

/// Raw database row; `kind` is TEXT and converted on the way out.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InfractionRow {
    pub id: Uuid,
    pub guild_id: i64,
    pub user_id: i64,
    pub kind: String,
    pub reason: String,
    pub moderator_id: Option<i64>,
    pub source_event_id: Option<Uuid>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl TryFrom<InfractionRow> for Infraction {
    type Error = Error;

    fn try_from(row: InfractionRow) -> Result<Self, Error> {
        let kind = InfractionKind::parse(&row.kind)
            .ok_or_else(|| Error::CorruptRecord(format!("unknown kind '{}'", row.kind)))?;
        Ok(Infraction {
            id: row.id,
            guild_id: row.guild_id,
            user_id: row.user_id,
            kind,
            reason: row.reason,
            issued_by: Issuer::from_moderator_id(row.moderator_id),
            source_event_id: row.source_event_id,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            active: row.active,
        })
    }
}
