use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::db::models::{Infraction, InfractionKind};
use crate::engine::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Warn,
    Mute,
    Unmute,
    Kick,
    Ban,
    Unban,
}

/// Platform-level effect of a sanction, handed to the connector. The ledger
/// record stays authoritative whether or not the platform call sticks.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformAction {
    pub guild_id: i64,
    pub user_id: i64,
    pub kind: ActionKind,
    pub duration: Option<Duration>,
    pub reason: String,
}

impl PlatformAction {
    pub fn for_infraction(inf: &Infraction) -> Self {
        let kind = match inf.kind {
            InfractionKind::Warn => ActionKind::Warn,
            InfractionKind::Mute => ActionKind::Mute,
            InfractionKind::Kick => ActionKind::Kick,
            InfractionKind::Ban => ActionKind::Ban,
        };
        Self {
            guild_id: inf.guild_id,
            user_id: inf.user_id,
            kind,
            duration: inf
                .expires_at
                .map(|e| (e - inf.issued_at).to_std().unwrap_or_default()),
            reason: inf.reason.clone(),
        }
    }

    /// The action that undoes an infraction, if it has one (expiry or manual
    /// reversal). Warns and kicks have nothing to undo.
    pub fn reversal(inf: &Infraction, reason: &str) -> Option<Self> {
        let kind = match inf.kind {
            InfractionKind::Mute => ActionKind::Unmute,
            InfractionKind::Ban => ActionKind::Unban,
            InfractionKind::Warn | InfractionKind::Kick => return None,
        };
        Some(Self {
            guild_id: inf.guild_id,
            user_id: inf.user_id,
            kind,
            duration: None,
            reason: reason.to_string(),
        })
    }
}

/// Outbound connector applying sanctions on the platform. Fire-and-forget
/// from the engine's point of view; the executor retries a bounded number
/// of times and then surfaces the failure for manual follow-up.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn apply(&self, action: &PlatformAction) -> Result<(), Error>;
}

/// Default sink: logs the action and succeeds. Stands in for the platform
/// connector in local runs and tests.
#[derive(Default)]
pub struct LoggingSink;

#[async_trait]
impl ActionSink for LoggingSink {
    async fn apply(&self, action: &PlatformAction) -> Result<(), Error> {
        info!(
            guild_id = action.guild_id,
            user_id = action.user_id,
            action = ?action.kind,
            duration_secs = action.duration.map(|d| d.as_secs()),
            reason = %action.reason,
            "platform action emitted"
        );
        Ok(())
    }
}
