mod normalizer;

pub use normalizer::normalize;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Moderation scope: all state is tracked per user per guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModKey {
    pub guild_id: i64,
    pub user_id: i64,
}

impl ModKey {
    pub fn new(guild_id: i64, user_id: i64) -> Self {
        Self { guild_id, user_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Join,
    Edit,
    Command,
}

impl EventKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" => Some(EventKind::Message),
            "join" => Some(EventKind::Join),
            "edit" => Some(EventKind::Edit),
            "command" => Some(EventKind::Command),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Join => "join",
            EventKind::Edit => "edit",
            EventKind::Command => "command",
        }
    }
}

/// Raw inbound payload as delivered by the platform connector.
/// Every field is optional; `normalize` decides what is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    pub user_id: Option<i64>,
    pub guild_id: Option<i64>,
    pub channel_id: Option<i64>,
    pub kind: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub content: Option<String>,
    pub event_id: Option<Uuid>,
}

/// Uniform activity record consumed by the detectors. Immutable once built.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub event_id: Uuid,
    pub user_id: i64,
    pub guild_id: i64,
    pub channel_id: Option<i64>,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
}

impl ActivityEvent {
    pub fn key(&self) -> ModKey {
        ModKey::new(self.guild_id, self.user_id)
    }
}
