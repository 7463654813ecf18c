use chrono::{DateTime, Utc};

use crate::db::models::{Infraction, InfractionKind};
use crate::events::ModKey;

/// Derived per-key moderation state, rebuilt deterministically from the
/// infraction history. This is the cached value; on any doubt the ledger
/// wins and the entry is rebuilt.
#[derive(Debug, Clone)]
pub struct UserModerationState {
    pub guild_id: i64,
    pub user_id: i64,
    /// Cumulative warnings, never reset.
    pub warn_count: u32,
    /// Total mutes ever issued; the exponent for mute backoff.
    pub mute_count: u32,
    pub active_mute: Option<Infraction>,
    pub active_ban: Option<Infraction>,
    /// Issue times of every kick, filtered against the lookback at decision
    /// time.
    pub kicks: Vec<DateTime<Utc>>,
    pub last_infraction_at: Option<DateTime<Utc>>,
}

impl UserModerationState {
    pub fn empty(key: ModKey) -> Self {
        Self {
            guild_id: key.guild_id,
            user_id: key.user_id,
            warn_count: 0,
            mute_count: 0,
            active_mute: None,
            active_ban: None,
            kicks: Vec::new(),
            last_infraction_at: None,
        }
    }

    /// Rebuild from a chronological history.
    pub fn from_history(key: ModKey, history: &[Infraction], now: DateTime<Utc>) -> Self {
        let mut state = Self::empty(key);
        for inf in history {
            state.apply(inf);
        }
        // A row may still be flagged active while past its expiry; it must
        // not count as in force.
        if state.active_mute.as_ref().map_or(false, |m| !m.in_force(now)) {
            state.active_mute = None;
        }
        if state.active_ban.as_ref().map_or(false, |b| !b.in_force(now)) {
            state.active_ban = None;
        }
        state
    }

    /// Incremental write-through update for a newly applied infraction.
    pub fn apply(&mut self, inf: &Infraction) {
        match inf.kind {
            InfractionKind::Warn => self.warn_count += 1,
            InfractionKind::Mute => {
                self.mute_count += 1;
                if inf.active {
                    self.active_mute = Some(inf.clone());
                }
            }
            InfractionKind::Kick => self.kicks.push(inf.issued_at),
            InfractionKind::Ban => {
                if inf.active {
                    self.active_ban = Some(inf.clone());
                }
            }
        }
        self.last_infraction_at = Some(inf.issued_at);
    }

    /// The mute currently in force, if any.
    pub fn mute_in_force(&self, now: DateTime<Utc>) -> Option<&Infraction> {
        self.active_mute.as_ref().filter(|m| m.in_force(now))
    }

    pub fn ban_in_force(&self, now: DateTime<Utc>) -> Option<&Infraction> {
        self.active_ban.as_ref().filter(|b| b.in_force(now))
    }

    pub fn kicks_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.kicks.iter().filter(|t| **t >= cutoff).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Issuer;
    use chrono::Duration;
    use uuid::Uuid;

    fn infraction(
        kind: InfractionKind,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        active: bool,
    ) -> Infraction {
        Infraction {
            id: Uuid::new_v4(),
            guild_id: 1,
            user_id: 2,
            kind,
            reason: "test".into(),
            issued_by: Issuer::System,
            source_event_id: None,
            issued_at,
            expires_at,
            active,
        }
    }

    #[test]
    fn derives_counts_from_history() {
        let now = Utc::now();
        let key = ModKey::new(1, 2);
        let history = vec![
            infraction(InfractionKind::Warn, now - Duration::hours(3), None, true),
            infraction(InfractionKind::Warn, now - Duration::hours(2), None, true),
            infraction(
                InfractionKind::Mute,
                now - Duration::hours(1),
                Some(now + Duration::hours(1)),
                true,
            ),
        ];

        let state = UserModerationState::from_history(key, &history, now);
        assert_eq!(state.warn_count, 2);
        assert_eq!(state.mute_count, 1);
        assert!(state.mute_in_force(now).is_some());
        assert!(state.ban_in_force(now).is_none());
    }

    #[test]
    fn expired_mute_does_not_survive_rebuild() {
        let now = Utc::now();
        let key = ModKey::new(1, 2);
        let history = vec![infraction(
            InfractionKind::Mute,
            now - Duration::hours(2),
            Some(now - Duration::hours(1)),
            true,
        )];

        let state = UserModerationState::from_history(key, &history, now);
        assert!(state.active_mute.is_none());
        assert_eq!(state.mute_count, 1);
    }

    #[test]
    fn kick_lookback_counts_only_recent_kicks() {
        let now = Utc::now();
        let key = ModKey::new(1, 2);
        let history = vec![
            infraction(InfractionKind::Kick, now - Duration::days(30), None, true),
            infraction(InfractionKind::Kick, now - Duration::days(1), None, true),
        ];

        let state = UserModerationState::from_history(key, &history, now);
        assert_eq!(state.kicks_since(now - Duration::days(7)), 1);
        assert_eq!(state.kicks_since(now - Duration::days(60)), 2);
    }

    #[test]
    fn apply_matches_rebuild() {
        let now = Utc::now();
        let key = ModKey::new(1, 2);
        let rows = vec![
            infraction(InfractionKind::Warn, now - Duration::hours(2), None, true),
            infraction(InfractionKind::Kick, now - Duration::hours(1), None, true),
        ];

        let mut incremental = UserModerationState::empty(key);
        for inf in &rows {
            incremental.apply(inf);
        }
        let rebuilt = UserModerationState::from_history(key, &rows, now);

        assert_eq!(incremental.warn_count, rebuilt.warn_count);
        assert_eq!(incremental.kicks, rebuilt.kicks);
        assert_eq!(incremental.last_infraction_at, rebuilt.last_infraction_at);
    }
}
