use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::UserModerationState;
use crate::db::models::InfractionKind;
use crate::services::escalation::mute_duration;
use crate::services::ViolationSignal;

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub max_warnings: u32,
    pub base_mute_duration: Duration,
    pub max_mute_duration: Duration,
    pub mute_evasion_escalates_to_kick: bool,
    pub kick_lookback_window: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SanctionDecision {
    pub kind: InfractionKind,
    pub duration: Option<Duration>,
    pub reason: String,
}

/// Decide the next sanction for a key given its current state and the
/// violations raised by one event.
///
/// Pure function of `(state, violations, policy, now)` so decisions are
/// deterministic and replayable. The caller must hold the per-key critical
/// section and must have loaded `state` through the cache/ledger read path;
/// deciding against stale state can under- or over-escalate.
pub fn decide(
    state: &UserModerationState,
    violations: &[ViolationSignal],
    policy: &EscalationPolicy,
    now: DateTime<Utc>,
) -> Option<SanctionDecision> {
    if violations.is_empty() {
        return None;
    }
    // An active ban is terminal; nothing further to escalate
    if state.ban_in_force(now).is_some() {
        return None;
    }

    let reason = violations
        .iter()
        .map(|v| v.reason())
        .collect::<Vec<_>>()
        .join("; ");

    // A violation while muted is mute evasion
    if state.mute_in_force(now).is_some() {
        if policy.mute_evasion_escalates_to_kick {
            let cutoff = now - chrono::Duration::seconds(policy.kick_lookback_window.as_secs() as i64);
            if state.kicks_since(cutoff) > 0 {
                return Some(SanctionDecision {
                    kind: InfractionKind::Ban,
                    duration: None,
                    reason: format!("repeated kicks within lookback; {reason}"),
                });
            }
            return Some(SanctionDecision {
                kind: InfractionKind::Kick,
                duration: None,
                reason: format!("violation during active mute; {reason}"),
            });
        }
        return Some(mute_decision(state, policy, reason));
    }

    if state.warn_count >= policy.max_warnings {
        return Some(mute_decision(state, policy, reason));
    }

    Some(SanctionDecision {
        kind: InfractionKind::Warn,
        duration: None,
        reason,
    })
}

fn mute_decision(
    state: &UserModerationState,
    policy: &EscalationPolicy,
    reason: String,
) -> SanctionDecision {
    let duration = mute_duration(
        policy.base_mute_duration,
        policy.max_mute_duration,
        state.mute_count,
    );
    SanctionDecision {
        kind: InfractionKind::Mute,
        duration: Some(duration),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Infraction, Issuer};
    use crate::events::ModKey;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn policy() -> EscalationPolicy {
        EscalationPolicy {
            max_warnings: 2,
            base_mute_duration: Duration::from_secs(15 * 60),
            max_mute_duration: Duration::from_secs(28 * 24 * 60 * 60),
            mute_evasion_escalates_to_kick: true,
            kick_lookback_window: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }

    fn spam() -> Vec<ViolationSignal> {
        vec![ViolationSignal::SpamBurst {
            count: 5,
            window: Duration::from_secs(10),
        }]
    }

    fn state() -> UserModerationState {
        UserModerationState::empty(ModKey::new(1, 2))
    }

    fn active_infraction(kind: InfractionKind, now: DateTime<Utc>) -> Infraction {
        Infraction {
            id: Uuid::new_v4(),
            guild_id: 1,
            user_id: 2,
            kind,
            reason: "prior".into(),
            issued_by: Issuer::System,
            source_event_id: None,
            issued_at: now - ChronoDuration::minutes(5),
            expires_at: kind.eq(&InfractionKind::Mute).then(|| now + ChronoDuration::hours(1)),
            active: true,
        }
    }

    #[test]
    fn clean_user_gets_a_warning() {
        let decision = decide(&state(), &spam(), &policy(), Utc::now()).unwrap();
        assert_eq!(decision.kind, InfractionKind::Warn);
        assert_eq!(decision.duration, None);
    }

    #[test]
    fn warnings_exhausted_becomes_base_mute() {
        let mut s = state();
        s.warn_count = 2;
        let decision = decide(&s, &spam(), &policy(), Utc::now()).unwrap();
        assert_eq!(decision.kind, InfractionKind::Mute);
        assert_eq!(decision.duration, Some(Duration::from_secs(15 * 60)));
    }

    #[test]
    fn repeat_mutes_back_off_exponentially() {
        let mut s = state();
        s.warn_count = 2;
        s.mute_count = 2;
        let decision = decide(&s, &spam(), &policy(), Utc::now()).unwrap();
        assert_eq!(decision.duration, Some(Duration::from_secs(60 * 60)));
    }

    #[test]
    fn violation_during_active_mute_is_a_kick() {
        let now = Utc::now();
        let mut s = state();
        s.warn_count = 5;
        s.mute_count = 1;
        s.active_mute = Some(active_infraction(InfractionKind::Mute, now));

        let decision = decide(&s, &spam(), &policy(), now).unwrap();
        assert_eq!(decision.kind, InfractionKind::Kick);
    }

    #[test]
    fn mute_evasion_remutes_when_kick_escalation_disabled() {
        let now = Utc::now();
        let mut p = policy();
        p.mute_evasion_escalates_to_kick = false;
        let mut s = state();
        s.mute_count = 1;
        s.active_mute = Some(active_infraction(InfractionKind::Mute, now));

        let decision = decide(&s, &spam(), &p, now).unwrap();
        assert_eq!(decision.kind, InfractionKind::Mute);
        assert_eq!(decision.duration, Some(Duration::from_secs(30 * 60)));
    }

    #[test]
    fn kick_with_recent_prior_kick_becomes_ban() {
        let now = Utc::now();
        let mut s = state();
        s.active_mute = Some(active_infraction(InfractionKind::Mute, now));
        s.kicks.push(now - ChronoDuration::days(1));

        let decision = decide(&s, &spam(), &policy(), now).unwrap();
        assert_eq!(decision.kind, InfractionKind::Ban);
    }

    #[test]
    fn stale_kick_outside_lookback_stays_a_kick() {
        let now = Utc::now();
        let mut s = state();
        s.active_mute = Some(active_infraction(InfractionKind::Mute, now));
        s.kicks.push(now - ChronoDuration::days(30));

        let decision = decide(&s, &spam(), &policy(), now).unwrap();
        assert_eq!(decision.kind, InfractionKind::Kick);
    }

    #[test]
    fn expired_mute_does_not_trigger_evasion_path() {
        let now = Utc::now();
        let mut s = state();
        s.warn_count = 2;
        s.mute_count = 1;
        let mut mute = active_infraction(InfractionKind::Mute, now);
        mute.expires_at = Some(now - ChronoDuration::minutes(1));
        s.active_mute = Some(mute);

        let decision = decide(&s, &spam(), &policy(), now).unwrap();
        assert_eq!(decision.kind, InfractionKind::Mute);
    }

    #[test]
    fn active_ban_is_terminal() {
        let now = Utc::now();
        let mut s = state();
        s.active_ban = Some(active_infraction(InfractionKind::Ban, now));
        assert_eq!(decide(&s, &spam(), &policy(), now), None);
    }

    #[test]
    fn no_violations_no_decision() {
        assert_eq!(decide(&state(), &[], &policy(), Utc::now()), None);
    }

    #[test]
    fn decisions_are_deterministic() {
        let now = Utc::now();
        let mut s = state();
        s.warn_count = 1;
        let a = decide(&s, &spam(), &policy(), now);
        let b = decide(&s, &spam(), &policy(), now);
        assert_eq!(a, b);
    }

    #[test]
    fn severity_never_decreases_while_sanctions_are_active() {
        // warn -> mute -> kick -> ban walking through the state machine
        let now = Utc::now();
        let p = policy();
        let mut s = state();
        let mut last_severity = 0;

        for _ in 0..6 {
            let Some(decision) = decide(&s, &spam(), &p, now) else {
                break;
            };
            assert!(decision.kind.severity() >= last_severity);
            last_severity = decision.kind.severity();

            let inf = Infraction {
                id: Uuid::new_v4(),
                guild_id: 1,
                user_id: 2,
                kind: decision.kind,
                reason: decision.reason,
                issued_by: Issuer::System,
                source_event_id: None,
                issued_at: now,
                expires_at: decision
                    .duration
                    .map(|d| now + ChronoDuration::seconds(d.as_secs() as i64)),
                active: true,
            };
            s.apply(&inf);
        }
        assert_eq!(last_severity, InfractionKind::Ban.severity());
    }
}
