use uuid::Uuid;

use crate::engine::error::Error;
use crate::events::{ActivityEvent, EventKind, RawEvent};

/// Convert a raw inbound payload into a uniform `ActivityEvent`.
///
/// Pure function: no shared state, no side effects. A missing `user_id`,
/// `guild_id` or `timestamp` fails fast; the caller drops the event and logs
/// it rather than letting the failure propagate upstream.
pub fn normalize(raw: RawEvent) -> Result<ActivityEvent, Error> {
    let user_id = raw
        .user_id
        .ok_or_else(|| Error::MalformedEvent("missing user_id".into()))?;
    let guild_id = raw
        .guild_id
        .ok_or_else(|| Error::MalformedEvent("missing guild_id".into()))?;
    let timestamp = raw
        .timestamp
        .ok_or_else(|| Error::MalformedEvent("missing timestamp".into()))?;

    let kind = match raw.kind.as_deref() {
        None => EventKind::Message,
        Some(s) => EventKind::parse(s)
            .ok_or_else(|| Error::MalformedEvent(format!("unknown event kind: {s}")))?,
    };

    Ok(ActivityEvent {
        event_id: raw.event_id.unwrap_or_else(Uuid::new_v4),
        user_id,
        guild_id,
        channel_id: raw.channel_id,
        kind,
        timestamp,
        content: raw.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw_message(user_id: Option<i64>) -> RawEvent {
        RawEvent {
            user_id,
            guild_id: Some(7),
            channel_id: Some(42),
            kind: Some("message".into()),
            timestamp: Some(Utc::now()),
            content: Some("hello".into()),
            event_id: None,
        }
    }

    #[test]
    fn normalizes_a_complete_message() {
        let event = normalize(raw_message(Some(1))).unwrap();
        assert_eq!(event.user_id, 1);
        assert_eq!(event.guild_id, 7);
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.content.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_user_id_is_malformed() {
        let err = normalize(raw_message(None)).unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));
    }

    #[test]
    fn missing_timestamp_is_malformed() {
        let mut raw = raw_message(Some(1));
        raw.timestamp = None;
        assert!(normalize(raw).is_err());
    }

    #[test]
    fn unknown_kind_is_malformed() {
        let mut raw = raw_message(Some(1));
        raw.kind = Some("voice_hop".into());
        assert!(normalize(raw).is_err());
    }

    #[test]
    fn generates_event_id_when_absent() {
        let a = normalize(raw_message(Some(1))).unwrap();
        let b = normalize(raw_message(Some(1))).unwrap();
        assert_ne!(a.event_id, b.event_id);
    }
}
