//! Query keys and event-to-invalidation mapping.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use tracker_core::EventKind;

/// Families of cached server data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Notifications,
    Issues,
    Issue,
    Activities,
    ProjectMembers,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Notifications => "notifications",
            QueryKey::Issues => "issues",
            QueryKey::Issue => "issue",
            QueryKey::Activities => "activities",
            QueryKey::ProjectMembers => "project-members",
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query families made stale by an event of `kind`.
pub fn invalidations_for(kind: EventKind) -> &'static [QueryKey] {
    match kind {
        EventKind::Connected => &[],
        EventKind::Notification => &[QueryKey::Notifications],
        EventKind::IssueCreated | EventKind::IssueUpdated | EventKind::IssueCommented => {
            &[QueryKey::Issues, QueryKey::Issue, QueryKey::Activities]
        }
        EventKind::ProjectMemberAdded | EventKind::ProjectMemberRoleChanged => {
            &[QueryKey::ProjectMembers]
        }
    }
}

/// Envelope of every frame: `{"type": ..., "payload": ...}`.
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: Option<Value>,
}

/// An event received from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientEvent {
    pub kind: EventKind,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFrame {
    Event(ClientEvent),
    /// Well-formed envelope with a `type` this client does not know.
    Unknown(String),
}

/// Parse one frame's data. `None` when it is not a valid envelope.
pub fn parse_frame(data: &str) -> Option<ParsedFrame> {
    let raw: RawEvent = serde_json::from_str(data).ok()?;
    Some(match EventKind::from_wire(&raw.event_type) {
        Some(kind) => ParsedFrame::Event(ClientEvent {
            kind,
            payload: raw.payload,
        }),
        None => ParsedFrame::Unknown(raw.event_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidation_table() {
        assert!(invalidations_for(EventKind::Connected).is_empty());
        assert_eq!(
            invalidations_for(EventKind::Notification),
            &[QueryKey::Notifications]
        );
        for kind in [
            EventKind::IssueCreated,
            EventKind::IssueUpdated,
            EventKind::IssueCommented,
        ] {
            assert_eq!(
                invalidations_for(kind),
                &[QueryKey::Issues, QueryKey::Issue, QueryKey::Activities]
            );
        }
        for kind in [
            EventKind::ProjectMemberAdded,
            EventKind::ProjectMemberRoleChanged,
        ] {
            assert_eq!(invalidations_for(kind), &[QueryKey::ProjectMembers]);
        }
    }

    #[test]
    fn test_parse_known_event() {
        let parsed = parse_frame(r#"{"type":"issue_updated","payload":{"issueId":"x"}}"#);
        match parsed {
            Some(ParsedFrame::Event(event)) => {
                assert_eq!(event.kind, EventKind::IssueUpdated);
                assert_eq!(event.payload.unwrap()["issueId"], "x");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_connected_without_payload() {
        assert_eq!(
            parse_frame(r#"{"type":"connected"}"#),
            Some(ParsedFrame::Event(ClientEvent {
                kind: EventKind::Connected,
                payload: None,
            }))
        );
    }

    #[test]
    fn test_unknown_type_and_garbage() {
        assert_eq!(
            parse_frame(r#"{"type":"issue_deleted","payload":{}}"#),
            Some(ParsedFrame::Unknown("issue_deleted".to_string()))
        );
        assert_eq!(parse_frame("not json"), None);
        assert_eq!(parse_frame(r#"{"payload":{}}"#), None);
    }
}
