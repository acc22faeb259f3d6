//! Realtime event model.
//!
//! Every push the server makes is one [`Event`]: a closed sum type whose JSON
//! form is `{"type": "<snake_case>", "payload": {...}}`. The `connected`
//! greeting carries no payload.
//!
//! ## Wire Format (SSE)
//!
//! ```text
//! data: {"type":"issue_updated","payload":{"projectId":"...","issueId":"...","issue":{...},"changes":{...}}}
//! ```
//!
//! Events carry enough context for a client to decide which cached queries to
//! invalidate. They are hints, not deltas: clients re-fetch authoritative state.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Issue, IssueChanges, MemberRole, Notification, UserId};

/// Discriminant of an [`Event`], matching the wire `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Notification,
    IssueCreated,
    IssueUpdated,
    IssueCommented,
    ProjectMemberAdded,
    ProjectMemberRoleChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::Connected,
        EventKind::Notification,
        EventKind::IssueCreated,
        EventKind::IssueUpdated,
        EventKind::IssueCommented,
        EventKind::ProjectMemberAdded,
        EventKind::ProjectMemberRoleChanged,
    ];

    /// Wire name used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Notification => "notification",
            Self::IssueCreated => "issue_created",
            Self::IssueUpdated => "issue_updated",
            Self::IssueCommented => "issue_commented",
            Self::ProjectMemberAdded => "project_member_added",
            Self::ProjectMemberRoleChanged => "project_member_role_changed",
        }
    }

    /// Parse a wire name. Unknown names yield `None` so newer servers can add
    /// event types without breaking older clients.
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCreatedPayload {
    pub project_id: Uuid,
    pub issue: Issue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUpdatedPayload {
    pub project_id: Uuid,
    pub issue_id: Uuid,
    pub issue: Issue,
    pub changes: IssueChanges,
}

/// Comment excerpt carried by `issue_commented`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentExcerpt {
    pub id: Uuid,
    pub content: String,
    pub author_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCommentedPayload {
    pub project_id: Uuid,
    pub issue_id: Uuid,
    pub comment: CommentExcerpt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAddedPayload {
    pub project_id: Uuid,
    pub role: MemberRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRoleChangedPayload {
    pub project_id: Uuid,
    pub from: MemberRole,
    pub to: MemberRole,
}

/// A realtime event pushed to live sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    /// First frame on every subscription.
    Connected,
    /// A durable notification was created for the recipient.
    Notification(Notification),
    IssueCreated(IssueCreatedPayload),
    IssueUpdated(IssueUpdatedPayload),
    IssueCommented(IssueCommentedPayload),
    ProjectMemberAdded(MemberAddedPayload),
    ProjectMemberRoleChanged(MemberRoleChangedPayload),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Notification(_) => EventKind::Notification,
            Self::IssueCreated(_) => EventKind::IssueCreated,
            Self::IssueUpdated(_) => EventKind::IssueUpdated,
            Self::IssueCommented(_) => EventKind::IssueCommented,
            Self::ProjectMemberAdded(_) => EventKind::ProjectMemberAdded,
            Self::ProjectMemberRoleChanged(_) => EventKind::ProjectMemberRoleChanged,
        }
    }

    /// Wire name of this event.
    pub fn event_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Serialize to the JSON text written as the SSE `data:` field.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldChange, IssuePriority, IssueStatus, NotificationKind};
    use chrono::Utc;

    fn sample_issue(project_id: Uuid) -> Issue {
        let now = Utc::now();
        Issue {
            id: Uuid::new_v4(),
            project_id,
            title: "Broken login".to_string(),
            description: None,
            status: IssueStatus::InProgress,
            priority: IssuePriority::High,
            author_id: UserId::random(),
            assignee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_connected_has_no_payload() {
        let json = Event::Connected.to_json().unwrap();
        assert_eq!(json, r#"{"type":"connected"}"#);
    }

    #[test]
    fn test_kind_round_trips_through_wire_name() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_wire(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_wire("issue_deleted"), None);
        assert_eq!(EventKind::from_wire(""), None);
    }

    #[test]
    fn test_issue_updated_wire_shape() {
        let project_id = Uuid::new_v4();
        let issue = sample_issue(project_id);
        let changes = IssueChanges {
            status: Some(FieldChange::new(IssueStatus::Open, IssueStatus::InProgress)),
            ..Default::default()
        };
        let event = Event::IssueUpdated(IssueUpdatedPayload {
            project_id,
            issue_id: issue.id,
            issue: issue.clone(),
            changes,
        });

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "issue_updated");
        assert_eq!(value["payload"]["projectId"], project_id.to_string());
        assert_eq!(value["payload"]["issueId"], issue.id.to_string());
        assert_eq!(value["payload"]["issue"]["status"], "IN_PROGRESS");
        assert_eq!(value["payload"]["changes"]["status"]["from"], "OPEN");
        assert_eq!(value["payload"]["changes"]["status"]["to"], "IN_PROGRESS");
        assert_eq!(event.event_type(), "issue_updated");
    }

    #[test]
    fn test_event_type_matches_serialized_tag() {
        let project_id = Uuid::new_v4();
        let events = vec![
            Event::Connected,
            Event::Notification(Notification {
                id: Uuid::new_v4(),
                user_id: UserId::random(),
                kind: NotificationKind::IssueCommented,
                title: "New comment".to_string(),
                body: None,
                link: None,
                read: false,
                created_at: Utc::now(),
            }),
            Event::IssueCreated(IssueCreatedPayload {
                project_id,
                issue: sample_issue(project_id),
            }),
            Event::IssueCommented(IssueCommentedPayload {
                project_id,
                issue_id: Uuid::new_v4(),
                comment: CommentExcerpt {
                    id: Uuid::new_v4(),
                    content: "+1".to_string(),
                    author_id: UserId::random(),
                },
            }),
            Event::ProjectMemberAdded(MemberAddedPayload {
                project_id,
                role: MemberRole::Member,
            }),
            Event::ProjectMemberRoleChanged(MemberRoleChangedPayload {
                project_id,
                from: MemberRole::Viewer,
                to: MemberRole::Member,
            }),
        ];

        for event in events {
            let value: serde_json::Value =
                serde_json::from_str(&event.to_json().unwrap()).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
    }

    #[test]
    fn test_deserialize_member_role_changed() {
        let project_id = Uuid::new_v4();
        let json = format!(
            r#"{{"type":"project_member_role_changed","payload":{{"projectId":"{}","from":"VIEWER","to":"MEMBER"}}}}"#,
            project_id
        );
        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(
            event,
            Event::ProjectMemberRoleChanged(MemberRoleChangedPayload {
                project_id,
                from: MemberRole::Viewer,
                to: MemberRole::Member,
            })
        );
    }
}
