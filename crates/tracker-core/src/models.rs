//! Domain types shared by the tracker crates.
//!
//! Wire representation is camelCase JSON; enum values use the upper snake case
//! the web client already understands (`IN_PROGRESS`, `VIEWER`, ...).

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// IDENTITY
// =============================================================================

/// Opaque user identity carried in the bearer token.
///
/// This is the routing key of the connection registry: every live sink and
/// every durable notification belongs to exactly one `UserId`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identity (tests and fixtures).
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("invalid user id '{}': {}", s, e)))
    }
}

// =============================================================================
// ENUMS
// =============================================================================

/// Issue workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl FromStr for IssueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            other => Err(Error::InvalidInput(format!("unknown issue status: {}", other))),
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl IssuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl FromStr for IssuePriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(Error::InvalidInput(format!(
                "unknown issue priority: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for IssuePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a project member. The owner is not a member row; `Owner` only
/// appears in membership listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Member,
    #[default]
    Viewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Member => "MEMBER",
            Self::Viewer => "VIEWER",
        }
    }
}

impl FromStr for MemberRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "MEMBER" => Ok(Self::Member),
            "VIEWER" => Ok(Self::Viewer),
            other => Err(Error::InvalidInput(format!("unknown member role: {}", other))),
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a durable notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    IssueAssigned,
    IssueStatusChanged,
    IssueCommented,
    ProjectMemberAdded,
    ProjectMemberRoleChanged,
    UserApproved,
    UserRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IssueAssigned => "ISSUE_ASSIGNED",
            Self::IssueStatusChanged => "ISSUE_STATUS_CHANGED",
            Self::IssueCommented => "ISSUE_COMMENTED",
            Self::ProjectMemberAdded => "PROJECT_MEMBER_ADDED",
            Self::ProjectMemberRoleChanged => "PROJECT_MEMBER_ROLE_CHANGED",
            Self::UserApproved => "USER_APPROVED",
            Self::UserRejected => "USER_REJECTED",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUE_ASSIGNED" => Ok(Self::IssueAssigned),
            "ISSUE_STATUS_CHANGED" => Ok(Self::IssueStatusChanged),
            "ISSUE_COMMENTED" => Ok(Self::IssueCommented),
            "PROJECT_MEMBER_ADDED" => Ok(Self::ProjectMemberAdded),
            "PROJECT_MEMBER_ROLE_CHANGED" => Ok(Self::ProjectMemberRoleChanged),
            "USER_APPROVED" => Ok(Self::UserApproved),
            "USER_REJECTED" => Ok(Self::UserRejected),
            other => Err(Error::InvalidInput(format!(
                "unknown notification type: {}",
                other
            ))),
        }
    }
}

/// Kind of an append-only activity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    IssueCreated,
    IssueUpdated,
    IssueDeleted,
    IssueStatusChanged,
    IssueAssigneeChanged,
    IssueLabelAdded,
    IssueLabelRemoved,
    CommentCreated,
    CommentDeleted,
    ProjectUpdated,
    ProjectMemberAdded,
    ProjectMemberRemoved,
    ProjectMemberRoleChanged,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IssueCreated => "ISSUE_CREATED",
            Self::IssueUpdated => "ISSUE_UPDATED",
            Self::IssueDeleted => "ISSUE_DELETED",
            Self::IssueStatusChanged => "ISSUE_STATUS_CHANGED",
            Self::IssueAssigneeChanged => "ISSUE_ASSIGNEE_CHANGED",
            Self::IssueLabelAdded => "ISSUE_LABEL_ADDED",
            Self::IssueLabelRemoved => "ISSUE_LABEL_REMOVED",
            Self::CommentCreated => "COMMENT_CREATED",
            Self::CommentDeleted => "COMMENT_DELETED",
            Self::ProjectUpdated => "PROJECT_UPDATED",
            Self::ProjectMemberAdded => "PROJECT_MEMBER_ADDED",
            Self::ProjectMemberRemoved => "PROJECT_MEMBER_REMOVED",
            Self::ProjectMemberRoleChanged => "PROJECT_MEMBER_ROLE_CHANGED",
        }
    }
}

impl FromStr for ActivityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUE_CREATED" => Ok(Self::IssueCreated),
            "ISSUE_UPDATED" => Ok(Self::IssueUpdated),
            "ISSUE_DELETED" => Ok(Self::IssueDeleted),
            "ISSUE_STATUS_CHANGED" => Ok(Self::IssueStatusChanged),
            "ISSUE_ASSIGNEE_CHANGED" => Ok(Self::IssueAssigneeChanged),
            "ISSUE_LABEL_ADDED" => Ok(Self::IssueLabelAdded),
            "ISSUE_LABEL_REMOVED" => Ok(Self::IssueLabelRemoved),
            "COMMENT_CREATED" => Ok(Self::CommentCreated),
            "COMMENT_DELETED" => Ok(Self::CommentDeleted),
            "PROJECT_UPDATED" => Ok(Self::ProjectUpdated),
            "PROJECT_MEMBER_ADDED" => Ok(Self::ProjectMemberAdded),
            "PROJECT_MEMBER_REMOVED" => Ok(Self::ProjectMemberRemoved),
            "PROJECT_MEMBER_ROLE_CHANGED" => Ok(Self::ProjectMemberRoleChanged),
            other => Err(Error::InvalidInput(format!("unknown activity type: {}", other))),
        }
    }
}

/// Sign-up state of an account. New accounts wait for an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    #[default]
    Pending,
    Active,
    Rejected,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACTIVE" => Ok(Self::Active),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(Error::InvalidInput(format!("unknown account status: {}", other))),
        }
    }
}

/// Site-wide role, independent of project roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountRole {
    Admin,
    #[default]
    Member,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }
}

impl FromStr for AccountRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            other => Err(Error::InvalidInput(format!("unknown account role: {}", other))),
        }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Public user fields embedded in other responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
}

/// Administrative view of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub status: AccountStatus,
    pub role: AccountRole,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Global issue label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A membership row joined with the member's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: UserId,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub author_id: UserId,
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Durable notification addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

/// Append-only audit record of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub user_id: UserId,
    pub project_id: Option<Uuid>,
    pub issue_id: Option<Uuid>,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub kind: ActivityKind,
    pub user_id: UserId,
    pub project_id: Option<Uuid>,
    pub issue_id: Option<Uuid>,
    pub metadata: Option<JsonValue>,
}

// =============================================================================
// ISSUE CHANGE TRACKING
// =============================================================================

/// Before/after pair for one changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange<T> {
    pub from: T,
    pub to: T,
}

impl<T> FieldChange<T> {
    pub fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

/// Field-level diff of an issue update. Unchanged fields are `None` and are
/// omitted from the JSON form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange<Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FieldChange<IssueStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<FieldChange<IssuePriority>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<FieldChange<Option<UserId>>>,
}

impl IssueChanges {
    /// Diff two snapshots of the same issue.
    pub fn between(before: &Issue, after: &Issue) -> Self {
        fn diff<T: PartialEq + Clone>(a: &T, b: &T) -> Option<FieldChange<T>> {
            (a != b).then(|| FieldChange::new(a.clone(), b.clone()))
        }

        Self {
            title: diff(&before.title, &after.title),
            description: diff(&before.description, &after.description),
            status: diff(&before.status, &after.status),
            priority: diff(&before.priority, &after.priority),
            assignee_id: diff(&before.assignee_id, &after.assignee_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
    }
}

/// Field-level diff of a project update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<FieldChange<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange<Option<String>>>,
}

impl ProjectChanges {
    pub fn between(before: &Project, after: &Project) -> Self {
        Self {
            name: (before.name != after.name)
                .then(|| FieldChange::new(before.name.clone(), after.name.clone())),
            description: (before.description != after.description).then(|| {
                FieldChange::new(before.description.clone(), after.description.clone())
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Deserialize a field that distinguishes "absent" from "explicit null".
///
/// Used with `#[serde(default)]`: absent → `None`, `null` → `Some(None)`.
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Partial project update. `description: null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
}

impl UpdateProjectRequest {
    /// Apply to a snapshot. A blank name is ignored; a blank description clears it.
    pub fn apply_to(&self, project: &Project) -> Project {
        let mut next = project.clone();
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                next.name = name.to_string();
            }
        }
        if let Some(description) = &self.description {
            next.description = description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from);
        }
        next
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub assignee_id: Option<UserId>,
}

/// Partial issue update. `description` and `assignee_id` accept `null` to
/// clear the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub assignee_id: Option<Option<UserId>>,
    /// Replaces the issue's label set when present.
    pub label_ids: Option<Vec<Uuid>>,
}

impl UpdateIssueRequest {
    /// Apply the request to a snapshot, producing the intended new state.
    /// Text fields are trimmed; a blank description clears it.
    pub fn apply_to(&self, issue: &Issue) -> Issue {
        let mut next = issue.clone();
        if let Some(title) = self.title.as_deref().map(str::trim) {
            if !title.is_empty() {
                next.title = title.to_string();
            }
        }
        if let Some(description) = &self.description {
            next.description = description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from);
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(assignee) = self.assignee_id {
            next.assignee_id = assignee;
        }
        next
    }
}

/// Query filters for listing issues.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueFilter {
    pub project_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub assignee_id: Option<UserId>,
    pub q: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub issue_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub role: MemberRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLabelRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAccountRequest {
    #[serde(default)]
    pub role: AccountRole,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectAccountRequest {
    pub reason: Option<String>,
}

/// Metadata map helper for activity records.
pub fn metadata<I, K>(pairs: I) -> JsonValue
where
    I: IntoIterator<Item = (K, JsonValue)>,
    K: Into<String>,
{
    let map: HashMap<String, JsonValue> = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
    serde_json::to_value(map).unwrap_or(JsonValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_issue() -> Issue {
        let now = Utc::now();
        Issue {
            id: Uuid::nil(),
            project_id: Uuid::nil(),
            title: "Crash on save".to_string(),
            description: Some("Steps attached".to_string()),
            status: IssueStatus::Open,
            priority: IssuePriority::Medium,
            author_id: UserId::random(),
            assignee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::InProgress).unwrap(),
            r#""IN_PROGRESS""#
        );
        assert_eq!("RESOLVED".parse::<IssueStatus>().unwrap(), IssueStatus::Resolved);
        assert!("in_progress".parse::<IssueStatus>().is_err());
    }

    #[test]
    fn test_enum_as_str_matches_serde() {
        for role in [MemberRole::Owner, MemberRole::Member, MemberRole::Viewer] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
        for kind in [
            ActivityKind::IssueStatusChanged,
            ActivityKind::ProjectMemberRoleChanged,
            ActivityKind::CommentDeleted,
            ActivityKind::IssueLabelAdded,
            ActivityKind::IssueLabelRemoved,
            ActivityKind::ProjectUpdated,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<ActivityKind>().unwrap(), kind);
        }
        for kind in [NotificationKind::UserApproved, NotificationKind::UserRejected] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        for status in [AccountStatus::Pending, AccountStatus::Active, AccountStatus::Rejected] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
        assert_eq!("ADMIN".parse::<AccountRole>().unwrap(), AccountRole::Admin);
        assert!("OWNER".parse::<AccountRole>().is_err());
    }

    #[test]
    fn test_issue_changes_between_status_only() {
        let before = sample_issue();
        let mut after = before.clone();
        after.status = IssueStatus::InProgress;

        let changes = IssueChanges::between(&before, &after);
        assert!(!changes.is_empty());
        assert_eq!(
            changes.status,
            Some(FieldChange::new(IssueStatus::Open, IssueStatus::InProgress))
        );
        assert!(changes.title.is_none());

        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json["status"]["from"], "OPEN");
        assert_eq!(json["status"]["to"], "IN_PROGRESS");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_issue_changes_assignee_key_is_camel_case() {
        let before = sample_issue();
        let mut after = before.clone();
        let assignee = UserId::random();
        after.assignee_id = Some(assignee);

        let json = serde_json::to_value(IssueChanges::between(&before, &after)).unwrap();
        assert!(json["assigneeId"]["from"].is_null());
        assert_eq!(json["assigneeId"]["to"], assignee.to_string());
    }

    #[test]
    fn test_issue_changes_identical_is_empty() {
        let issue = sample_issue();
        assert!(IssueChanges::between(&issue, &issue).is_empty());
    }

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let absent: UpdateIssueRequest = serde_json::from_str(r#"{"status":"CLOSED"}"#).unwrap();
        assert!(absent.assignee_id.is_none());
        assert!(absent.description.is_none());

        let cleared: UpdateIssueRequest =
            serde_json::from_str(r#"{"assigneeId":null,"description":null}"#).unwrap();
        assert_eq!(cleared.assignee_id, Some(None));
        assert_eq!(cleared.description, Some(None));
    }

    #[test]
    fn test_update_request_apply_trims_and_clears() {
        let mut issue = sample_issue();
        issue.assignee_id = Some(UserId::random());

        let req: UpdateIssueRequest = serde_json::from_str(
            r#"{"title":"  New title  ","description":"   ","assigneeId":null}"#,
        )
        .unwrap();
        let next = req.apply_to(&issue);

        assert_eq!(next.title, "New title");
        assert_eq!(next.description, None);
        assert_eq!(next.assignee_id, None);
        assert_eq!(next.status, issue.status);
    }

    #[test]
    fn test_blank_title_is_ignored() {
        let issue = sample_issue();
        let req = UpdateIssueRequest {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(req.apply_to(&issue).title, issue.title);
    }

    #[test]
    fn test_notification_serializes_kind_as_type() {
        let n = Notification {
            id: Uuid::nil(),
            user_id: UserId::new(Uuid::nil()),
            kind: NotificationKind::IssueAssigned,
            title: "Issue assigned".to_string(),
            body: None,
            link: Some("/projects/1/issues/2".to_string()),
            read: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "ISSUE_ASSIGNED");
        assert_eq!(json["userId"], Uuid::nil().to_string());
        assert_eq!(json["read"], false);
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_add_member_role_defaults_to_viewer() {
        let id = Uuid::new_v4();
        let req: AddMemberRequest =
            serde_json::from_str(&format!(r#"{{"userId":"{}"}}"#, id)).unwrap();
        assert_eq!(req.role, MemberRole::Viewer);
        assert_eq!(req.user_id, UserId::new(id));
    }

    fn sample_project() -> Project {
        Project {
            id: Uuid::new_v4(),
            name: "Website".to_string(),
            description: Some("Marketing site".to_string()),
            owner_id: UserId::random(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_project_update_request_apply_and_diff() {
        let project = sample_project();
        let req: UpdateProjectRequest =
            serde_json::from_str(r#"{"name":" Storefront ","description":null}"#).unwrap();
        let next = req.apply_to(&project);
        assert_eq!(next.name, "Storefront");
        assert_eq!(next.description, None);

        let changes = ProjectChanges::between(&project, &next);
        assert_eq!(
            serde_json::to_value(&changes).unwrap(),
            serde_json::json!({
                "name": {"from": "Website", "to": "Storefront"},
                "description": {"from": "Marketing site", "to": null}
            })
        );

        let untouched = UpdateProjectRequest::default().apply_to(&project);
        assert!(ProjectChanges::between(&project, &untouched).is_empty());
    }

    #[test]
    fn test_approve_request_defaults_to_member() {
        let req: ApproveAccountRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.role, AccountRole::Member);
        let req: ApproveAccountRequest = serde_json::from_str(r#"{"role":"ADMIN"}"#).unwrap();
        assert_eq!(req.role, AccountRole::Admin);
    }

    #[test]
    fn test_metadata_helper() {
        let value = metadata([("from", serde_json::json!("OPEN")), ("to", serde_json::json!("CLOSED"))]);
        assert_eq!(value, serde_json::json!({"from": "OPEN", "to": "CLOSED"}));
    }
}
