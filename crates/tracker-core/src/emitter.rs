//! Domain event emission for mutation handlers.
//!
//! Each method runs after the primary write has committed and performs the
//! secondary effects in a fixed order: activity record, notification rows
//! (each pushed to its recipient once persisted), then the project broadcast.
//!
//! Secondary effects are best effort. Every failure is logged here and the
//! methods return `()`, so a mutation's outcome depends on its primary write
//! alone.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::audience::{Audience, MembershipResolver};
use crate::dispatcher::EventDispatcher;
use crate::events::{
    CommentExcerpt, Event, IssueCommentedPayload, IssueCreatedPayload, IssueUpdatedPayload,
    MemberAddedPayload, MemberRoleChangedPayload,
};
use crate::logging::{COMPONENT_EMITTER, SUBSYSTEM_REALTIME};
use crate::models::*;
use crate::traits::{ActivityStore, NotificationStore, ProjectDirectory};

fn issue_link(project_id: Uuid, issue_id: Uuid) -> String {
    format!("/projects/{}/issues/{}", project_id, issue_id)
}

fn project_link(project_id: Uuid) -> String {
    format!("/projects/{}", project_id)
}

/// Issue author and assignee, minus the actor. Ordered for stable output.
fn issue_watchers(issue: &Issue, actor: UserId) -> BTreeSet<UserId> {
    std::iter::once(issue.author_id)
        .chain(issue.assignee_id)
        .filter(|u| *u != actor)
        .collect()
}

#[derive(Clone)]
pub struct EventEmitter {
    resolver: MembershipResolver,
    notifications: Arc<dyn NotificationStore>,
    activities: Arc<dyn ActivityStore>,
    dispatcher: EventDispatcher,
}

impl EventEmitter {
    pub fn new(
        directory: Arc<dyn ProjectDirectory>,
        notifications: Arc<dyn NotificationStore>,
        activities: Arc<dyn ActivityStore>,
        dispatcher: EventDispatcher,
    ) -> Self {
        Self {
            resolver: MembershipResolver::new(directory),
            notifications,
            activities,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    // =========================================================================
    // Building blocks
    // =========================================================================

    /// Append an activity record. Failures are logged and swallowed.
    pub async fn record_activity(&self, activity: NewActivity) {
        let kind = activity.kind;
        let actor = activity.user_id;
        if let Err(e) = self.activities.record(activity).await {
            warn!(
                subsystem = SUBSYSTEM_REALTIME,
                component = COMPONENT_EMITTER,
                activity_type = kind.as_str(),
                actor_id = %actor,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    /// Persist a notification, then push it to the recipient's live sinks.
    /// Nothing is pushed when persistence fails.
    pub async fn notify(&self, notification: NewNotification) {
        let recipient = notification.user_id;
        let kind = notification.kind;
        match self.notifications.create(notification).await {
            Ok(created) => {
                self.dispatcher.send(recipient, &Event::Notification(created));
            }
            Err(e) => {
                warn!(
                    subsystem = SUBSYSTEM_REALTIME,
                    component = COMPONENT_EMITTER,
                    user_id = %recipient,
                    notification_type = kind.as_str(),
                    error = %e,
                    "Failed to create notification"
                );
            }
        }
    }

    /// Project audience minus the actor. Resolution failure yields an empty
    /// audience so the caller sends nothing.
    async fn project_audience(&self, project_id: Uuid, actor: UserId) -> Audience {
        match self.resolver.audience_for_project(project_id).await {
            Ok(audience) => audience.without(actor),
            Err(e) => {
                warn!(
                    subsystem = SUBSYSTEM_REALTIME,
                    component = COMPONENT_EMITTER,
                    project_id = %project_id,
                    error = %e,
                    "Failed to resolve project audience; skipping broadcast"
                );
                Audience::new()
            }
        }
    }

    async fn broadcast_to_project(&self, project_id: Uuid, actor: UserId, event: Event) {
        let audience = self.project_audience(project_id, actor).await;
        if audience.is_empty() {
            debug!(
                project_id = %project_id,
                event_type = event.event_type(),
                "No audience for broadcast"
            );
            return;
        }
        self.dispatcher.broadcast(audience, &event);
    }

    // =========================================================================
    // Issues
    // =========================================================================

    pub async fn issue_created(&self, actor: UserId, project: &Project, issue: &Issue) {
        self.record_activity(NewActivity {
            kind: ActivityKind::IssueCreated,
            user_id: actor,
            project_id: Some(project.id),
            issue_id: Some(issue.id),
            metadata: Some(json!({ "title": issue.title })),
        })
        .await;

        if let Some(assignee) = issue.assignee_id.filter(|a| *a != actor) {
            self.notify(NewNotification {
                user_id: assignee,
                kind: NotificationKind::IssueAssigned,
                title: format!("Issue assigned: {}", issue.title),
                body: Some(format!("Project: {}", project.name)),
                link: Some(issue_link(project.id, issue.id)),
            })
            .await;
        }

        self.broadcast_to_project(
            project.id,
            actor,
            Event::IssueCreated(IssueCreatedPayload {
                project_id: project.id,
                issue: issue.clone(),
            }),
        )
        .await;
    }

    /// `before` and `after` are snapshots around the committed update.
    pub async fn issue_updated(
        &self,
        actor: UserId,
        project: &Project,
        before: &Issue,
        after: &Issue,
    ) {
        let changes = IssueChanges::between(before, after);

        if let Some(status) = &changes.status {
            self.record_activity(NewActivity {
                kind: ActivityKind::IssueStatusChanged,
                user_id: actor,
                project_id: Some(project.id),
                issue_id: Some(after.id),
                metadata: serde_json::to_value(status).ok(),
            })
            .await;
        }
        if let Some(assignee) = &changes.assignee_id {
            self.record_activity(NewActivity {
                kind: ActivityKind::IssueAssigneeChanged,
                user_id: actor,
                project_id: Some(project.id),
                issue_id: Some(after.id),
                metadata: serde_json::to_value(assignee).ok(),
            })
            .await;
        }
        if !changes.is_empty() && changes.status.is_none() && changes.assignee_id.is_none() {
            self.record_activity(NewActivity {
                kind: ActivityKind::IssueUpdated,
                user_id: actor,
                project_id: Some(project.id),
                issue_id: Some(after.id),
                metadata: serde_json::to_value(&changes).ok(),
            })
            .await;
        }

        let new_assignee = changes
            .assignee_id
            .as_ref()
            .and_then(|c| c.to)
            .filter(|a| *a != actor);
        if let Some(assignee) = new_assignee {
            self.notify(NewNotification {
                user_id: assignee,
                kind: NotificationKind::IssueAssigned,
                title: format!("Issue assigned: {}", after.title),
                body: Some(format!("Project: {}", project.name)),
                link: Some(issue_link(project.id, after.id)),
            })
            .await;
        }

        if changes.status.is_some() {
            for recipient in issue_watchers(after, actor) {
                self.notify(NewNotification {
                    user_id: recipient,
                    kind: NotificationKind::IssueStatusChanged,
                    title: format!("Issue status changed: {}", after.title),
                    body: Some(format!("New status: {}", after.status)),
                    link: Some(issue_link(project.id, after.id)),
                })
                .await;
            }
        }

        self.broadcast_to_project(
            project.id,
            actor,
            Event::IssueUpdated(IssueUpdatedPayload {
                project_id: project.id,
                issue_id: after.id,
                issue: after.clone(),
                changes,
            }),
        )
        .await;
    }

    /// Call before the row is deleted so the record can still reference it.
    pub async fn issue_deleted(&self, actor: UserId, issue: &Issue) {
        self.record_activity(NewActivity {
            kind: ActivityKind::IssueDeleted,
            user_id: actor,
            project_id: Some(issue.project_id),
            issue_id: Some(issue.id),
            metadata: Some(json!({ "title": issue.title })),
        })
        .await;
    }

    /// One activity per label attached or detached. Labels ride along with
    /// the issue snapshot, so nothing is broadcast here.
    pub async fn issue_labels_changed(
        &self,
        actor: UserId,
        issue: &Issue,
        added: &[Label],
        removed: &[Label],
    ) {
        let entries = added
            .iter()
            .map(|l| (ActivityKind::IssueLabelAdded, l))
            .chain(removed.iter().map(|l| (ActivityKind::IssueLabelRemoved, l)));
        for (kind, label) in entries {
            self.record_activity(NewActivity {
                kind,
                user_id: actor,
                project_id: Some(issue.project_id),
                issue_id: Some(issue.id),
                metadata: Some(json!({ "labelId": label.id, "labelName": label.name })),
            })
            .await;
        }
    }

    // =========================================================================
    // Comments
    // =========================================================================

    pub async fn comment_created(
        &self,
        actor: UserId,
        project: &Project,
        issue: &Issue,
        comment: &Comment,
    ) {
        self.record_activity(NewActivity {
            kind: ActivityKind::CommentCreated,
            user_id: actor,
            project_id: Some(project.id),
            issue_id: Some(issue.id),
            metadata: Some(json!({ "commentId": comment.id })),
        })
        .await;

        for recipient in issue_watchers(issue, actor) {
            self.notify(NewNotification {
                user_id: recipient,
                kind: NotificationKind::IssueCommented,
                title: format!("New comment on: {}", issue.title),
                body: Some(comment.content.clone()),
                link: Some(issue_link(project.id, issue.id)),
            })
            .await;
        }

        self.broadcast_to_project(
            project.id,
            actor,
            Event::IssueCommented(IssueCommentedPayload {
                project_id: project.id,
                issue_id: issue.id,
                comment: CommentExcerpt {
                    id: comment.id,
                    content: comment.content.clone(),
                    author_id: actor,
                },
            }),
        )
        .await;
    }

    /// Call before the row is deleted.
    pub async fn comment_deleted(&self, actor: UserId, project_id: Uuid, comment: &Comment) {
        self.record_activity(NewActivity {
            kind: ActivityKind::CommentDeleted,
            user_id: actor,
            project_id: Some(project_id),
            issue_id: Some(comment.issue_id),
            metadata: Some(json!({ "commentId": comment.id })),
        })
        .await;
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Records the field diff. Nothing is recorded when no field changed.
    pub async fn project_updated(&self, actor: UserId, before: &Project, after: &Project) {
        let changes = ProjectChanges::between(before, after);
        if changes.is_empty() {
            return;
        }
        self.record_activity(NewActivity {
            kind: ActivityKind::ProjectUpdated,
            user_id: actor,
            project_id: Some(after.id),
            issue_id: None,
            metadata: serde_json::to_value(&changes).ok(),
        })
        .await;
    }

    // =========================================================================
    // Membership
    // =========================================================================

    pub async fn member_added(&self, actor: UserId, project: &Project, member: &ProjectMember) {
        self.record_activity(NewActivity {
            kind: ActivityKind::ProjectMemberAdded,
            user_id: actor,
            project_id: Some(project.id),
            issue_id: None,
            metadata: Some(json!({
                "addedUserId": member.user_id,
                "addedUserName": member.user.username,
                "role": member.role,
            })),
        })
        .await;

        self.notify(NewNotification {
            user_id: member.user_id,
            kind: NotificationKind::ProjectMemberAdded,
            title: format!("Added to project: {}", project.name),
            body: Some(format!("Role: {}", member.role)),
            link: Some(project_link(project.id)),
        })
        .await;

        self.dispatcher.send(
            member.user_id,
            &Event::ProjectMemberAdded(MemberAddedPayload {
                project_id: project.id,
                role: member.role,
            }),
        );
    }

    /// `member` is the updated row. No-op when the role did not change.
    pub async fn member_role_changed(
        &self,
        actor: UserId,
        project: &Project,
        member: &ProjectMember,
        previous: MemberRole,
    ) {
        if previous == member.role {
            return;
        }

        self.record_activity(NewActivity {
            kind: ActivityKind::ProjectMemberRoleChanged,
            user_id: actor,
            project_id: Some(project.id),
            issue_id: None,
            metadata: Some(json!({
                "memberUserId": member.user_id,
                "memberUserName": member.user.username,
                "from": previous,
                "to": member.role,
            })),
        })
        .await;

        self.notify(NewNotification {
            user_id: member.user_id,
            kind: NotificationKind::ProjectMemberRoleChanged,
            title: format!("Project role changed: {}", project.name),
            body: Some(format!("Role: {} -> {}", previous, member.role)),
            link: Some(project_link(project.id)),
        })
        .await;

        self.dispatcher.send(
            member.user_id,
            &Event::ProjectMemberRoleChanged(MemberRoleChangedPayload {
                project_id: project.id,
                from: previous,
                to: member.role,
            }),
        );
    }

    pub async fn member_removed(&self, actor: UserId, project_id: Uuid, member: &ProjectMember) {
        self.record_activity(NewActivity {
            kind: ActivityKind::ProjectMemberRemoved,
            user_id: actor,
            project_id: Some(project_id),
            issue_id: None,
            metadata: Some(json!({
                "removedUserId": member.user_id,
                "removedUserName": member.user.username,
                "role": member.role,
            })),
        })
        .await;
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn account_approved(&self, account: &Account) {
        self.notify(NewNotification {
            user_id: account.id,
            kind: NotificationKind::UserApproved,
            title: "Your account has been approved".to_string(),
            body: Some("You can now sign in.".to_string()),
            link: None,
        })
        .await;
    }

    pub async fn account_rejected(&self, account: &Account) {
        self.notify(NewNotification {
            user_id: account.id,
            kind: NotificationKind::UserRejected,
            title: "Your account request was rejected".to_string(),
            body: account
                .rejection_reason
                .as_ref()
                .map(|reason| format!("Reason: {}", reason)),
            link: None,
        })
        .await;
    }
}
