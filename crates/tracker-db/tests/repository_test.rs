//! Repository integration tests.
//!
//! These need a running PostgreSQL (see `DATABASE_URL`) and are ignored by
//! default: `cargo test -p tracker-db -- --ignored`.

use serde_json::json;
use tracker_core::{
    AccountRole, AccountStatus, ActivityKind, ActivityStore, Error, IssueFilter, IssuePriority,
    IssueStatus, MemberRole, NewActivity, NewNotification, NotificationKind, NotificationStore,
    ProjectDirectory,
};
use tracker_db::test_fixtures::TestDatabase;
use tracker_db::NewIssue;

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_directory_lists_owner_and_members() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let member = t.user("member").await;
    let project = t.project(owner, "Directory").await;

    t.db.members
        .add(project.id, member, MemberRole::Member)
        .await
        .unwrap();

    assert_eq!(t.db.projects.project_owner(project.id).await.unwrap(), Some(owner));
    assert_eq!(t.db.projects.member_ids(project.id).await.unwrap(), vec![member]);
    assert_eq!(
        t.db.projects.role_of(project.id, owner).await.unwrap(),
        Some(MemberRole::Owner)
    );
    assert_eq!(
        t.db.projects.role_of(project.id, member).await.unwrap(),
        Some(MemberRole::Member)
    );
    assert_eq!(
        t.db.projects
            .role_of(project.id, t.user("stranger").await)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_missing_project_has_no_owner() {
    let t = TestDatabase::new().await;
    let owner = t.db.projects.project_owner(uuid::Uuid::new_v4()).await.unwrap();
    assert!(owner.is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_member_is_conflict() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let member = t.user("member").await;
    let project = t.project(owner, "Conflict").await;

    t.db.members
        .add(project.id, member, MemberRole::Viewer)
        .await
        .unwrap();
    let err = t
        .db
        .members
        .add(project.id, member, MemberRole::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_member_list_puts_owner_first() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let viewer = t.user("viewer").await;
    let project = t.project(owner, "Listing").await;
    t.db.members
        .add(project.id, viewer, MemberRole::Viewer)
        .await
        .unwrap();

    let members = t.db.members.list(project.id, None).await.unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].role, MemberRole::Owner);
    assert_eq!(members[0].user_id, owner);
    assert_eq!(members[1].user_id, viewer);

    let updated = t
        .db
        .members
        .update_role(members[1].id, MemberRole::Member)
        .await
        .unwrap();
    assert_eq!(updated.role, MemberRole::Member);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_issue_list_filters_and_visibility() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let outsider = t.user("outsider").await;
    let project = t.project(owner, "Issues").await;

    let issue = t
        .db
        .issues
        .create(NewIssue {
            project_id: project.id,
            title: "Search_me 100%".to_string(),
            description: None,
            status: IssueStatus::Open,
            priority: IssuePriority::High,
            author_id: owner,
            assignee_id: None,
        })
        .await
        .unwrap();

    let filter = IssueFilter {
        project_id: Some(project.id),
        priority: Some(IssuePriority::High),
        q: Some("100%".to_string()),
        ..Default::default()
    };
    let found = t.db.issues.list(owner, &filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, issue.id);

    assert!(t.db.issues.list(outsider, &filter).await.unwrap().is_empty());

    let mut next = issue.clone();
    next.status = IssueStatus::Resolved;
    let stored = t.db.issues.update(&next).await.unwrap();
    assert_eq!(stored.status, IssueStatus::Resolved);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_only_recipient_can_mark_read() {
    let t = TestDatabase::new().await;
    let recipient = t.user("recipient").await;
    let other = t.user("other").await;

    let n = t
        .db
        .notifications
        .create(NewNotification {
            user_id: recipient,
            kind: NotificationKind::ProjectMemberAdded,
            title: "Added to project".to_string(),
            body: None,
            link: None,
        })
        .await
        .unwrap();
    assert!(!n.read);

    assert!(!t.db.notifications.mark_read(n.id, other).await.unwrap());
    assert!(t.db.notifications.mark_read(n.id, recipient).await.unwrap());
    assert_eq!(t.db.notifications.unread_count(recipient).await.unwrap(), 0);

    let unread = t.db.notifications.list(recipient, true, 20).await.unwrap();
    assert!(unread.is_empty());
    let all = t.db.notifications.list(recipient, false, 20).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_activity_survives_issue_delete() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let project = t.project(owner, "Activity").await;
    let issue = t
        .db
        .issues
        .create(NewIssue {
            project_id: project.id,
            title: "Short lived".to_string(),
            description: None,
            status: IssueStatus::Open,
            priority: IssuePriority::Low,
            author_id: owner,
            assignee_id: None,
        })
        .await
        .unwrap();

    t.db.activities
        .record(NewActivity {
            kind: ActivityKind::IssueDeleted,
            user_id: owner,
            project_id: Some(project.id),
            issue_id: Some(issue.id),
            metadata: Some(json!({ "title": issue.title })),
        })
        .await
        .unwrap();
    assert!(t.db.issues.delete(issue.id).await.unwrap());

    let log = t.db.activities.list_for_project(project.id, 50).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].kind, ActivityKind::IssueDeleted);
    assert_eq!(log[0].issue_id, None);
    assert_eq!(log[0].metadata, Some(json!({ "title": "Short lived" })));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_account_approval_and_rejection() {
    let t = TestDatabase::new().await;
    let user = t.user("applicant").await;

    let account = t.db.users.get_account(user).await.unwrap().unwrap();
    assert_eq!(account.status, AccountStatus::Pending);
    assert_eq!(account.role, AccountRole::Member);
    assert!(!t.db.users.is_admin(user).await.unwrap());

    let pending = t.db.users.list_accounts(Some(AccountStatus::Pending)).await.unwrap();
    assert!(pending.iter().any(|a| a.id == user));

    let rejected = t.db.users.reject(user, Some("duplicate")).await.unwrap().unwrap();
    assert_eq!(rejected.status, AccountStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));

    let approved = t.db.users.approve(user, AccountRole::Admin).await.unwrap().unwrap();
    assert_eq!(approved.status, AccountStatus::Active);
    assert_eq!(approved.role, AccountRole::Admin);
    assert_eq!(approved.rejection_reason, None);
    assert!(t.db.users.is_admin(user).await.unwrap());

    let missing = tracker_core::UserId::random();
    assert!(t.db.users.approve(missing, AccountRole::Member).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_project_update_and_delete() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let project = t.project(owner, "Before").await;

    let mut next = project.clone();
    next.name = "After".to_string();
    next.description = Some("Renamed".to_string());
    let stored = t.db.projects.update(&next).await.unwrap().unwrap();
    assert_eq!(stored.name, "After");
    assert_eq!(stored.description.as_deref(), Some("Renamed"));
    assert!(stored.updated_at >= project.updated_at);

    assert!(t.db.projects.delete(project.id).await.unwrap());
    assert!(t.db.projects.get(project.id).await.unwrap().is_none());
    assert!(!t.db.projects.delete(project.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_issue_label_replacement_reports_diff() {
    let t = TestDatabase::new().await;
    let owner = t.user("owner").await;
    let project = t.project(owner, "Labels").await;
    let issue = t
        .db
        .issues
        .create(NewIssue {
            project_id: project.id,
            title: "Labelled".to_string(),
            description: None,
            status: IssueStatus::Open,
            priority: IssuePriority::Medium,
            author_id: owner,
            assignee_id: None,
        })
        .await
        .unwrap();

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let bug = t.db.labels.create(&format!("bug_{}", suffix), None).await.unwrap();
    let ui = t.db.labels.create(&format!("ui_{}", suffix), Some("#EF4444")).await.unwrap();
    assert_eq!(bug.color, "#3B82F6");
    assert!(matches!(
        t.db.labels.create(&bug.name, None).await,
        Err(Error::Conflict(_))
    ));

    let (added, removed) = t.db.labels.replace_for_issue(issue.id, &[bug.id]).await.unwrap();
    assert_eq!(added, vec![bug.clone()]);
    assert!(removed.is_empty());

    let (added, removed) = t.db.labels.replace_for_issue(issue.id, &[ui.id]).await.unwrap();
    assert_eq!(added, vec![ui.clone()]);
    assert_eq!(removed, vec![bug.clone()]);
    assert_eq!(t.db.labels.for_issue(issue.id).await.unwrap(), vec![ui.clone()]);

    let unknown = uuid::Uuid::new_v4();
    assert!(matches!(
        t.db.labels.replace_for_issue(issue.id, &[bug.id, unknown]).await,
        Err(Error::InvalidInput(_))
    ));
    assert_eq!(t.db.labels.for_issue(issue.id).await.unwrap(), vec![ui]);
}
