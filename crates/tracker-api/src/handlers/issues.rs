use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tracker_core::{
    Comment, CreateIssueRequest, Issue, IssueFilter, Label, UpdateIssueRequest, UserId,
};
use tracker_db::NewIssue;

use super::{issue_access, non_blank, owned_project, project_access};
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct IssueDetail {
    #[serde(flatten)]
    issue: Issue,
    labels: Vec<Label>,
    comments: Vec<Comment>,
}

async fn ensure_user_exists(state: &AppState, user: Option<UserId>) -> ApiResult<()> {
    if let Some(user) = user {
        if !state.db.users.exists(user).await? {
            return Err(ApiError::BadRequest("Assignee not found".to_string()));
        }
    }
    Ok(())
}

/// Issues visible to the caller, optionally narrowed by the filter.
pub async fn list_issues(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(filter): Query<IssueFilter>,
) -> ApiResult<impl IntoResponse> {
    if let Some(project_id) = filter.project_id {
        project_access(
            &state,
            project_id,
            auth.user_id,
            "You do not have permission to access this project",
        )
        .await?;
    }
    let issues = state.db.issues.list(auth.user_id, &filter).await?;
    Ok(Json(json!({ "issues": issues })))
}

pub async fn get_issue(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (issue, _, _) = issue_access(
        &state,
        id,
        auth.user_id,
        "You do not have permission to access this issue",
    )
    .await?;
    let labels = state.db.labels.for_issue(issue.id).await?;
    let comments = state.db.comments.list_for_issue(issue.id).await?;
    let detail = IssueDetail {
        issue,
        labels,
        comments,
    };
    Ok(Json(json!({ "issue": detail })))
}

/// Create an issue. Only the project owner may create issues.
pub async fn create_issue(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateIssueRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = non_blank(Some(body.title.as_str()))
        .ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?;
    let project = owned_project(&state, body.project_id, auth.user_id, "Project not found").await?;
    ensure_user_exists(&state, body.assignee_id).await?;

    let issue = state
        .db
        .issues
        .create(NewIssue {
            project_id: project.id,
            title: title.to_string(),
            description: non_blank(body.description.as_deref()).map(str::to_string),
            status: body.status.unwrap_or_default(),
            priority: body.priority.unwrap_or_default(),
            author_id: auth.user_id,
            assignee_id: body.assignee_id,
        })
        .await?;
    info!(issue_id = %issue.id, project_id = %project.id, "Issue created");

    state
        .emitter
        .issue_created(auth.user_id, &project, &issue)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Issue created successfully",
            "issue": issue,
        })),
    ))
}

pub async fn update_issue(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateIssueRequest>,
) -> ApiResult<impl IntoResponse> {
    let (before, project, _) = issue_access(
        &state,
        id,
        auth.user_id,
        "You do not have permission to update this issue",
    )
    .await?;

    let next = body.apply_to(&before);
    if next.assignee_id != before.assignee_id {
        ensure_user_exists(&state, next.assignee_id).await?;
    }
    let label_diff = match &body.label_ids {
        Some(ids) => Some(state.db.labels.replace_for_issue(before.id, ids).await?),
        None => None,
    };
    let after = state.db.issues.update(&next).await?;

    if let Some((added, removed)) = &label_diff {
        state
            .emitter
            .issue_labels_changed(auth.user_id, &after, added, removed)
            .await;
    }
    state
        .emitter
        .issue_updated(auth.user_id, &project, &before, &after)
        .await;

    let labels = state.db.labels.for_issue(after.id).await?;
    Ok(Json(json!({
        "message": "Issue updated successfully",
        "issue": after,
        "labels": labels,
    })))
}

/// Delete an issue. Only the project owner may delete; anyone else sees 404.
pub async fn delete_issue(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let not_found = || ApiError::NotFound("Issue not found".to_string());
    let issue = state.db.issues.get(id).await?.ok_or_else(not_found)?;
    owned_project(&state, issue.project_id, auth.user_id, "Issue not found").await?;

    state.emitter.issue_deleted(auth.user_id, &issue).await;
    if !state.db.issues.delete(issue.id).await? {
        return Err(not_found());
    }
    info!(issue_id = %issue.id, "Issue deleted");

    Ok(Json(json!({ "message": "Issue deleted successfully" })))
}
