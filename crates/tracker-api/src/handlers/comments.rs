use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tracker_core::{Comment, CreateCommentRequest, Project, UpdateCommentRequest, UserId};

use super::{issue_access, non_blank};
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn required_content(content: &str) -> ApiResult<&str> {
    non_blank(Some(content)).ok_or_else(|| ApiError::BadRequest("Content is required".to_string()))
}

/// Load a comment for modification. The comment author and the project
/// owner may modify it.
async fn modifiable_comment(
    state: &AppState,
    id: Uuid,
    user: UserId,
    denied: &str,
) -> ApiResult<(Comment, Project)> {
    let not_found = || ApiError::NotFound("Comment not found".to_string());
    let comment = state.db.comments.get(id).await?.ok_or_else(not_found)?;
    let issue = state
        .db
        .issues
        .get(comment.issue_id)
        .await?
        .ok_or_else(not_found)?;
    let project = state
        .db
        .projects
        .get(issue.project_id)
        .await?
        .ok_or_else(not_found)?;

    if comment.author_id != user && project.owner_id != user {
        return Err(ApiError::Forbidden(denied.to_string()));
    }
    Ok((comment, project))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required_content(&body.content)?;
    let (issue, project, _) = issue_access(
        &state,
        body.issue_id,
        auth.user_id,
        "You do not have permission to comment on this issue",
    )
    .await?;

    let comment = state
        .db
        .comments
        .create(issue.id, auth.user_id, content)
        .await?;
    info!(comment_id = %comment.id, issue_id = %issue.id, "Comment created");

    state
        .emitter
        .comment_created(auth.user_id, &project, &issue, &comment)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment created successfully",
            "comment": comment,
        })),
    ))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = required_content(&body.content)?;
    let (comment, _) = modifiable_comment(
        &state,
        id,
        auth.user_id,
        "You do not have permission to edit this comment",
    )
    .await?;

    let updated = state.db.comments.update_content(comment.id, content).await?;
    Ok(Json(json!({
        "message": "Comment updated successfully",
        "comment": updated,
    })))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (comment, project) = modifiable_comment(
        &state,
        id,
        auth.user_id,
        "You do not have permission to delete this comment",
    )
    .await?;

    state
        .emitter
        .comment_deleted(auth.user_id, project.id, &comment)
        .await;
    state.db.comments.delete(comment.id).await?;
    info!(comment_id = %comment.id, "Comment deleted");

    Ok(Json(json!({ "message": "Comment deleted successfully" })))
}
