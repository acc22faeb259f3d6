use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tracker_core::{CreateProjectRequest, UpdateProjectRequest};

use super::{non_blank, owned_project, project_access};
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Projects the caller owns or belongs to.
pub async fn list_projects(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> ApiResult<impl IntoResponse> {
    let projects = state.db.projects.list_for_user(auth.user_id).await?;
    Ok(Json(json!({ "projects": projects })))
}

pub async fn create_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = non_blank(Some(body.name.as_str()))
        .ok_or_else(|| ApiError::BadRequest("Project name is required".to_string()))?;
    let project = state
        .db
        .projects
        .create(auth.user_id, name, non_blank(body.description.as_deref()))
        .await?;
    info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Project created successfully",
            "project": project,
        })),
    ))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let (project, role) = project_access(
        &state,
        id,
        auth.user_id,
        "You do not have permission to access this project",
    )
    .await?;
    Ok(Json(json!({ "project": project, "userRole": role })))
}

/// Rename or re-describe a project. Owner only; anyone else sees 404.
pub async fn update_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    let before = owned_project(&state, id, auth.user_id, "Project not found").await?;
    let next = body.apply_to(&before);
    let after = state
        .db
        .projects
        .update(&next)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    state
        .emitter
        .project_updated(auth.user_id, &before, &after)
        .await;

    Ok(Json(json!({
        "message": "Project updated successfully",
        "project": after,
    })))
}

/// Delete a project and everything in it. Owner only.
pub async fn delete_project(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let project = owned_project(&state, id, auth.user_id, "Project not found").await?;
    if !state.db.projects.delete(project.id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    info!(project_id = %project.id, "Project deleted");
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}
