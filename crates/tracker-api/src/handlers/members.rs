use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use tracker_core::{AddMemberRequest, MemberRole, Project, ProjectMember, UpdateMemberRoleRequest};

use super::{non_blank, owned_project, project_access};
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const NOT_OWNER: &str = "Project not found or you do not have permission";

#[derive(Debug, Deserialize)]
pub struct MemberQuery {
    pub q: Option<String>,
}

/// Resolve a membership row of `project`. The owner has no row; addressing
/// the owner entry yields `400 owner_error`.
async fn project_member(
    state: &AppState,
    project: &Project,
    member_id: Uuid,
    owner_error: &str,
) -> ApiResult<ProjectMember> {
    if member_id == project.id {
        return Err(ApiError::BadRequest(owner_error.to_string()));
    }
    let member = state
        .db
        .members
        .get(member_id)
        .await?
        .filter(|m| m.project_id == project.id)
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;
    if member.user_id == project.owner_id {
        return Err(ApiError::BadRequest(owner_error.to_string()));
    }
    Ok(member)
}

fn assignable_role(role: MemberRole) -> ApiResult<MemberRole> {
    match role {
        MemberRole::Owner => Err(ApiError::BadRequest(
            "Role must be MEMBER or VIEWER".to_string(),
        )),
        other => Ok(other),
    }
}

/// Members of a project, owner first. `q` filters by username, email or name.
pub async fn list_members(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project_id): Path<Uuid>,
    Query(query): Query<MemberQuery>,
) -> ApiResult<impl IntoResponse> {
    project_access(
        &state,
        project_id,
        auth.user_id,
        "You do not have permission to access this project",
    )
    .await?;
    let members = state
        .db
        .members
        .list(project_id, non_blank(query.q.as_deref()))
        .await?;
    Ok(Json(json!({ "members": members })))
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = owned_project(&state, project_id, auth.user_id, NOT_OWNER).await?;
    if body.user_id == project.owner_id {
        return Err(ApiError::BadRequest(
            "Project owner cannot be added as a member".to_string(),
        ));
    }
    let role = assignable_role(body.role)?;
    if !state.db.users.exists(body.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let member = state.db.members.add(project.id, body.user_id, role).await?;
    info!(
        project_id = %project.id,
        user_id = %member.user_id,
        role = %member.role,
        "Member added"
    );

    state
        .emitter
        .member_added(auth.user_id, &project, &member)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Member added successfully",
            "member": member,
        })),
    ))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let project = owned_project(&state, project_id, auth.user_id, NOT_OWNER).await?;
    let member = project_member(&state, &project, member_id, "Cannot change owner role").await?;
    let role = assignable_role(body.role)?;

    let previous = member.role;
    let updated = state.db.members.update_role(member.id, role).await?;

    state
        .emitter
        .member_role_changed(auth.user_id, &project, &updated, previous)
        .await;

    Ok(Json(json!({
        "message": "Member role updated successfully",
        "member": updated,
    })))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let project = owned_project(&state, project_id, auth.user_id, NOT_OWNER).await?;
    let member = project_member(&state, &project, member_id, "Cannot remove project owner").await?;

    if !state.db.members.remove(member.id).await? {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }
    info!(project_id = %project.id, user_id = %member.user_id, "Member removed");

    state
        .emitter
        .member_removed(auth.user_id, project.id, &member)
        .await;

    Ok(Json(json!({ "message": "Member removed successfully" })))
}
