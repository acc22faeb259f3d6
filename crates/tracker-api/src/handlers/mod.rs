//! Request handlers, grouped by resource.

pub mod activities;
pub mod admin;
pub mod comments;
pub mod health;
pub mod issues;
pub mod labels;
pub mod members;
pub mod notifications;
pub mod projects;
pub mod realtime;

use uuid::Uuid;

use tracker_core::{Issue, MemberRole, Project, UserId};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Load a project and the caller's role in it. Owners and members pass;
/// anyone else gets `403 denied`.
pub(crate) async fn project_access(
    state: &AppState,
    project_id: Uuid,
    user: UserId,
    denied: &str,
) -> ApiResult<(Project, MemberRole)> {
    let project = state
        .db
        .projects
        .get(project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;
    let role = state
        .db
        .projects
        .role_of(project_id, user)
        .await?
        .ok_or_else(|| ApiError::Forbidden(denied.to_string()))?;
    Ok((project, role))
}

/// Load a project only if `user` owns it. Otherwise `404 not_found`, so the
/// response does not reveal whether the project exists.
pub(crate) async fn owned_project(
    state: &AppState,
    project_id: Uuid,
    user: UserId,
    not_found: &str,
) -> ApiResult<Project> {
    state
        .db
        .projects
        .get(project_id)
        .await?
        .filter(|p| p.owner_id == user)
        .ok_or_else(|| ApiError::NotFound(not_found.to_string()))
}

/// Load an issue with its project, requiring owner or member access.
pub(crate) async fn issue_access(
    state: &AppState,
    issue_id: Uuid,
    user: UserId,
    denied: &str,
) -> ApiResult<(Issue, Project, MemberRole)> {
    let issue = state
        .db
        .issues
        .get(issue_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Issue not found".to_string()))?;
    let (project, role) = project_access(state, issue.project_id, user, denied).await?;
    Ok((issue, project, role))
}

/// Resolve a `limit` query value: missing or non-positive uses `default`,
/// anything above `max` is capped.
pub(crate) fn clamp_limit(raw: Option<i64>, default: i64, max: i64) -> i64 {
    match raw {
        Some(n) if n > 0 => n.min(max),
        _ => default,
    }
}

/// Trim free text, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
