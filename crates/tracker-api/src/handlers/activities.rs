use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use tracker_core::defaults::{ACTIVITY_LIMIT, ACTIVITY_LIMIT_MAX};

use super::{clamp_limit, issue_access, project_access};
use crate::auth::RequireAuth;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

pub async fn project_activities(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(project_id): Path<Uuid>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<impl IntoResponse> {
    project_access(
        &state,
        project_id,
        auth.user_id,
        "You do not have permission to access this project",
    )
    .await?;
    let limit = clamp_limit(query.limit, ACTIVITY_LIMIT, ACTIVITY_LIMIT_MAX);
    let activities = state
        .db
        .activities
        .list_for_project(project_id, limit)
        .await?;
    Ok(Json(json!({ "activities": activities })))
}

pub async fn issue_activities(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(issue_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    issue_access(
        &state,
        issue_id,
        auth.user_id,
        "You do not have permission to access this issue",
    )
    .await?;
    let activities = state.db.activities.list_for_issue(issue_id).await?;
    Ok(Json(json!({ "activities": activities })))
}
