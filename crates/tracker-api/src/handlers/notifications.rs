use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use tracker_core::defaults::{NOTIFICATION_LIMIT, NOTIFICATION_LIMIT_MAX};

use super::clamp_limit;
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

/// The caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<impl IntoResponse> {
    let limit = clamp_limit(query.limit, NOTIFICATION_LIMIT, NOTIFICATION_LIMIT_MAX);
    let notifications = state
        .db
        .notifications
        .list(auth.user_id, query.unread_only, limit)
        .await?;
    let unread = state.db.notifications.unread_count(auth.user_id).await?;
    Ok(Json(json!({
        "notifications": notifications,
        "unreadCount": unread,
    })))
}

/// Mark one notification read. Only its recipient may do so.
pub async fn mark_read(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.notifications.mark_read(id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(Json(json!({ "message": "Marked as read" })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> ApiResult<impl IntoResponse> {
    let updated = state.db.notifications.mark_all_read(auth.user_id).await?;
    debug!(user_id = %auth.user_id, updated, "Marked all notifications read");
    Ok(Json(json!({ "message": "All notifications marked as read" })))
}
