use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use tracker_core::{CreateLabelRequest, UpdateLabelRequest};

use super::non_blank;
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn label_not_found() -> ApiError {
    ApiError::NotFound("Label not found".to_string())
}

pub async fn list_labels(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> ApiResult<impl IntoResponse> {
    let labels = state.db.labels.list().await?;
    Ok(Json(json!({ "labels": labels })))
}

pub async fn create_label(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Json(body): Json<CreateLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = non_blank(Some(body.name.as_str()))
        .ok_or_else(|| ApiError::BadRequest("Label name is required".to_string()))?;
    let label = state
        .db
        .labels
        .create(name, non_blank(body.color.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "label": label }))))
}

pub async fn update_label(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLabelRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut label = state.db.labels.get(id).await?.ok_or_else(label_not_found)?;
    if let Some(name) = non_blank(body.name.as_deref()) {
        label.name = name.to_string();
    }
    if let Some(color) = non_blank(body.color.as_deref()) {
        label.color = color.to_string();
    }
    let label = state
        .db
        .labels
        .update(&label)
        .await?
        .ok_or_else(label_not_found)?;
    Ok(Json(json!({ "label": label })))
}

/// Delete a label. It is detached from every issue.
pub async fn delete_label(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.labels.delete(id).await? {
        return Err(label_not_found());
    }
    Ok(Json(json!({ "message": "Label deleted successfully" })))
}
