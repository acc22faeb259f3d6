//! Account approval for administrators.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use tracker_core::{AccountStatus, ApproveAccountRequest, RejectAccountRequest, UserId};

use super::non_blank;
use crate::auth::RequireAuth;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AccountFilter {
    pub status: Option<String>,
}

async fn require_admin(state: &AppState, user: UserId) -> ApiResult<()> {
    if state.db.users.is_admin(user).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".to_string()))
    }
}

fn account_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

pub async fn list_accounts(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(filter): Query<AccountFilter>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state, auth.user_id).await?;
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<AccountStatus>)
        .transpose()?;
    let users = state.db.users.list_accounts(status).await?;
    Ok(Json(json!({ "users": users })))
}

/// Activate an account and notify its owner.
pub async fn approve_account(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    body: Option<Json<ApproveAccountRequest>>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state, auth.user_id).await?;
    let role = body.map(|Json(b)| b.role).unwrap_or_default();
    let account = state
        .db
        .users
        .approve(id, role)
        .await?
        .ok_or_else(account_not_found)?;
    info!(user_id = %account.id, role = account.role.as_str(), "Account approved");

    state.emitter.account_approved(&account).await;

    Ok(Json(json!({ "message": "User approved", "user": account })))
}

pub async fn reject_account(
    State(state): State<AppState>,
    auth: RequireAuth,
    Path(id): Path<UserId>,
    body: Option<Json<RejectAccountRequest>>,
) -> ApiResult<impl IntoResponse> {
    require_admin(&state, auth.user_id).await?;
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let account = state
        .db
        .users
        .reject(id, non_blank(body.reason.as_deref()))
        .await?
        .ok_or_else(account_not_found)?;
    info!(user_id = %account.id, "Account rejected");

    state.emitter.account_rejected(&account).await;

    Ok(Json(json!({ "message": "User rejected", "user": account })))
}
