//! # tracker-api
//!
//! HTTP API for the issue tracker. Mutation handlers commit their write and
//! then hand the result to the [`EventEmitter`](tracker_core::EventEmitter),
//! which records activity, persists notifications and pushes live events to
//! clients subscribed on `GET /api/realtime`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use tracker_core::defaults::REALTIME_PATH;

pub use config::{RealtimeConfig, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use handlers::{
    activities, admin, comments, health, issues, labels, members, notifications, projects, realtime,
};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn app(state: AppState, allowed_origins: Vec<HeaderValue>) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route(REALTIME_PATH, get(realtime::subscribe))
        // Projects and membership
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/api/projects/:id/members",
            get(members::list_members).post(members::add_member),
        )
        .route(
            "/api/projects/:id/members/:member_id",
            put(members::update_member_role).delete(members::remove_member),
        )
        .route(
            "/api/projects/:id/activities",
            get(activities::project_activities),
        )
        // Issues and comments
        .route(
            "/api/issues",
            get(issues::list_issues).post(issues::create_issue),
        )
        .route(
            "/api/issues/:id",
            get(issues::get_issue)
                .put(issues::update_issue)
                .delete(issues::delete_issue),
        )
        .route(
            "/api/issues/:id/activities",
            get(activities::issue_activities),
        )
        .route("/api/comments", post(comments::create_comment))
        .route(
            "/api/comments/:id",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        // Labels
        .route(
            "/api/labels",
            get(labels::list_labels).post(labels::create_label),
        )
        .route(
            "/api/labels/:id",
            put(labels::update_label).delete(labels::delete_label),
        )
        // Notifications
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:id/read",
            post(notifications::mark_read),
        )
        // Administration
        .route("/api/admin/users", get(admin::list_accounts))
        .route(
            "/api/admin/users/:id/approve",
            post(admin::approve_account),
        )
        .route("/api/admin/users/:id/reject", post(admin::reject_account))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed_origins))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600)),
        )
        .with_state(state)
}
