//! Collaborator traits consumed by the realtime core.
//!
//! The emitter and resolver only depend on these interfaces; `tracker-db`
//! provides the Postgres implementations and tests use in-memory stores.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

/// Read access to project ownership and membership.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Owner of the project, or `None` if the project does not exist.
    async fn project_owner(&self, project_id: Uuid) -> Result<Option<UserId>>;

    /// User ids of every member row (owner excluded).
    async fn member_ids(&self, project_id: Uuid) -> Result<Vec<UserId>>;
}

/// Durable notification persistence.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification>;
}

/// Append-only activity persistence.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn record(&self, activity: NewActivity) -> Result<Activity>;
}
