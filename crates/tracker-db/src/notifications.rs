//! Durable notification storage.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use tracker_core::{Error, NewNotification, Notification, NotificationStore, Result, UserId};
use tracker_core::logging::{COMPONENT_NOTIFICATIONS, SUBSYSTEM_DB};

fn notification_from_row(r: &PgRow) -> Result<Notification> {
    Ok(Notification {
        id: r.get("id"),
        user_id: r.get("user_id"),
        kind: r.get::<String, _>("type").parse()?,
        title: r.get("title"),
        body: r.get("body"),
        link: r.get("link"),
        read: r.get("read"),
        created_at: r.get("created_at"),
    })
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: Pool<Postgres>,
}

impl PgNotificationRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Newest-first notifications for `user`.
    pub async fn list(
        &self,
        user: UserId,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, type, title, body, link, read, created_at
            FROM notification
            WHERE user_id = $1 AND ($2 = false OR read = false)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(notification_from_row).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(
            "SELECT id, user_id, type, title, body, link, read, created_at
             FROM notification WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(notification_from_row).transpose()
    }

    /// Mark one notification read. Only its recipient may do so; returns
    /// `false` when no row matched `(id, user)`.
    pub async fn mark_read(&self, id: Uuid, user: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE notification SET read = true WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of rows changed.
    pub async fn mark_all_read(&self, user: UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notification SET read = true WHERE user_id = $1 AND read = false")
                .bind(user)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user: UserId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notification WHERE user_id = $1 AND read = false")
            .bind(user)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl NotificationStore for PgNotificationRepository {
    async fn create(&self, n: NewNotification) -> Result<Notification> {
        let row = sqlx::query(
            r#"
            INSERT INTO notification (id, user_id, type, title, body, link, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, false, $7)
            RETURNING id, user_id, type, title, body, link, read, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(n.user_id)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.body)
        .bind(&n.link)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let created = notification_from_row(&row)?;
        debug!(
            subsystem = SUBSYSTEM_DB,
            component = COMPONENT_NOTIFICATIONS,
            user_id = %created.user_id,
            notification_type = created.kind.as_str(),
            "Notification stored"
        );
        Ok(created)
    }
}
