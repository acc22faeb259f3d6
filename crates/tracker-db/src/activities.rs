//! Append-only activity log.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Activity, ActivityStore, Error, NewActivity, Result};

fn activity_from_row(r: &PgRow) -> Result<Activity> {
    Ok(Activity {
        id: r.get("id"),
        kind: r.get::<String, _>("type").parse()?,
        user_id: r.get("user_id"),
        project_id: r.get("project_id"),
        issue_id: r.get("issue_id"),
        metadata: r.get("metadata"),
        created_at: r.get("created_at"),
    })
}

#[derive(Clone)]
pub struct PgActivityRepository {
    pool: Pool<Postgres>,
}

impl PgActivityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list_for_project(&self, project_id: Uuid, limit: i64) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            "SELECT id, type, user_id, project_id, issue_id, metadata, created_at
             FROM activity WHERE project_id = $1
             ORDER BY created_at DESC LIMIT $2",
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(activity_from_row).collect()
    }

    pub async fn list_for_issue(&self, issue_id: Uuid) -> Result<Vec<Activity>> {
        let rows = sqlx::query(
            "SELECT id, type, user_id, project_id, issue_id, metadata, created_at
             FROM activity WHERE issue_id = $1
             ORDER BY created_at DESC",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(activity_from_row).collect()
    }
}

#[async_trait]
impl ActivityStore for PgActivityRepository {
    async fn record(&self, a: NewActivity) -> Result<Activity> {
        let row = sqlx::query(
            r#"
            INSERT INTO activity (id, type, user_id, project_id, issue_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, type, user_id, project_id, issue_id, metadata, created_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(a.kind.as_str())
        .bind(a.user_id)
        .bind(a.project_id)
        .bind(a.issue_id)
        .bind(&a.metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        activity_from_row(&row)
    }
}
