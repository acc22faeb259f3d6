//! Label repository and issue label assignment.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Error, Label, Result};

use crate::is_unique_violation;

fn label_from_row(r: &PgRow) -> Label {
    Label {
        id: r.get("id"),
        name: r.get("name"),
        color: r.get("color"),
        created_at: r.get("created_at"),
    }
}

fn map_write_error(e: sqlx::Error) -> Error {
    if is_unique_violation(&e) {
        Error::Conflict("Label with this name already exists".to_string())
    } else {
        Error::Database(e)
    }
}

/// Default color for labels created without one.
pub const DEFAULT_LABEL_COLOR: &str = "#3B82F6";

#[derive(Clone)]
pub struct PgLabelRepository {
    pool: Pool<Postgres>,
}

impl PgLabelRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Every label, by name.
    pub async fn list(&self) -> Result<Vec<Label>> {
        let rows = sqlx::query("SELECT id, name, color, created_at FROM label ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(label_from_row).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Label>> {
        let row = sqlx::query("SELECT id, name, color, created_at FROM label WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(label_from_row))
    }

    /// Create a label. A duplicate name is a `Conflict`.
    pub async fn create(&self, name: &str, color: Option<&str>) -> Result<Label> {
        let row = sqlx::query(
            "INSERT INTO label (id, name, color, created_at) VALUES ($1, $2, $3, $4)
             RETURNING id, name, color, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(color.unwrap_or(DEFAULT_LABEL_COLOR))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(label_from_row(&row))
    }

    /// Update name and color from `next`. `None` when the label is gone.
    pub async fn update(&self, next: &Label) -> Result<Option<Label>> {
        let row = sqlx::query(
            "UPDATE label SET name = $2, color = $3 WHERE id = $1
             RETURNING id, name, color, created_at",
        )
        .bind(next.id)
        .bind(&next.name)
        .bind(&next.color)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(row.as_ref().map(label_from_row))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM label WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Labels attached to an issue, by name.
    pub async fn for_issue(&self, issue_id: Uuid) -> Result<Vec<Label>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.name, l.color, l.created_at
            FROM label l
            JOIN issue_label il ON il.label_id = l.id
            WHERE il.issue_id = $1
            ORDER BY l.name
            "#,
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(label_from_row).collect())
    }

    /// Replace an issue's label set. Returns the labels that were attached
    /// and detached. An unknown label id fails the whole call with
    /// `InvalidInput` and leaves the set unchanged.
    pub async fn replace_for_issue(
        &self,
        issue_id: Uuid,
        label_ids: &[Uuid],
    ) -> Result<(Vec<Label>, Vec<Label>)> {
        let wanted: HashSet<Uuid> = label_ids.iter().copied().collect();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let rows = sqlx::query("SELECT id, name, color, created_at FROM label WHERE id = ANY($1)")
            .bind(wanted.iter().copied().collect::<Vec<_>>())
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if rows.len() != wanted.len() {
            return Err(Error::InvalidInput("Label not found".to_string()));
        }
        let requested: Vec<Label> = rows.iter().map(label_from_row).collect();

        let rows = sqlx::query(
            r#"
            SELECT l.id, l.name, l.color, l.created_at
            FROM label l
            JOIN issue_label il ON il.label_id = l.id
            WHERE il.issue_id = $1
            "#,
        )
        .bind(issue_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(Error::Database)?;
        let current: Vec<Label> = rows.iter().map(label_from_row).collect();
        let current_ids: HashSet<Uuid> = current.iter().map(|l| l.id).collect();

        sqlx::query("DELETE FROM issue_label WHERE issue_id = $1")
            .bind(issue_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query(
            "INSERT INTO issue_label (issue_id, label_id) SELECT $1, UNNEST($2::uuid[])",
        )
        .bind(issue_id)
        .bind(wanted.iter().copied().collect::<Vec<_>>())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        let mut added: Vec<Label> = requested
            .into_iter()
            .filter(|l| !current_ids.contains(&l.id))
            .collect();
        let mut removed: Vec<Label> = current
            .into_iter()
            .filter(|l| !wanted.contains(&l.id))
            .collect();
        added.sort_by(|a, b| a.name.cmp(&b.name));
        removed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok((added, removed))
    }
}
