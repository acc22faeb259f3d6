//! Comment repository.

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Comment, Error, Result, UserId};

fn comment_from_row(r: &PgRow) -> Comment {
    Comment {
        id: r.get("id"),
        issue_id: r.get("issue_id"),
        author_id: r.get("author_id"),
        content: r.get("content"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: Pool<Postgres>,
}

impl PgCommentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, issue_id: Uuid, author: UserId, content: &str) -> Result<Comment> {
        let row = sqlx::query(
            "INSERT INTO comment (id, issue_id, author_id, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id, issue_id, author_id, content, created_at, updated_at",
        )
        .bind(Uuid::now_v7())
        .bind(issue_id)
        .bind(author)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(comment_from_row(&row))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, issue_id, author_id, content, created_at, updated_at
             FROM comment WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(comment_from_row))
    }

    /// Comments on an issue, oldest first.
    pub async fn list_for_issue(&self, issue_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT id, issue_id, author_id, content, created_at, updated_at
             FROM comment WHERE issue_id = $1 ORDER BY created_at ASC",
        )
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    pub async fn update_content(&self, id: Uuid, content: &str) -> Result<Comment> {
        let row = sqlx::query(
            "UPDATE comment SET content = $2, updated_at = $3 WHERE id = $1
             RETURNING id, issue_id, author_id, content, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref()
            .map(comment_from_row)
            .ok_or_else(|| Error::NotFound("Comment not found".into()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
