//! Issue repository.

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Error, Issue, IssueFilter, IssuePriority, IssueStatus, Result, UserId};

use crate::escape_like;

pub(crate) fn issue_from_row(r: &PgRow) -> Result<Issue> {
    Ok(Issue {
        id: r.get("id"),
        project_id: r.get("project_id"),
        title: r.get("title"),
        description: r.get("description"),
        status: r.get::<String, _>("status").parse()?,
        priority: r.get::<String, _>("priority").parse()?,
        author_id: r.get("author_id"),
        assignee_id: r.get("assignee_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

const ISSUE_COLUMNS: &str = "i.id, i.project_id, i.title, i.description, i.status, i.priority, \
                             i.author_id, i.assignee_id, i.created_at, i.updated_at";

/// Fields of a new issue after validation.
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub author_id: UserId,
    pub assignee_id: Option<UserId>,
}

#[derive(Clone)]
pub struct PgIssueRepository {
    pool: Pool<Postgres>,
}

impl PgIssueRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, new: NewIssue) -> Result<Issue> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO issue (id, project_id, title, description, status, priority,
                               author_id, assignee_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING id, project_id, title, description, status, priority,
                      author_id, assignee_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new.project_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(new.priority.as_str())
        .bind(new.author_id)
        .bind(new.assignee_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        issue_from_row(&row)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Issue>> {
        let row = sqlx::query(&format!("SELECT {} FROM issue i WHERE i.id = $1", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(issue_from_row).transpose()
    }

    /// Issues visible to `viewer` (owned or member projects), newest first.
    pub async fn list(&self, viewer: UserId, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let pattern = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM issue i
            JOIN project p ON p.id = i.project_id
            WHERE (p.owner_id = $1
                   OR EXISTS (SELECT 1 FROM project_member m
                              WHERE m.project_id = p.id AND m.user_id = $1))
              AND ($2::uuid IS NULL OR i.project_id = $2)
              AND ($3::text IS NULL OR i.status = $3)
              AND ($4::text IS NULL OR i.priority = $4)
              AND ($5::uuid IS NULL OR i.assignee_id = $5)
              AND ($6::text IS NULL OR i.title ILIKE $6 OR i.description ILIKE $6)
            ORDER BY i.created_at DESC
            "#,
            ISSUE_COLUMNS
        ))
        .bind(viewer)
        .bind(filter.project_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(filter.assignee_id)
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(issue_from_row).collect()
    }

    /// Persist the mutable fields of `issue` and return the stored row.
    pub async fn update(&self, issue: &Issue) -> Result<Issue> {
        let row = sqlx::query(
            r#"
            UPDATE issue
            SET title = $2, description = $3, status = $4, priority = $5,
                assignee_id = $6, updated_at = $7
            WHERE id = $1
            RETURNING id, project_id, title, description, status, priority,
                      author_id, assignee_id, created_at, updated_at
            "#,
        )
        .bind(issue.id)
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.status.as_str())
        .bind(issue.priority.as_str())
        .bind(issue.assignee_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(r) => issue_from_row(&r),
            None => Err(Error::NotFound("Issue not found".into())),
        }
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM issue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
