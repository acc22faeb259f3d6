//! Project repository and the Postgres-backed project directory.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Error, MemberRole, Project, ProjectDirectory, Result, UserId};

fn project_from_row(r: &PgRow) -> Project {
    Project {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
        owner_id: r.get("owner_id"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.owner_id, p.created_at, p.updated_at";

/// PostgreSQL implementation of project storage.
#[derive(Clone)]
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        owner: UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO project (id, name, description, owner_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id, name, description, owner_id, created_at, updated_at",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(owner)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(project_from_row(&row))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {} FROM project p WHERE p.id = $1", PROJECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(project_from_row))
    }

    /// Persist name and description from `next`. Returns the stored row,
    /// `None` when the project no longer exists.
    pub async fn update(&self, next: &Project) -> Result<Option<Project>> {
        let row = sqlx::query(
            "UPDATE project SET name = $2, description = $3, updated_at = $4
             WHERE id = $1
             RETURNING id, name, description, owner_id, created_at, updated_at",
        )
        .bind(next.id)
        .bind(&next.name)
        .bind(&next.description)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(project_from_row))
    }

    /// Delete a project with its issues, comments and memberships.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Projects the user owns or is a member of, newest first.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM project p
            WHERE p.owner_id = $1
               OR EXISTS (SELECT 1 FROM project_member m WHERE m.project_id = p.id AND m.user_id = $1)
            ORDER BY p.created_at DESC
            "#,
            PROJECT_COLUMNS
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Role of `user` in the project: `Owner` for the owner, the member role
    /// otherwise, `None` without access (or when the project does not exist).
    pub async fn role_of(&self, project_id: Uuid, user: UserId) -> Result<Option<MemberRole>> {
        let row = sqlx::query(
            r#"
            SELECT p.owner_id, m.role
            FROM project p
            LEFT JOIN project_member m ON m.project_id = p.id AND m.user_id = $2
            WHERE p.id = $1
            "#,
        )
        .bind(project_id)
        .bind(user)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let owner: UserId = row.get("owner_id");
        if owner == user {
            return Ok(Some(MemberRole::Owner));
        }
        row.get::<Option<String>, _>("role")
            .map(|r| r.parse::<MemberRole>())
            .transpose()
    }
}

#[async_trait]
impl ProjectDirectory for PgProjectRepository {
    async fn project_owner(&self, project_id: Uuid) -> Result<Option<UserId>> {
        sqlx::query_scalar("SELECT owner_id FROM project WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn member_ids(&self, project_id: Uuid) -> Result<Vec<UserId>> {
        sqlx::query_scalar("SELECT user_id FROM project_member WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }
}
