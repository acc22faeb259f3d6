//! Project membership repository.

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Error, MemberRole, ProjectMember, Result, UserId};

use crate::users::user_from_row;
use crate::{escape_like, is_unique_violation};

fn member_from_row(r: &PgRow) -> Result<ProjectMember> {
    Ok(ProjectMember {
        id: r.get("id"),
        project_id: r.get("project_id"),
        user_id: r.get("user_id"),
        role: r.get::<String, _>("role").parse()?,
        created_at: r.get("created_at"),
        user: user_from_row(r, "u_"),
    })
}

const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.project_id, m.user_id, m.role, m.created_at,
           u.id AS u_id, u.username AS u_username, u.email AS u_email, u.name AS u_name
    FROM project_member m
    JOIN app_user u ON u.id = m.user_id
"#;

#[derive(Clone)]
pub struct PgMemberRepository {
    pool: Pool<Postgres>,
}

impl PgMemberRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Members of a project with the owner listed first as `OWNER`.
    ///
    /// The owner entry has no membership row; its `id` is the project id.
    /// `q` filters case-insensitively on username, email and name.
    pub async fn list(&self, project_id: Uuid, q: Option<&str>) -> Result<Vec<ProjectMember>> {
        let pattern = q
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let owner_row = sqlx::query(
            r#"
            SELECT p.id, p.id AS project_id, p.owner_id AS user_id, p.created_at,
                   u.id AS u_id, u.username AS u_username, u.email AS u_email, u.name AS u_name
            FROM project p
            JOIN app_user u ON u.id = p.owner_id
            WHERE p.id = $1
              AND ($2::text IS NULL
                   OR u.username ILIKE $2 OR u.email ILIKE $2 OR u.name ILIKE $2)
            "#,
        )
        .bind(project_id)
        .bind(pattern.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let rows = sqlx::query(&format!(
            r#"{}
            WHERE m.project_id = $1
              AND ($2::text IS NULL
                   OR u.username ILIKE $2 OR u.email ILIKE $2 OR u.name ILIKE $2)
            ORDER BY m.role ASC, m.created_at ASC
            "#,
            MEMBER_SELECT
        ))
        .bind(project_id)
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut members = Vec::with_capacity(rows.len() + 1);
        if let Some(r) = owner_row {
            members.push(ProjectMember {
                id: r.get("id"),
                project_id: r.get("project_id"),
                user_id: r.get("user_id"),
                role: MemberRole::Owner,
                created_at: r.get("created_at"),
                user: user_from_row(&r, "u_"),
            });
        }
        for r in &rows {
            members.push(member_from_row(r)?);
        }
        Ok(members)
    }

    pub async fn get(&self, member_id: Uuid) -> Result<Option<ProjectMember>> {
        let row = sqlx::query(&format!("{} WHERE m.id = $1", MEMBER_SELECT))
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(member_from_row).transpose()
    }

    /// Add a member. A duplicate membership is a `Conflict`.
    pub async fn add(
        &self,
        project_id: Uuid,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<ProjectMember> {
        if role == MemberRole::Owner {
            return Err(Error::InvalidInput("role must be MEMBER or VIEWER".into()));
        }
        let id = Uuid::now_v7();

        sqlx::query(
            "INSERT INTO project_member (id, project_id, user_id, role, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict("User is already a member of this project".into())
            } else {
                Error::Database(e)
            }
        })?;

        self.get(id)
            .await?
            .ok_or_else(|| Error::Internal(format!("member {} vanished after insert", id)))
    }

    /// Change a member's role, returning the updated row.
    pub async fn update_role(&self, member_id: Uuid, role: MemberRole) -> Result<ProjectMember> {
        if role == MemberRole::Owner {
            return Err(Error::InvalidInput("role must be MEMBER or VIEWER".into()));
        }
        let result = sqlx::query("UPDATE project_member SET role = $1 WHERE id = $2")
            .bind(role.as_str())
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Member not found".into()));
        }

        self.get(member_id)
            .await?
            .ok_or_else(|| Error::NotFound("Member not found".into()))
    }

    pub async fn remove(&self, member_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project_member WHERE id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
