//! User repository. Accounts are provisioned by the auth service; this crate
//! reads them, moves them through administrator approval, and inserts rows
//! for fixtures and seeding.

use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use tracker_core::{Account, AccountRole, AccountStatus, Error, Result, UserId, UserSummary};

const ACCOUNT_COLUMNS: &str =
    "id, username, email, name, status, role, rejection_reason, created_at, updated_at";

fn account_from_row(r: &PgRow) -> Result<Account> {
    Ok(Account {
        id: r.get("id"),
        username: r.get("username"),
        email: r.get("email"),
        name: r.get("name"),
        status: r.get::<String, _>("status").parse()?,
        role: r.get::<String, _>("role").parse()?,
        rejection_reason: r.get("rejection_reason"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    })
}

pub(crate) fn user_from_row(row: &PgRow, prefix: &str) -> UserSummary {
    let col = |name: &str| format!("{}{}", prefix, name);
    UserSummary {
        id: row.get(col("id").as_str()),
        username: row.get(col("username").as_str()),
        email: row.get(col("email").as_str()),
        name: row.get(col("name").as_str()),
    }
}

/// PostgreSQL user lookups.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, username: &str, email: &str, name: Option<&str>) -> Result<UserId> {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO app_user (id, username, email, name) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(UserId::new(id))
    }

    pub async fn get(&self, id: UserId) -> Result<Option<UserSummary>> {
        let row = sqlx::query("SELECT id, username, email, name FROM app_user WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(|r| user_from_row(&r, "")))
    }

    pub async fn exists(&self, id: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    /// Accounts for the admin console, newest first, optionally by status.
    pub async fn list_accounts(&self, status: Option<AccountStatus>) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM app_user
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at DESC",
            ACCOUNT_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(account_from_row).collect()
    }

    pub async fn get_account(&self, id: UserId) -> Result<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM app_user WHERE id = $1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(account_from_row).transpose()
    }

    /// Activate an account with the given role, clearing any rejection.
    /// `None` when the account does not exist.
    pub async fn approve(&self, id: UserId, role: AccountRole) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "UPDATE app_user
             SET status = 'ACTIVE', role = $2, rejection_reason = NULL, updated_at = $3
             WHERE id = $1
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(account_from_row).transpose()
    }

    pub async fn reject(&self, id: UserId, reason: Option<&str>) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "UPDATE app_user
             SET status = 'REJECTED', rejection_reason = $2, updated_at = $3
             WHERE id = $1
             RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(reason)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(account_from_row).transpose()
    }

    /// Whether the account is an active administrator.
    pub async fn is_admin(&self, id: UserId) -> Result<bool> {
        let admin: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM app_user WHERE id = $1 AND role = 'ADMIN' AND status = 'ACTIVE')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(admin)
    }
}
