//! # tracker-db
//!
//! PostgreSQL persistence for the issue tracker.
//!
//! This crate provides:
//! - Connection pool management
//! - Repositories for users, projects, members, issues, comments and labels
//! - Durable notifications and the activity log
//! - Postgres implementations of the core collaborator traits
//!   ([`ProjectDirectory`](tracker_core::ProjectDirectory),
//!   [`NotificationStore`](tracker_core::NotificationStore),
//!   [`ActivityStore`](tracker_core::ActivityStore))
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracker_db::Database;
//!
//! let db = Database::connect("postgres://localhost/tracker").await?;
//! db.migrate().await?;
//! let projects = db.projects.list_for_user(user_id).await?;
//! ```

pub mod activities;
pub mod comments;
pub mod issues;
pub mod labels;
pub mod members;
pub mod notifications;
pub mod pool;
pub mod projects;
pub mod users;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

pub use activities::PgActivityRepository;
pub use comments::PgCommentRepository;
pub use issues::{NewIssue, PgIssueRepository};
pub use labels::PgLabelRepository;
pub use members::PgMemberRepository;
pub use notifications::PgNotificationRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, PoolConfig};
pub use projects::PgProjectRepository;
pub use users::PgUserRepository;

use tracker_core::{Error, Result};

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Whether a sqlx error is a Postgres unique-constraint violation (23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Combined database handle with every repository.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    pub projects: PgProjectRepository,
    pub members: PgMemberRepository,
    pub issues: PgIssueRepository,
    pub comments: PgCommentRepository,
    pub labels: PgLabelRepository,
    pub notifications: PgNotificationRepository,
    pub activities: PgActivityRepository,
}

impl Database {
    /// Create a database handle from an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            projects: PgProjectRepository::new(pool.clone()),
            members: PgMemberRepository::new(pool.clone()),
            issues: PgIssueRepository::new(pool.clone()),
            comments: PgCommentRepository::new(pool.clone()),
            labels: PgLabelRepository::new(pool.clone()),
            notifications: PgNotificationRepository::new(pool.clone()),
            activities: PgActivityRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database with default pool settings.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip check used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
