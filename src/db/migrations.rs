//! Database migrations
//!
//! Migrations are embedded as SQL strings with one variant per backend and
//! tracked in a `_migrations` table, so a fresh database and an existing one
//! converge on the same schema when `run_migrations` is called at startup.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A schema change with SQL for both backends
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number, unique and increasing
    pub version: i32,
    pub name: &'static str,
    pub up_sqlite: &'static str,
    pub up_mysql: &'static str,
}

impl Migration {
    fn sql_for(&self, driver: DatabaseDriver) -> &'static str {
        match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        }
    }
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
///
/// Posts and sheets share the `posts` table and are told apart by
/// `post_type`; urls are unique within a type.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "create_posts",
    up_sqlite: r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_type INTEGER NOT NULL DEFAULT 0,
            title VARCHAR(100) NOT NULL,
            url VARCHAR(255) NOT NULL,
            status INTEGER NOT NULL DEFAULT 1,
            original_content TEXT NOT NULL,
            format_content TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            thumbnail VARCHAR(1023),
            password VARCHAR(255),
            template VARCHAR(255),
            disallow_comment BOOLEAN NOT NULL DEFAULT 0,
            top_priority INTEGER NOT NULL DEFAULT 0,
            visits INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            create_time TIMESTAMP NOT NULL,
            update_time TIMESTAMP NOT NULL,
            edit_time TIMESTAMP
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_posts_type_url ON posts(post_type, url);
        CREATE INDEX IF NOT EXISTS idx_posts_type_status_create_time ON posts(post_type, status, create_time);
    "#,
    up_mysql: r#"
        CREATE TABLE IF NOT EXISTS posts (
            id BIGINT PRIMARY KEY AUTO_INCREMENT,
            post_type INT NOT NULL DEFAULT 0,
            title VARCHAR(100) NOT NULL,
            url VARCHAR(255) NOT NULL,
            status INT NOT NULL DEFAULT 1,
            original_content LONGTEXT NOT NULL,
            format_content LONGTEXT NOT NULL,
            summary LONGTEXT NOT NULL,
            thumbnail VARCHAR(1023),
            password VARCHAR(255),
            template VARCHAR(255),
            disallow_comment BOOLEAN NOT NULL DEFAULT FALSE,
            top_priority INT NOT NULL DEFAULT 0,
            visits BIGINT NOT NULL DEFAULT 0,
            likes BIGINT NOT NULL DEFAULT 0,
            create_time DATETIME(6) NOT NULL,
            update_time DATETIME(6) NOT NULL,
            edit_time DATETIME(6) NULL
        );
        CREATE UNIQUE INDEX idx_posts_type_url ON posts(post_type, url);
        CREATE INDEX idx_posts_type_status_create_time ON posts(post_type, status, create_time);
    "#,
}];

/// Apply every migration not yet recorded, returning how many ran.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied: Vec<i64> = get_applied_migrations(pool)
        .await?
        .into_iter()
        .map(|record| record.version)
        .collect();

    let mut count = 0;
    for migration in MIGRATIONS {
        if applied.contains(&i64::from(migration.version)) {
            continue;
        }
        tracing::info!(
            "Applying migration {}: {}",
            migration.version,
            migration.name
        );
        apply_migration(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// List migrations already recorded, ordered by version
pub async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    const SQL: &str = "SELECT version, name, applied_at FROM _migrations ORDER BY version";

    let rows: Vec<(i64, String, DateTime<Utc>)> = match pool.driver() {
        DatabaseDriver::Sqlite => {
            let conn = pool.as_sqlite().context("SQLite pool unavailable")?;
            sqlx::query(SQL)
                .fetch_all(conn)
                .await?
                .iter()
                .map(|row| (row.get("version"), row.get("name"), row.get("applied_at")))
                .collect()
        }
        DatabaseDriver::Mysql => {
            let conn = pool.as_mysql().context("MySQL pool unavailable")?;
            sqlx::query(SQL)
                .fetch_all(conn)
                .await?
                .iter()
                .map(|row| (row.get("version"), row.get("name"), row.get("applied_at")))
                .collect()
        }
    };

    Ok(rows
        .into_iter()
        .map(|(version, name, applied_at)| MigrationRecord {
            version,
            name,
            applied_at,
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.sql_for(pool.driver())) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    let record = format!(
        "INSERT INTO _migrations (version, name) VALUES ({}, '{}')",
        migration.version, migration.name
    );
    pool.execute(&record).await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &sql[..cut]),
        None => sql.to_string(),
    }
}

/// Split a migration script into statements, dropping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Number of migrations not yet applied
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let first = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(first, MIGRATIONS.len());

        let second = run_migrations(&pool).await.expect("Failed to rerun migrations");
        assert_eq!(second, 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pending_count_on_fresh_database() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_applied_migrations_are_recorded() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let records = get_applied_migrations(&pool).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].version, 1);
        assert_eq!(records[0].name, "create_posts");
    }

    #[tokio::test]
    async fn test_url_unique_per_post_type() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let insert = |post_type: i32| {
            format!(
                "INSERT INTO posts (post_type, title, url, original_content, format_content, create_time, update_time) \
                 VALUES ({}, 't', 'same-url', '', '', '2024-01-01 00:00:00', '2024-01-01 00:00:00')",
                post_type
            )
        };

        pool.execute(&insert(0)).await.expect("First insert should succeed");
        pool.execute(&insert(1))
            .await
            .expect("Same url under another type should succeed");
        assert!(pool.execute(&insert(0)).await.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);\n-- trailing";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }

    #[test]
    fn test_truncate_sql() {
        assert_eq!(truncate_sql("SELECT 1"), "SELECT 1");
        let long = "x".repeat(150);
        assert_eq!(truncate_sql(&long).len(), 103);
    }
}
