//! Database connection pool abstraction
//!
//! One interface over SQLite and MySQL pools; which one backs a
//! `DynDatabasePool` is decided by `DatabaseConfig::driver`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

/// Database pool trait that abstracts over the supported backends.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw statement that doesn't return rows, returning affected rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check that a connection can be acquired and used
    async fn ping(&self) -> Result<()>;

    /// Close the pool, waiting for checked-out connections to be returned
    async fn close(&self);

    fn driver(&self) -> DatabaseDriver;

    /// Underlying SQLite pool, if this is a SQLite connection
    fn as_sqlite(&self) -> Option<&SqlitePool>;

    /// Underlying MySQL pool, if this is a MySQL connection
    fn as_mysql(&self) -> Option<&MySqlPool>;
}

/// SQLite connection pool
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Connect to a SQLite database.
    ///
    /// Accepts `:memory:`, `sqlite:` URLs, or a plain file path. File
    /// databases are created together with their parent directory.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let connection_url = sqlite_connection_url(url)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        tracing::debug!(url, max_connections, "SQLite pool ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn sqlite_connection_url(url: &str) -> Result<String> {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        return Ok("sqlite::memory:".to_string());
    }

    let path = url.strip_prefix("sqlite:").unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }

    Ok(match (url.starts_with("sqlite:"), url.contains('?')) {
        (true, true) => url.to_string(),
        (true, false) => format!("{}?mode=rwc", url),
        (false, _) => format!("sqlite:{}?mode=rwc", url),
    })
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL connection pool
pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_url)
            .await
            .context("Failed to connect to MySQL database")?;

        tracing::debug!(max_connections, "MySQL pool ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Shared handle to whichever pool the configuration selected
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(
            SqliteDatabase::connect(&config.url, config.max_connections).await?,
        )),
        DatabaseDriver::Mysql => Ok(Arc::new(
            MysqlDatabase::connect(&config.url, config.max_connections).await?,
        )),
    }
}

/// Create an in-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
        max_connections: 4,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_test_pool() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_execute_returns_affected_rows() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        pool.execute("CREATE TABLE probe (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO probe (name) VALUES ('a'), ('b')")
            .await
            .expect("Failed to insert");

        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_sqlite_file_pool_creates_nested_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("posts.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
            max_connections: 2,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_queries() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        pool.close().await;
        assert!(pool.ping().await.is_err());
    }

    #[test]
    fn test_sqlite_connection_url_forms() {
        assert_eq!(sqlite_connection_url(":memory:").unwrap(), "sqlite::memory:");
        assert_eq!(
            sqlite_connection_url("sqlite:posts.db").unwrap(),
            "sqlite:posts.db?mode=rwc"
        );
        assert_eq!(
            sqlite_connection_url("sqlite:posts.db?mode=ro").unwrap(),
            "sqlite:posts.db?mode=ro"
        );
        assert_eq!(
            sqlite_connection_url("posts.db").unwrap(),
            "sqlite:posts.db?mode=rwc"
        );
    }

    // Requires a running MySQL server; set MYSQL_TEST_URL to run.
    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_ping() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/test".to_string());

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
            max_connections: 2,
        })
        .await
        .expect("Failed to create pool");

        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        pool.ping().await.expect("Ping should succeed");
    }
}
