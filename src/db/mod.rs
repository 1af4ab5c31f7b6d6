//! Database layer
//!
//! Supports:
//! - SQLite (default, single-file deployment)
//! - MySQL (larger deployments)
//!
//! The driver is selected by configuration; repositories receive a
//! `DynDatabasePool` and dispatch on `DatabasePool::driver()`.
//!
//! # Usage
//!
//! ```ignore
//! use postdesk::config::DatabaseConfig;
//! use postdesk::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
