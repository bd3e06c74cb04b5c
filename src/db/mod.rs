//! Database layer
//!
//! Storage for every tenant lives in one relational database:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! The `DatabasePool` trait hides the backend. Repositories ask the pool for
//! its driver and run the matching SQL dialect.
//!
//! # Usage
//!
//! ```ignore
//! use quillpress::config::DatabaseConfig;
//! use quillpress::db::{create_pool, migrations};
//!
//! let config = DatabaseConfig::default();
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
