//! treemirror Cache - SQLite node store
//!
//! SQLite-based persistence for the mirrored node tree:
//! - One row per remote file or folder, unique per (account, path)
//! - Indexed by path (prefix ranges), parent id, remote id and local path
//! - Batches applied in a single transaction
//!
//! ## Architecture
//!
//! This crate implements the `INodeStore` port from `treemirror-core`
//! using SQLite as the storage backend. It is a driven (secondary) adapter
//! in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteNodeStore`] - Full `INodeStore` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use treemirror_cache::{DatabasePool, SqliteNodeStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/treemirror/treemirror.db")).await?;
//! let store = SqliteNodeStore::new(pool.pool().clone());
//! // Use store as INodeStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteNodeStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row or a bound value could not be converted
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<treemirror_core::domain::DomainError> for CacheError {
    fn from(e: treemirror_core::domain::DomainError) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
