//! Database connection pool management
//!
//! Wraps SQLx's `SqlitePool` and owns the schema: every database file
//! carries its schema version in `PRAGMA user_version`, and opening a pool
//! applies whatever migrations the file has not seen yet, each in its own
//! transaction. Files written by a newer build are refused rather than
//! silently misread.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, info};

use crate::CacheError;

/// Ordered schema migrations; the index of each entry plus one is the
/// `user_version` it leaves behind
const MIGRATIONS: &[&str] = &[include_str!("migrations/20261016_initial.sql")];

/// Schema version this build reads and writes
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of SQLite connections to the node table
///
/// File-backed pools run in WAL mode so that readers keep seeing the last
/// committed batch while a writer is busy. In-memory pools use a single
/// connection, since every SQLite in-memory connection is its own database.
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Parent directories are created first. Pending migrations are
    /// applied before the pool is returned.
    ///
    /// # Errors
    ///
    /// - `CacheError::ConnectionFailed` if the directory or the connection
    ///   cannot be created
    /// - `CacheError::MigrationFailed` if a migration fails or the file
    ///   uses a newer schema
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        let applied = Self::run_migrations(&pool).await?;
        info!(
            path = %db_path.display(),
            schema_version = SCHEMA_VERSION,
            migrations_applied = applied,
            "Node database opened"
        );

        Ok(Self { pool })
    }

    /// Creates a fresh in-memory database, mainly for tests
    ///
    /// # Errors
    ///
    /// Same as [`DatabasePool::new`].
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        Self::run_migrations(&pool).await?;
        debug!("In-memory node database ready");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Schema version recorded in the database file
    pub async fn schema_version(&self) -> Result<i64, CacheError> {
        read_user_version(&self.pool).await
    }

    /// Closes every connection, checkpointing the WAL
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Applies pending migrations, returning how many ran
    async fn run_migrations(pool: &SqlitePool) -> Result<usize, CacheError> {
        let current = read_user_version(pool).await?;
        if current > SCHEMA_VERSION {
            return Err(CacheError::MigrationFailed(format!(
                "database schema version {current} is newer than the supported version {SCHEMA_VERSION}"
            )));
        }

        let mut applied = 0;
        for (index, sql) in MIGRATIONS.iter().enumerate() {
            let version = index as i64 + 1;
            if version <= current {
                continue;
            }

            let mut tx = pool.begin().await.map_err(migration_error(version))?;
            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .map_err(migration_error(version))?;
            // PRAGMA arguments cannot be bound
            sqlx::raw_sql(&format!("PRAGMA user_version = {version}"))
                .execute(&mut *tx)
                .await
                .map_err(migration_error(version))?;
            tx.commit().await.map_err(migration_error(version))?;

            debug!(version, "Schema migration applied");
            applied += 1;
        }
        Ok(applied)
    }
}

async fn read_user_version(pool: &SqlitePool) -> Result<i64, CacheError> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(format!("Failed to read schema version: {e}")))
}

fn migration_error(version: i64) -> impl Fn(sqlx::Error) -> CacheError {
    move |e| CacheError::MigrationFailed(format!("Migration to version {version} failed: {e}"))
}
