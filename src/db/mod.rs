//! Storage primitives for ban state.
//!
//! Two narrow async contracts are consumed by the core:
//! - [`SortedSetStore`]: scored member sets (global indexes, ban timelines)
//! - [`ObjectStore`]: string field maps (ban records, profile fields)
//!
//! Two backends implement both:
//! - [`Database`]: SQLite via SQLx with embedded migrations
//! - [`MemoryStore`]: in-process maps, for embedding and tests

mod memory;
mod objects;
mod sorted_sets;

pub use memory::MemoryStore;

use crate::config::DatabaseConfig;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Field map of a stored object.
pub type FieldMap = BTreeMap<String, String>;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Ordered-set storage: members with integer scores under a key.
#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Add `member` to `key` with `score`, replacing any previous score.
    async fn sorted_set_add(&self, key: &str, score: i64, member: &str)
    -> Result<(), StoreError>;

    /// Remove every member in `members` from every set in `keys`.
    async fn sorted_set_remove(&self, keys: &[&str], members: &[&str]) -> Result<(), StoreError>;

    /// Members ordered by descending score, positions `start..=stop`.
    ///
    /// A negative `stop` reads to the end of the set.
    async fn rev_range(&self, key: &str, start: i64, stop: i64)
    -> Result<Vec<String>, StoreError>;

    /// Members with `min <= score <= max`, ascending, at most `limit` of them.
    async fn range_by_score(
        &self,
        key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

/// Object storage: string field maps under a key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Merge `fields` into the object at `key`.
    async fn set_object(&self, key: &str, fields: &FieldMap) -> Result<(), StoreError>;

    /// Read the object at `key`; `None` when it has no fields.
    async fn get_object(&self, key: &str) -> Result<Option<FieldMap>, StoreError>;

    /// Merge the same `fields` into every object in `keys`.
    async fn set_objects(&self, keys: &[&str], fields: &FieldMap) -> Result<(), StoreError>;

    /// Read selected `fields` of each object, in `keys` order.
    ///
    /// Missing objects and fields are simply absent from the returned maps.
    async fn get_objects_fields(
        &self,
        keys: &[&str],
        fields: &[&str],
    ) -> Result<Vec<FieldMap>, StoreError>;
}

/// Resolve an inclusive `start..=stop` window into `(offset, count)`.
///
/// `count` is `None` for "to the end". Returns `None` for an empty window.
pub(crate) fn range_window(start: i64, stop: i64) -> Option<(usize, Option<usize>)> {
    let start = start.max(0);
    let offset = usize::try_from(start).unwrap_or(usize::MAX);
    if stop < 0 {
        return Some((offset, None));
    }
    if stop < start {
        return None;
    }
    // A window too wide to count runs to the end.
    let count = (stop - start)
        .checked_add(1)
        .and_then(|count| usize::try_from(count).ok());
    Some((offset, count))
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new database connection, running migrations if needed.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache memory database per call, so parallel
            // tests never see each other's rows.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:userbans-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            // The database lives only as long as one connection stays open.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets index reads proceed while a ban is being written.
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let integrity_result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;

        if integrity_result != "ok" {
            tracing::error!(
                integrity_check = %integrity_result,
                "Database integrity check FAILED - corruption detected!"
            );
            return Err(StoreError::Internal(format!(
                "Database integrity check failed: {}",
                integrity_result
            )));
        }

        Ok(Self { pool })
    }

    /// Open the database named by a `[database]` config section.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.path).await
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(StoreError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(err)
    }
}
