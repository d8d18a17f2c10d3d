//! SQLite persistence.
//!
//! [`Database`] owns the connection pool and hands out repositories:
//! - [`VideoRepository`]: the ordered playlist (transactional replace)
//! - [`SettingsRepository`]: display settings key/value rows
//! - [`AttemptRepository`]: login throttle records
//! - [`AdminRepository`]: admin accounts
//!
//! Schema changes are embedded migrations under `migrations/`.

mod admins;
mod attempts;
pub mod legacy;
mod settings;
mod videos;

pub use admins::AdminRepository;
pub use attempts::AttemptRepository;
pub use settings::SettingsRepository;
pub use videos::VideoRepository;

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::CoreResult;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
    const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    /// Opens (creating if needed) the database at `path` and applies
    /// migrations. `":memory:"` gives a private in-memory database.
    pub async fn new(path: &str) -> CoreResult<Self> {
        let pool = if path == ":memory:" {
            // Named shared-cache database so every pooled connection sees the
            // same data, unique per call so parallel tests stay isolated.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:signage-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            let options = SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = std::fs::create_dir_all(parent) {
                        tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
                    }
                }
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true)
                .busy_timeout(Self::BUSY_TIMEOUT);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        if path != ":memory:" {
            sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        }

        Ok(Self { pool })
    }

    pub fn videos(&self) -> VideoRepository {
        VideoRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn attempts(&self) -> AttemptRepository {
        AttemptRepository::new(self.pool.clone())
    }

    pub fn admins(&self) -> AdminRepository {
        AdminRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_databases_are_isolated() {
        let a = Database::new(":memory:").await.unwrap();
        let b = Database::new(":memory:").await.unwrap();

        a.admins().insert("admin", "hash").await.unwrap();
        assert_eq!(a.admins().count().await.unwrap(), 1);
        assert_eq!(b.admins().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn every_pooled_connection_enforces_foreign_keys() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("signage.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();

        // Hold several connections at once so the pool has to open new ones.
        let mut held = Vec::new();
        for _ in 0..3 {
            let mut conn = db.pool.acquire().await.unwrap();
            let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
                .fetch_one(&mut *conn)
                .await
                .unwrap();
            assert_eq!(enabled, 1);
            held.push(conn);
        }
    }

    #[tokio::test]
    async fn file_database_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data/signage.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();
        assert!(db.videos().load().await.unwrap().is_empty());
        assert!(path.exists());
    }
}
