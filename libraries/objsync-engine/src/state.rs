//! Per-container sync marks.
//!
//! A mark is the origin change-signal value observed by the last fully
//! successful pass over a container. It is the only state kept across runs.

use async_trait::async_trait;
use objsync_core::{Result, SyncError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage for sync marks keyed by (tenant id, container name).
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Mark recorded by the last successful pass, if any
    async fn last_synced(&self, tenant_id: &str, container: &str) -> Result<Option<f64>>;

    /// Record `mark` after a fully successful pass
    async fn record_synced(&self, tenant_id: &str, container: &str, mark: f64) -> Result<()>;

    /// Drop the mark of a container that no longer exists
    async fn forget(&self, tenant_id: &str, container: &str) -> Result<()>;
}

/// Marks held for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    marks: RwLock<HashMap<(String, String), f64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncStateStore for MemoryStateStore {
    async fn last_synced(&self, tenant_id: &str, container: &str) -> Result<Option<f64>> {
        let marks = self.marks.read().await;
        Ok(marks
            .get(&(tenant_id.to_string(), container.to_string()))
            .copied())
    }

    async fn record_synced(&self, tenant_id: &str, container: &str, mark: f64) -> Result<()> {
        self.marks
            .write()
            .await
            .insert((tenant_id.to_string(), container.to_string()), mark);
        Ok(())
    }

    async fn forget(&self, tenant_id: &str, container: &str) -> Result<()> {
        self.marks
            .write()
            .await
            .remove(&(tenant_id.to_string(), container.to_string()));
        Ok(())
    }
}

/// SQLite-backed marks, kept across process restarts
pub struct SqliteStateStore {
    pool: SqlitePool,
}

impl SqliteStateStore {
    /// Open (and create if missing) the database at `database_url`.
    ///
    /// # Errors
    /// Returns an error if the connection fails or migrations fail
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(state_error)?
            .create_if_missing(true);

        // Each in-memory connection is its own database.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(state_error)?;

        Self::run_migrations(&pool).await?;
        debug!(url = %database_url, "Sync state store opened");

        Ok(Self { pool })
    }

    /// Open (and create if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(state_error)?;

        Self::run_migrations(&pool).await?;
        debug!(path = %path.display(), "Sync state store opened");

        Ok(Self { pool })
    }

    /// In-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        const MIGRATIONS: &[&str] =
            &[include_str!("../migrations/20250301000001_create_sync_marks.sql")];

        for migration in MIGRATIONS {
            sqlx::query(migration)
                .execute(pool)
                .await
                .map_err(|e| SyncError::state(format!("migration failed: {e}")))?;
        }

        Ok(())
    }
}

fn state_error(err: sqlx::Error) -> SyncError {
    SyncError::state(err.to_string())
}

#[async_trait]
impl SyncStateStore for SqliteStateStore {
    async fn last_synced(&self, tenant_id: &str, container: &str) -> Result<Option<f64>> {
        let row = sqlx::query("SELECT signal FROM sync_marks WHERE tenant_id = ? AND container = ?")
            .bind(tenant_id)
            .bind(container)
            .fetch_optional(&self.pool)
            .await
            .map_err(state_error)?;

        Ok(row.map(|r| r.get::<f64, _>("signal")))
    }

    async fn record_synced(&self, tenant_id: &str, container: &str, mark: f64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_marks (tenant_id, container, signal, synced_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(tenant_id, container)
             DO UPDATE SET signal = excluded.signal, synced_at = excluded.synced_at",
        )
        .bind(tenant_id)
        .bind(container)
        .bind(mark)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(state_error)?;

        Ok(())
    }

    async fn forget(&self, tenant_id: &str, container: &str) -> Result<()> {
        sqlx::query("DELETE FROM sync_marks WHERE tenant_id = ? AND container = ?")
            .bind(tenant_id)
            .bind(container)
            .execute(&self.pool)
            .await
            .map_err(state_error)?;

        Ok(())
    }
}
