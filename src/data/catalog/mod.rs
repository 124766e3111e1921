//! Catalog database service
//!
//! A single embedded SQLite database tracking every file the engine has
//! seen, plus the extraction/label/plan provenance attached to it. WAL
//! mode lets the extraction pool's workers and the supervisor's
//! periodic status reads coexist without blocking each other.

pub mod error;
mod migrations;
pub mod models;
pub mod repositories;
pub mod schema;

pub use error::CatalogError;
pub use sqlx::SqlitePool;

use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::log::LevelFilter;

use crate::core::constants::{
    CATALOG_BUSY_TIMEOUT_SECS, CATALOG_CACHE_SIZE, CATALOG_CHECKPOINT_INTERVAL_SECS,
    CATALOG_MAX_CONNECTIONS, CATALOG_WAL_AUTOCHECKPOINT,
};

/// Catalog database service
///
/// Owns the connection pool and background checkpoint task. Created once
/// per process invocation and shared across whichever phase is running.
pub struct CatalogService {
    pool: SqlitePool,
}

impl CatalogService {
    /// Open (creating if missing) the catalog database at `db_path` and
    /// bring its schema up to date. Callers resolve `db_path` from
    /// `--db` or the config's `index_db`, creating its parent directory
    /// first.
    pub async fn open(db_path: &std::path::Path) -> Result<Self, CatalogError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(CATALOG_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", CATALOG_CACHE_SIZE)
            .pragma("temp_store", "MEMORY")
            .pragma("wal_autocheckpoint", CATALOG_WAL_AUTOCHECKPOINT)
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(CATALOG_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        tracing::debug!(path = %db_path.display(), "catalog initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Build a `CatalogService` from an existing pool, primarily for tests.
    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn checkpoint(&self) -> Result<(), CatalogError> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await?;
        tracing::debug!("WAL checkpoint completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("catalog pool closed");
    }

    pub fn start_checkpoint_task(
        self: &Arc<Self>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let catalog = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(CATALOG_CHECKPOINT_INTERVAL_SECS));
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("checkpoint task shutting down");
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let Err(e) = catalog.checkpoint().await {
                            tracing::warn!("WAL checkpoint failed: {}", e);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    for statement in schema::SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement.trim()).execute(&pool).await.unwrap();
    }
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_from_existing_pool_checkpoints() {
        let pool = test_pool().await;
        let catalog = CatalogService::from_pool(pool);
        catalog.checkpoint().await.unwrap();
    }
}
