//! Schema migration runner
//!
//! This engine currently ships only schema version 1 — there is no
//! `apply_migration` dispatch table yet because nothing has needed one.
//! When version 2 is introduced, add its SQL here and extend
//! `run_migrations`'s version loop the way the catalog's SQLite ancestor
//! does it.

use sqlx::SqlitePool;

use super::error::CatalogError;
use super::schema::{SCHEMA, SCHEMA_VERSION};
use crate::utils::crypto::sha256_hex;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), CatalogError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!("initializing catalog with schema version {}", SCHEMA_VERSION);
        return apply_initial_schema(pool).await;
    }

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    if current_version == SCHEMA_VERSION {
        tracing::debug!("catalog schema up to date (version {})", current_version);
        return Ok(());
    }

    if current_version > SCHEMA_VERSION {
        return Err(CatalogError::SchemaTooNew {
            found: current_version,
            expected: SCHEMA_VERSION,
        });
    }

    Err(CatalogError::MigrationFailed {
        version: current_version + 1,
        name: "unknown".to_string(),
        error: format!(
            "catalog is at version {current_version} but no migration path to {SCHEMA_VERSION} exists"
        ),
    })
}

async fn apply_initial_schema(pool: &SqlitePool) -> Result<(), CatalogError> {
    let start = std::time::Instant::now();

    let mut tx = pool.begin().await?;

    sqlx::query(SCHEMA).execute(&mut *tx).await?;

    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description) VALUES (1, ?, ?, 'Initial schema')",
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let checksum = sha256_hex(SCHEMA);
    let elapsed_ms = start.elapsed().as_millis() as i64;
    sqlx::query(
        "INSERT INTO schema_migrations (version, name, applied_at, checksum, execution_time_ms, success) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(SCHEMA_VERSION)
    .bind("initial_schema")
    .bind(now)
    .bind(&checksum)
    .bind(elapsed_ms)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!("applied initial catalog schema in {}ms", elapsed_ms);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn test_run_migrations_fresh_db() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let version: i32 = sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_run_migrations_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_migrations_refuses_newer_schema() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query("UPDATE schema_version SET version = ? WHERE id = 1")
            .bind(SCHEMA_VERSION + 1)
            .execute(&pool)
            .await
            .unwrap();

        let err = run_migrations(&pool).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::SchemaTooNew { found, expected }
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn test_run_migrations_records_checksum() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let checksum: String = sqlx::query_scalar("SELECT checksum FROM schema_migrations WHERE version = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(checksum, sha256_hex(SCHEMA));
    }
}
