//! Run provenance repository

use sqlx::SqlitePool;

use super::super::error::CatalogError;
use super::super::models::Run;

/// Start a new run and return its id. `status` begins at `running`.
pub async fn start_run(
    pool: &SqlitePool,
    run_type: &str,
    config_snapshot: Option<&str>,
) -> Result<i64, CatalogError> {
    let now = chrono::Utc::now().timestamp();
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO runs (run_type, config_snapshot, started_at, status)
        VALUES (?, ?, ?, 'running')
        RETURNING id
        "#,
    )
    .bind(run_type)
    .bind(config_snapshot)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

/// Mark a run completed or failed and stamp `completed_at`.
pub async fn finish_run(
    pool: &SqlitePool,
    run_id: i64,
    status: &str,
    error: Option<&str>,
) -> Result<(), CatalogError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE runs SET status = ?, completed_at = ?, error = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(error)
        .bind(run_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_run(pool: &SqlitePool, run_id: i64) -> Result<Option<Run>, CatalogError> {
    let row = sqlx::query_as::<_, (i64, String, Option<String>, i64, Option<i64>, String, Option<String>)>(
        "SELECT id, run_type, config_snapshot, started_at, completed_at, status, error FROM runs WHERE id = ?",
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, run_type, config_snapshot, started_at, completed_at, status, error)| Run {
            id,
            run_type,
            config_snapshot,
            started_at,
            completed_at,
            status,
            error,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::test_pool;

    #[tokio::test]
    async fn test_start_and_finish_run() {
        let pool = test_pool().await;
        let run_id = start_run(&pool, "scan", None).await.unwrap();
        assert!(run_id > 0);

        let run = get_run(&pool, run_id).await.unwrap().unwrap();
        assert_eq!(run.status, "running");
        assert!(run.completed_at.is_none());

        finish_run(&pool, run_id, "completed", None).await.unwrap();
        let run = get_run(&pool, run_id).await.unwrap().unwrap();
        assert_eq!(run.status, "completed");
        assert!(run.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_finish_run_records_error() {
        let pool = test_pool().await;
        let run_id = start_run(&pool, "extract", None).await.unwrap();
        finish_run(&pool, run_id, "failed", Some("disk full"))
            .await
            .unwrap();

        let run = get_run(&pool, run_id).await.unwrap().unwrap();
        assert_eq!(run.status, "failed");
        assert_eq!(run.error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_get_run_missing_returns_none() {
        let pool = test_pool().await;
        assert!(get_run(&pool, 999).await.unwrap().is_none());
    }
}
