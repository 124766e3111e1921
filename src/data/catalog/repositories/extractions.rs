//! Extraction attempt repository

use sqlx::SqlitePool;

use super::super::error::CatalogError;
use super::super::models::Extraction;

/// Record one extraction attempt. Re-running extraction for the same
/// file within the same run overwrites that run's row rather than
/// creating a duplicate, so a worker retrying a task after a crash
/// doesn't leave two rows behind.
#[allow(clippy::too_many_arguments)]
pub async fn insert_extraction(
    pool: &SqlitePool,
    file_id: i64,
    method: &str,
    status: &str,
    sidecar_path: Option<&str>,
    char_count: Option<i64>,
    error: Option<&str>,
    extraction_run_id: i64,
) -> Result<i64, CatalogError> {
    let now = chrono::Utc::now().timestamp();
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO extractions (file_id, method, status, sidecar_path, char_count, error, extraction_run_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(file_id, extraction_run_id) DO UPDATE SET
            method = excluded.method,
            status = excluded.status,
            sidecar_path = excluded.sidecar_path,
            char_count = excluded.char_count,
            error = excluded.error
        RETURNING id
        "#,
    )
    .bind(file_id)
    .bind(method)
    .bind(status)
    .bind(sidecar_path)
    .bind(char_count)
    .bind(error)
    .bind(extraction_run_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

type ExtractionTuple = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    Option<i64>,
    Option<String>,
    i64,
    i64,
);

fn row_to_extraction(
    (id, file_id, method, status, sidecar_path, char_count, error, extraction_run_id, created_at): ExtractionTuple,
) -> Extraction {
    Extraction {
        id,
        file_id,
        method,
        status,
        sidecar_path,
        char_count,
        error,
        extraction_run_id,
        created_at,
    }
}

const EXTRACTION_COLUMNS: &str =
    "id, file_id, method, status, sidecar_path, char_count, error, extraction_run_id, created_at";

/// The current successful extraction for a file: the one with the
/// greatest `extraction_run_id`. The `UNIQUE(file_id, extraction_run_id)`
/// constraint means that value is never ambiguous.
pub async fn get_latest_extraction(
    pool: &SqlitePool,
    file_id: i64,
) -> Result<Option<Extraction>, CatalogError> {
    let row = sqlx::query_as::<_, ExtractionTuple>(&format!(
        r#"
        SELECT {EXTRACTION_COLUMNS}
        FROM extractions
        WHERE file_id = ? AND status = 'success'
        ORDER BY extraction_run_id DESC
        LIMIT 1
        "#
    ))
    .bind(file_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_extraction))
}

pub async fn list_extractions_for_file(
    pool: &SqlitePool,
    file_id: i64,
) -> Result<Vec<Extraction>, CatalogError> {
    let rows = sqlx::query_as::<_, ExtractionTuple>(&format!(
        "SELECT {EXTRACTION_COLUMNS} FROM extractions WHERE file_id = ? ORDER BY extraction_run_id"
    ))
    .bind(file_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_extraction).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::repositories::files::upsert_file;
    use crate::data::catalog::repositories::runs::start_run;
    use crate::data::catalog::test_pool;

    async fn seed_file(pool: &SqlitePool) -> i64 {
        let run_id = start_run(pool, "scan", None).await.unwrap();
        upsert_file(pool, "/a/b.pdf", "hash", 10, None, 1, 1, run_id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_latest_extraction() {
        let pool = test_pool().await;
        let file_id = seed_file(&pool).await;
        let run1 = start_run(&pool, "extract", None).await.unwrap();
        let run2 = start_run(&pool, "extract", None).await.unwrap();

        insert_extraction(&pool, file_id, "plain_text", "failed", None, None, Some("boom"), run1)
            .await
            .unwrap();
        insert_extraction(
            &pool,
            file_id,
            "pdf_text",
            "success",
            Some("ab/abc.txt.gz"),
            Some(120),
            None,
            run2,
        )
        .await
        .unwrap();

        let latest = get_latest_extraction(&pool, file_id).await.unwrap().unwrap();
        assert_eq!(latest.extraction_run_id, run2);
        assert_eq!(latest.method, "pdf_text");
    }

    #[tokio::test]
    async fn test_insert_extraction_same_run_overwrites() {
        let pool = test_pool().await;
        let file_id = seed_file(&pool).await;
        let run_id = start_run(&pool, "extract", None).await.unwrap();

        let id1 = insert_extraction(&pool, file_id, "markdown", "failed", None, None, Some("x"), run_id)
            .await
            .unwrap();
        let id2 = insert_extraction(
            &pool,
            file_id,
            "markdown",
            "success",
            Some("p.txt.gz"),
            Some(10),
            None,
            run_id,
        )
        .await
        .unwrap();

        assert_eq!(id1, id2);
        let extractions = list_extractions_for_file(&pool, file_id).await.unwrap();
        assert_eq!(extractions.len(), 1);
        assert_eq!(extractions[0].status, "success");
    }

    #[tokio::test]
    async fn test_get_latest_extraction_ignores_failed() {
        let pool = test_pool().await;
        let file_id = seed_file(&pool).await;
        let run_id = start_run(&pool, "extract", None).await.unwrap();
        insert_extraction(&pool, file_id, "plain_text", "failed", None, None, Some("e"), run_id)
            .await
            .unwrap();

        assert!(get_latest_extraction(&pool, file_id).await.unwrap().is_none());
    }
}
