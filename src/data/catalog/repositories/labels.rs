//! Label repository

use sqlx::SqlitePool;

use super::super::error::CatalogError;
use super::super::models::{Label, LabelCandidate};

/// Record a labeling attempt. Like extractions, a retry within the same
/// labeling run overwrites rather than duplicates.
#[allow(clippy::too_many_arguments)]
pub async fn insert_label(
    pool: &SqlitePool,
    file_id: i64,
    doc_type: &str,
    title: Option<&str>,
    canonical_filename: Option<&str>,
    suggested_tags: Option<&str>,
    target_group_path: Option<&str>,
    date: Option<&str>,
    issuer: Option<&str>,
    source: Option<&str>,
    confidence: f64,
    explanation: Option<&str>,
    model_name: &str,
    prompt_version: &str,
    escalated: bool,
    labeling_run_id: i64,
) -> Result<i64, CatalogError> {
    let now = chrono::Utc::now().timestamp();
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO labels (
            file_id, doc_type, title, canonical_filename, suggested_tags,
            target_group_path, date, issuer, source, confidence, explanation,
            model_name, prompt_version, escalated, labeling_run_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(file_id, labeling_run_id) DO UPDATE SET
            doc_type = excluded.doc_type,
            title = excluded.title,
            canonical_filename = excluded.canonical_filename,
            suggested_tags = excluded.suggested_tags,
            target_group_path = excluded.target_group_path,
            date = excluded.date,
            issuer = excluded.issuer,
            source = excluded.source,
            confidence = excluded.confidence,
            explanation = excluded.explanation,
            model_name = excluded.model_name,
            prompt_version = excluded.prompt_version,
            escalated = excluded.escalated
        RETURNING id
        "#,
    )
    .bind(file_id)
    .bind(doc_type)
    .bind(title)
    .bind(canonical_filename)
    .bind(suggested_tags)
    .bind(target_group_path)
    .bind(date)
    .bind(issuer)
    .bind(source)
    .bind(confidence)
    .bind(explanation)
    .bind(model_name)
    .bind(prompt_version)
    .bind(escalated)
    .bind(labeling_run_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

type LabelTuple = (
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    f64,
    Option<String>,
    String,
    String,
    bool,
    i64,
    i64,
);

#[allow(clippy::type_complexity)]
fn row_to_label(row: LabelTuple) -> Label {
    let (
        id,
        file_id,
        doc_type,
        title,
        canonical_filename,
        suggested_tags,
        target_group_path,
        date,
        issuer,
        source,
        confidence,
        explanation,
        model_name,
        prompt_version,
        escalated,
        labeling_run_id,
        created_at,
    ) = row;
    Label {
        id,
        file_id,
        doc_type,
        title,
        canonical_filename,
        suggested_tags,
        target_group_path,
        date,
        issuer,
        source,
        confidence,
        explanation,
        model_name,
        prompt_version,
        escalated,
        labeling_run_id,
        created_at,
    }
}

const LABEL_COLUMNS: &str = "id, file_id, doc_type, title, canonical_filename, suggested_tags, \
    target_group_path, date, issuer, source, confidence, explanation, model_name, \
    prompt_version, escalated, labeling_run_id, created_at";

pub async fn get_latest_label_for_file(
    pool: &SqlitePool,
    file_id: i64,
) -> Result<Option<Label>, CatalogError> {
    let row = sqlx::query_as::<_, LabelTuple>(&format!(
        "SELECT {LABEL_COLUMNS} FROM labels WHERE file_id = ? ORDER BY labeling_run_id DESC LIMIT 1"
    ))
    .bind(file_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_label))
}

/// Files with a current successful extraction sidecar but not yet
/// labeled at all. Files that already carry a label, even a low
/// confidence one, are left to a dedicated re-label command rather than
/// reprocessed automatically.
pub async fn files_needing_labeling(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<LabelCandidate>, CatalogError> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        r#"
        SELECT f.id, f.path, e.sidecar_path
        FROM files f
        INNER JOIN extractions e
            ON e.file_id = f.id
            AND e.status = 'success'
            AND e.extraction_run_id = (
                SELECT MAX(e2.extraction_run_id)
                FROM extractions e2
                WHERE e2.file_id = f.id AND e2.status = 'success'
            )
        LEFT JOIN labels l ON l.file_id = f.id
        WHERE l.id IS NULL AND e.sidecar_path IS NOT NULL
        ORDER BY f.id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(file_id, path, sidecar_path)| LabelCandidate {
            file_id,
            path,
            sidecar_path,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::repositories::extractions::insert_extraction;
    use crate::data::catalog::repositories::files::upsert_file;
    use crate::data::catalog::repositories::runs::start_run;
    use crate::data::catalog::test_pool;

    async fn seed_extracted_file(pool: &SqlitePool) -> i64 {
        let scan_run = start_run(pool, "scan", None).await.unwrap();
        let file_id = upsert_file(pool, "/a/b.pdf", "hash", 10, None, 1, 1, scan_run)
            .await
            .unwrap();
        let extract_run = start_run(pool, "extract", None).await.unwrap();
        insert_extraction(
            pool,
            file_id,
            "pdf_text",
            "success",
            Some("ab/hash.txt.gz"),
            Some(200),
            None,
            extract_run,
        )
        .await
        .unwrap();
        file_id
    }

    #[tokio::test]
    async fn test_files_needing_labeling_includes_extracted_unlabeled() {
        let pool = test_pool().await;
        seed_extracted_file(&pool).await;

        let candidates = files_needing_labeling(&pool, 10).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].sidecar_path, "ab/hash.txt.gz");
    }

    #[tokio::test]
    async fn test_files_needing_labeling_excludes_labeled() {
        let pool = test_pool().await;
        let file_id = seed_extracted_file(&pool).await;
        let label_run = start_run(&pool, "label", None).await.unwrap();
        insert_label(
            &pool, file_id, "invoice", None, None, None, None, None, None, None, 0.9, None,
            "gpt-4o-mini", "abc123def4567890", false, label_run,
        )
        .await
        .unwrap();

        let candidates = files_needing_labeling(&pool, 10).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_insert_label_retry_same_run_overwrites() {
        let pool = test_pool().await;
        let file_id = seed_extracted_file(&pool).await;
        let label_run = start_run(&pool, "label", None).await.unwrap();

        let id1 = insert_label(
            &pool, file_id, "other", None, None, None, None, None, None, None, 0.2, None,
            "gpt-4o-mini", "abc123def4567890", false, label_run,
        )
        .await
        .unwrap();
        let id2 = insert_label(
            &pool, file_id, "invoice", None, None, None, None, None, None, None, 0.95, None,
            "gpt-4o", "abc123def4567890", true, label_run,
        )
        .await
        .unwrap();

        assert_eq!(id1, id2);
        let label = get_latest_label_for_file(&pool, file_id).await.unwrap().unwrap();
        assert_eq!(label.doc_type, "invoice");
        assert!(label.escalated);
    }
}
