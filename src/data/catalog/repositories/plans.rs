//! Plan repository

use sqlx::SqlitePool;

use super::super::error::CatalogError;
use super::super::models::{Plan, PlanCandidate};

#[allow(clippy::too_many_arguments)]
pub async fn insert_plan(
    pool: &SqlitePool,
    file_id: i64,
    label_id: i64,
    operation: &str,
    source_path: &str,
    target_path: &str,
    target_filename: &str,
    tags: Option<&str>,
    needs_review: bool,
    plan_run_id: i64,
) -> Result<i64, CatalogError> {
    let now = chrono::Utc::now().timestamp();
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO plans (
            file_id, label_id, operation, source_path, target_path, target_filename,
            tags, needs_review, plan_run_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(file_id)
    .bind(label_id)
    .bind(operation)
    .bind(source_path)
    .bind(target_path)
    .bind(target_filename)
    .bind(tags)
    .bind(needs_review)
    .bind(plan_run_id)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

type PlanTuple = (
    i64,
    i64,
    i64,
    String,
    String,
    String,
    String,
    Option<String>,
    bool,
    Option<i64>,
    i64,
    i64,
);

#[allow(clippy::type_complexity)]
fn row_to_plan(row: PlanTuple) -> Plan {
    let (
        id,
        file_id,
        label_id,
        operation,
        source_path,
        target_path,
        target_filename,
        tags,
        needs_review,
        materialized_at,
        plan_run_id,
        created_at,
    ) = row;
    Plan {
        id,
        file_id,
        label_id,
        operation,
        source_path,
        target_path,
        target_filename,
        tags,
        needs_review,
        materialized_at,
        plan_run_id,
        created_at,
    }
}

const PLAN_COLUMNS: &str = "id, file_id, label_id, operation, source_path, target_path, \
    target_filename, tags, needs_review, materialized_at, plan_run_id, created_at";

pub async fn get_plans_for_run(
    pool: &SqlitePool,
    plan_run_id: i64,
) -> Result<Vec<Plan>, CatalogError> {
    let rows = sqlx::query_as::<_, PlanTuple>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE plan_run_id = ? ORDER BY id"
    ))
    .bind(plan_run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(row_to_plan).collect())
}

pub async fn get_plan(pool: &SqlitePool, plan_id: i64) -> Result<Option<Plan>, CatalogError> {
    let row = sqlx::query_as::<_, PlanTuple>(&format!(
        "SELECT {PLAN_COLUMNS} FROM plans WHERE id = ?"
    ))
    .bind(plan_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_plan))
}

/// Labeled files with no plan row yet, using each file's most recent
/// label (mirrors the latest-extraction subquery's shape so a file
/// relabeled after a correction is planned from its newest label).
pub async fn files_needing_planning(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<PlanCandidate>, CatalogError> {
    #[allow(clippy::type_complexity)]
    let rows: Vec<(
        i64,
        String,
        i64,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        f64,
    )> = sqlx::query_as(
        r#"
        SELECT f.id, f.path, l.id, l.doc_type, l.title, l.canonical_filename,
               l.suggested_tags, l.target_group_path, l.date, l.confidence
        FROM labels l
        JOIN files f ON f.id = l.file_id
        LEFT JOIN plans p ON p.label_id = l.id
        WHERE p.id IS NULL
          AND l.labeling_run_id = (
              SELECT MAX(l2.labeling_run_id) FROM labels l2 WHERE l2.file_id = l.file_id
          )
        ORDER BY f.id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(file_id, path, label_id, doc_type, title, canonical_filename, suggested_tags,
              target_group_path, date, confidence)| PlanCandidate {
                file_id,
                path,
                label_id,
                doc_type,
                title,
                canonical_filename,
                suggested_tags,
                target_group_path,
                date,
                confidence,
            },
        )
        .collect())
}

pub async fn mark_materialized(pool: &SqlitePool, plan_id: i64) -> Result<(), CatalogError> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query("UPDATE plans SET materialized_at = ? WHERE id = ?")
        .bind(now)
        .bind(plan_id)
        .execute(pool)
        .await?;
    Ok(())
}
