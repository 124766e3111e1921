//! File inventory repository

use sqlx::SqlitePool;

use super::super::error::CatalogError;
use super::super::models::File;

/// Insert or update a file's inventory row, keyed by `path`. A rescan of
/// an already-known path updates its metadata in place rather than
/// creating a duplicate row.
#[allow(clippy::too_many_arguments)]
pub async fn upsert_file(
    pool: &SqlitePool,
    path: &str,
    sha256: &str,
    size_bytes: i64,
    mime_type: Option<&str>,
    mtime: i64,
    ctime: i64,
    scan_run_id: i64,
) -> Result<i64, CatalogError> {
    let now = chrono::Utc::now().timestamp();
    let result: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO files (path, sha256, size_bytes, mime_type, mtime, ctime, scan_run_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            sha256 = excluded.sha256,
            size_bytes = excluded.size_bytes,
            mime_type = excluded.mime_type,
            mtime = excluded.mtime,
            ctime = excluded.ctime,
            scan_run_id = excluded.scan_run_id,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(path)
    .bind(sha256)
    .bind(size_bytes)
    .bind(mime_type)
    .bind(mtime)
    .bind(ctime)
    .bind(scan_run_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(result.0)
}

type FileTuple = (
    i64,
    String,
    String,
    i64,
    Option<String>,
    i64,
    i64,
    i64,
    i64,
    i64,
);

fn row_to_file(
    (id, path, sha256, size_bytes, mime_type, mtime, ctime, scan_run_id, created_at, updated_at): FileTuple,
) -> File {
    File {
        id,
        path,
        sha256,
        size_bytes,
        mime_type,
        mtime,
        ctime,
        scan_run_id,
        created_at,
        updated_at,
    }
}

const FILE_COLUMNS: &str =
    "id, path, sha256, size_bytes, mime_type, mtime, ctime, scan_run_id, created_at, updated_at";

pub async fn get_file(pool: &SqlitePool, file_id: i64) -> Result<Option<File>, CatalogError> {
    let row = sqlx::query_as::<_, FileTuple>(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
    ))
    .bind(file_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_file))
}

pub async fn get_file_by_path(pool: &SqlitePool, path: &str) -> Result<Option<File>, CatalogError> {
    let row = sqlx::query_as::<_, FileTuple>(&format!(
        "SELECT {FILE_COLUMNS} FROM files WHERE path = ?"
    ))
    .bind(path)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_file))
}

pub async fn count_files(pool: &SqlitePool) -> Result<i64, CatalogError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Files with no successful extraction attempt recorded yet, oldest
/// first, optionally excluding paths whose lowercased suffix is in
/// `skip_extensions` so skip-listed files never re-enter the queue.
pub async fn files_needing_extraction(
    pool: &SqlitePool,
    limit: i64,
    skip_extensions: &[String],
) -> Result<Vec<File>, CatalogError> {
    let mut query = format!(
        r#"
        SELECT {FILE_COLUMNS}
        FROM files f
        LEFT JOIN extractions e ON e.file_id = f.id AND e.status = 'success'
        WHERE e.id IS NULL
        "#
    );
    for _ in skip_extensions {
        query.push_str(" AND LOWER(f.path) NOT LIKE ?");
    }
    query.push_str(" ORDER BY f.id LIMIT ?");

    let mut q = sqlx::query_as::<_, FileTuple>(&query);
    for ext in skip_extensions {
        q = q.bind(format!("%{}", ext.to_lowercase()));
    }
    q = q.bind(limit);

    let rows = q.fetch_all(pool).await?;

    Ok(rows.into_iter().map(row_to_file).collect())
}
