//! Scanner (C2)
//!
//! Walks a source tree, hashes each regular file, and upserts its
//! inventory row into the catalog. Runs in two passes: the first counts
//! files so progress can be reported as "N of M", the second does the
//! actual hashing and upserting.

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;
use thiserror::Error;
use walkdir::WalkDir;

use crate::core::constants::{DEFAULT_SKIP_DIRS, SCAN_HASH_CHUNK_BYTES};
use crate::data::catalog::CatalogError;
use crate::data::catalog::repositories::{start_run, upsert_file};
use crate::utils::crypto::sha256_hex_reader;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("io error walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source root does not exist: {0}")]
    RootNotFound(PathBuf),
}

#[derive(Debug, Default, Clone)]
pub struct ScanSummary {
    pub total_files: usize,
    pub scanned: usize,
    pub skipped_errors: usize,
}

/// Walk `root`, hash every regular file not under a skipped directory
/// name, and upsert its row into the catalog under a fresh scan run.
pub async fn run_scan(
    pool: &SqlitePool,
    root: &Path,
    skip_dirs: &[String],
    follow_symlinks: bool,
) -> Result<ScanSummary, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }

    let skip: Vec<&str> = DEFAULT_SKIP_DIRS
        .iter()
        .copied()
        .chain(skip_dirs.iter().map(String::as_str))
        .collect();

    let total_files = count_files(root, &skip, follow_symlinks);
    tracing::info!(total_files, root = %root.display(), "scan starting");

    let run_id = start_run(pool, "scan", None).await?;

    let mut summary = ScanSummary {
        total_files,
        ..Default::default()
    };

    for entry in walk(root, &skip, follow_symlinks) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during scan");
                summary.skipped_errors += 1;
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match scan_one(pool, entry.path(), run_id).await {
            Ok(()) => {
                summary.scanned += 1;
                if summary.scanned % 500 == 0 {
                    tracing::info!(scanned = summary.scanned, total_files, "scan progress");
                }
            }
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "failed to scan file");
                summary.skipped_errors += 1;
            }
        }
    }

    tracing::info!(
        scanned = summary.scanned,
        skipped = summary.skipped_errors,
        "scan complete"
    );

    Ok(summary)
}

fn is_skipped_dir(name: &str, skip: &[&str]) -> bool {
    skip.iter().any(|s| *s == name)
}

fn walk(
    root: &Path,
    skip: &[&str],
    follow_symlinks: bool,
) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
    let skip = skip.to_vec();
    WalkDir::new(root)
        .follow_links(follow_symlinks)
        .into_iter()
        .filter_entry(move |e| {
            if e.file_type().is_dir() {
                e.file_name()
                    .to_str()
                    .map(|n| !is_skipped_dir(n, &skip))
                    .unwrap_or(true)
            } else {
                true
            }
        })
}

fn count_files(root: &Path, skip: &[&str], follow_symlinks: bool) -> usize {
    walk(root, skip, follow_symlinks)
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

async fn scan_one(pool: &SqlitePool, path: &Path, run_id: i64) -> Result<(), ScanError> {
    let metadata = std::fs::metadata(path).map_err(|e| ScanError::Walk {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file = std::fs::File::open(path).map_err(|e| ScanError::Walk {
        path: path.to_path_buf(),
        source: e,
    })?;
    let digest = sha256_hex_reader(file, SCAN_HASH_CHUNK_BYTES).map_err(|e| ScanError::Walk {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string());

    let size_bytes = metadata.len() as i64;
    let mtime = file_time_secs(metadata.modified());
    let ctime = file_time_secs(metadata.created()).unwrap_or(mtime);

    upsert_file(
        pool,
        &path.to_string_lossy(),
        &digest,
        size_bytes,
        mime_type.as_deref(),
        mtime,
        ctime,
        run_id,
    )
    .await?;

    Ok(())
}

fn file_time_secs(time: std::io::Result<std::time::SystemTime>) -> Option<i64> {
    time.ok().map(|t| {
        t.duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::catalog::repositories::count_files as catalog_file_count;
    use crate::data::catalog::test_pool;
    use std::io::Write;

    #[tokio::test]
    async fn test_run_scan_counts_and_inserts() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello world").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"second file").unwrap();

        let summary = run_scan(&pool, dir.path(), &[], false).await.unwrap();
        assert_eq!(summary.total_files, 2);
        assert_eq!(summary.scanned, 2);
        assert_eq!(catalog_file_count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_run_scan_skips_configured_dirs() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("vendor/skip.txt"), b"skip me").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"keep me").unwrap();

        let summary = run_scan(&pool, dir.path(), &["vendor".to_string()], false)
            .await
            .unwrap();
        assert_eq!(summary.scanned, 1);
    }

    #[tokio::test]
    async fn test_run_scan_missing_root_errors() {
        let pool = test_pool().await;
        let result = run_scan(&pool, Path::new("/nonexistent/path/xyz"), &[], false).await;
        assert!(matches!(result, Err(ScanError::RootNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_scan_rescans_same_path_idempotently() {
        let pool = test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        {
            let mut f = std::fs::File::create(&file_path).unwrap();
            f.write_all(b"v1").unwrap();
        }

        run_scan(&pool, dir.path(), &[], false).await.unwrap();
        run_scan(&pool, dir.path(), &[], false).await.unwrap();

        assert_eq!(catalog_file_count(&pool).await.unwrap(), 1);
    }
}
