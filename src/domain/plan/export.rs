//! Newline-delimited JSON and CSV export of a plan run, for out-of-band
//! review before materialization.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::data::catalog::models::Plan;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error writing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

const CSV_HEADER: &[&str] = &[
    "id",
    "file_id",
    "label_id",
    "operation",
    "source_path",
    "target_path",
    "target_filename",
    "tags",
    "needs_review",
    "materialized_at",
    "plan_run_id",
];

/// Derive the JSONL/CSV sidecar pair from a requested output path. A
/// path with no recognized extension is treated as a stem and both
/// extensions are appended; `.jsonl`/`.csv` are swapped onto each other
/// when one is given explicitly.
pub fn export_paths(requested: &Path) -> (PathBuf, PathBuf) {
    match requested.extension().and_then(|e| e.to_str()) {
        Some("jsonl") => (requested.to_path_buf(), requested.with_extension("csv")),
        Some("csv") => (requested.with_extension("jsonl"), requested.to_path_buf()),
        _ => (
            requested.with_extension("jsonl"),
            requested.with_extension("csv"),
        ),
    }
}

fn csv_record(plan: &Plan) -> [String; 11] {
    [
        plan.id.to_string(),
        plan.file_id.to_string(),
        plan.label_id.to_string(),
        plan.operation.clone(),
        plan.source_path.clone(),
        plan.target_path.clone(),
        plan.target_filename.clone(),
        plan.tags.clone().unwrap_or_default(),
        plan.needs_review.to_string(),
        plan.materialized_at.map(|t| t.to_string()).unwrap_or_default(),
        plan.plan_run_id.to_string(),
    ]
}

/// Write `plans` as a JSON-lines file and a CSV file at the paths
/// derived from `requested` via [`export_paths`]. Returns those paths.
pub fn export_plans(plans: &[Plan], requested: &Path) -> Result<(PathBuf, PathBuf), ExportError> {
    let (jsonl_path, csv_path) = export_paths(requested);

    if let Some(parent) = jsonl_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    let mut jsonl_file = std::fs::File::create(&jsonl_path).map_err(|e| ExportError::Io {
        path: jsonl_path.clone(),
        source: e,
    })?;
    for plan in plans {
        let line = serde_json::to_string(plan)?;
        writeln!(jsonl_file, "{line}").map_err(|e| ExportError::Io {
            path: jsonl_path.clone(),
            source: e,
        })?;
    }

    let mut csv_writer = csv::Writer::from_path(&csv_path).map_err(|e| ExportError::Csv {
        path: csv_path.clone(),
        source: e,
    })?;
    csv_writer.write_record(CSV_HEADER).map_err(|e| ExportError::Csv {
        path: csv_path.clone(),
        source: e,
    })?;
    for plan in plans {
        csv_writer.write_record(csv_record(plan)).map_err(|e| ExportError::Csv {
            path: csv_path.clone(),
            source: e,
        })?;
    }
    csv_writer.flush().map_err(|e| ExportError::Io {
        path: csv_path.clone(),
        source: e,
    })?;

    Ok((jsonl_path, csv_path))
}

/// Read back a JSONL export (e.g. as the `materialize` argument when no
/// catalog plan-run id was given).
pub fn read_plans_jsonl(path: &Path) -> Result<Vec<Plan>, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(ExportError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: i64) -> Plan {
        Plan {
            id,
            file_id: 1,
            label_id: 1,
            operation: "copy".to_string(),
            source_path: "/a/b.pdf".to_string(),
            target_path: "/staging/b.pdf".to_string(),
            target_filename: "b.pdf".to_string(),
            tags: Some("invoice,2024".to_string()),
            needs_review: false,
            materialized_at: None,
            plan_run_id: 1,
            created_at: 0,
        }
    }

    #[test]
    fn test_export_paths_swaps_extension() {
        let (jsonl, csv) = export_paths(Path::new("/tmp/plans.jsonl"));
        assert_eq!(jsonl, PathBuf::from("/tmp/plans.jsonl"));
        assert_eq!(csv, PathBuf::from("/tmp/plans.csv"));
    }

    #[test]
    fn test_export_paths_from_bare_stem() {
        let (jsonl, csv) = export_paths(Path::new("/tmp/plans"));
        assert_eq!(jsonl, PathBuf::from("/tmp/plans.jsonl"));
        assert_eq!(csv, PathBuf::from("/tmp/plans.csv"));
    }

    #[test]
    fn test_csv_export_quotes_commas_in_tags() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run1");

        let (_, csv_path) = export_plans(&[plan(1)], &target).unwrap();
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.contains("\"invoice,2024\""));
    }

    #[test]
    fn test_export_and_read_back_jsonl_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run1");
        let plans = vec![plan(1), plan(2)];

        let (jsonl_path, csv_path) = export_plans(&plans, &target).unwrap();
        assert!(jsonl_path.exists());
        assert!(csv_path.exists());

        let read_back = read_plans_jsonl(&jsonl_path).unwrap();
        assert_eq!(read_back.len(), 2);
        assert_eq!(read_back[0].id, 1);
    }
}
