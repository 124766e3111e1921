//! Catalog database schema
//!
//! Version 1 is the only schema this engine ships with today; the
//! infra tables (`schema_version`, `schema_migrations`) exist so a
//! future version bump has somewhere to record itself.

pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = r#"
-- Schema versioning infrastructure

CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER NOT NULL,
    success INTEGER NOT NULL
);

-- A run is one invocation of a pipeline phase (scan/extract/label/plan).
-- config_snapshot carries the serialized config active for that run, for
-- after-the-fact provenance ("what settings produced this label?").

CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_type TEXT NOT NULL CHECK (run_type IN ('scan', 'extract', 'label', 'plan')),
    config_snapshot TEXT,
    started_at INTEGER NOT NULL,
    completed_at INTEGER,
    status TEXT NOT NULL DEFAULT 'running' CHECK (status IN ('running', 'completed', 'failed')),
    error TEXT
);

CREATE INDEX IF NOT EXISTS idx_runs_run_type ON runs (run_type);

-- One row per file discovered by a scan. path is the source-of-truth
-- identity; sha256 dedups identical content at different paths.

CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    sha256 TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    mime_type TEXT,
    mtime INTEGER NOT NULL,
    ctime INTEGER NOT NULL,
    scan_run_id INTEGER NOT NULL REFERENCES runs (id),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_files_sha256 ON files (sha256);
CREATE INDEX IF NOT EXISTS idx_files_scan_run_id ON files (scan_run_id);

-- One row per extraction attempt. A file can be re-extracted across
-- runs (e.g. after a config change); extraction_run_id disambiguates
-- which attempt a row belongs to and the catalog queries always pick
-- the greatest extraction_run_id as the "current" sidecar for a file.

CREATE TABLE IF NOT EXISTS extractions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files (id) ON DELETE CASCADE,
    method TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('success', 'failed', 'skipped')),
    sidecar_path TEXT,
    char_count INTEGER,
    error TEXT,
    extraction_run_id INTEGER NOT NULL REFERENCES runs (id),
    created_at INTEGER NOT NULL,
    UNIQUE (file_id, extraction_run_id)
);

CREATE INDEX IF NOT EXISTS idx_extractions_file_id ON extractions (file_id);
CREATE INDEX IF NOT EXISTS idx_extractions_status ON extractions (status);

-- One row per labeling attempt, same run-scoping convention as
-- extractions. suggested_tags is a JSON array of strings.

CREATE TABLE IF NOT EXISTS labels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files (id) ON DELETE CASCADE,
    doc_type TEXT NOT NULL,
    title TEXT,
    canonical_filename TEXT,
    suggested_tags TEXT,
    target_group_path TEXT,
    date TEXT,
    issuer TEXT,
    source TEXT,
    confidence REAL NOT NULL CHECK (confidence >= 0.0 AND confidence <= 1.0),
    explanation TEXT,
    model_name TEXT NOT NULL,
    prompt_version TEXT NOT NULL,
    escalated INTEGER NOT NULL DEFAULT 0,
    labeling_run_id INTEGER NOT NULL REFERENCES runs (id),
    created_at INTEGER NOT NULL,
    UNIQUE (file_id, labeling_run_id)
);

CREATE INDEX IF NOT EXISTS idx_labels_file_id ON labels (file_id);
CREATE INDEX IF NOT EXISTS idx_labels_doc_type ON labels (doc_type);

-- One row per planned materialization. tags is a JSON array; target_path
-- is the full destination path under the staging root.

CREATE TABLE IF NOT EXISTS plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id INTEGER NOT NULL REFERENCES files (id) ON DELETE CASCADE,
    label_id INTEGER NOT NULL REFERENCES labels (id),
    operation TEXT NOT NULL CHECK (operation IN ('copy', 'hardlink')),
    source_path TEXT NOT NULL,
    target_path TEXT NOT NULL,
    target_filename TEXT NOT NULL,
    tags TEXT,
    needs_review INTEGER NOT NULL DEFAULT 0,
    materialized_at INTEGER,
    plan_run_id INTEGER NOT NULL REFERENCES runs (id),
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_plans_file_id ON plans (file_id);
CREATE INDEX IF NOT EXISTS idx_plans_plan_run_id ON plans (plan_run_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_is_positive() {
        assert!(SCHEMA_VERSION > 0);
    }

    #[test]
    fn test_schema_is_not_empty() {
        assert!(!SCHEMA.trim().is_empty());
    }

    #[test]
    fn test_schema_contains_required_tables() {
        for table in [
            "schema_version",
            "schema_migrations",
            "runs",
            "files",
            "extractions",
            "labels",
            "plans",
        ] {
            assert!(
                SCHEMA.contains(&format!("TABLE IF NOT EXISTS {table}")),
                "schema missing table {table}"
            );
        }
    }

    #[test]
    fn test_schema_statements_are_semicolon_terminated() {
        let statements: Vec<&str> = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert!(statements.len() >= 8);
    }
}
