//! Catalog row types
//!
//! Plain structs mirroring the table columns in `schema`. Repository
//! functions map `sqlx::query_as` tuples onto these rather than deriving
//! `sqlx::FromRow`, so a column reorder in a query doesn't silently
//! scramble a struct's fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    Scan,
    Extract,
    Label,
    Plan,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunType::Scan => "scan",
            RunType::Extract => "extract",
            RunType::Label => "label",
            RunType::Plan => "plan",
        }
    }
}

impl std::fmt::Display for RunType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Run {
    pub id: i64,
    pub run_type: String,
    pub config_snapshot: Option<String>,
    pub started_at: i64,
    pub completed_at: Option<i64>,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct File {
    pub id: i64,
    pub path: String,
    pub sha256: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub mtime: i64,
    pub ctime: i64,
    pub scan_run_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    Success,
    Failed,
    Skipped,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Success => "success",
            ExtractionStatus::Failed => "failed",
            ExtractionStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub id: i64,
    pub file_id: i64,
    pub method: String,
    pub status: String,
    pub sidecar_path: Option<String>,
    pub char_count: Option<i64>,
    pub error: Option<String>,
    pub extraction_run_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub id: i64,
    pub file_id: i64,
    pub doc_type: String,
    pub title: Option<String>,
    pub canonical_filename: Option<String>,
    pub suggested_tags: Option<String>,
    pub target_group_path: Option<String>,
    pub date: Option<String>,
    pub issuer: Option<String>,
    pub source: Option<String>,
    pub confidence: f64,
    pub explanation: Option<String>,
    pub model_name: String,
    pub prompt_version: String,
    pub escalated: bool,
    pub labeling_run_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    pub file_id: i64,
    pub label_id: i64,
    pub operation: String,
    pub source_path: String,
    pub target_path: String,
    pub target_filename: String,
    pub tags: Option<String>,
    pub needs_review: bool,
    pub materialized_at: Option<i64>,
    pub plan_run_id: i64,
    pub created_at: i64,
}

/// A file that has a current extraction sidecar but no label for the
/// labeling run in progress — the labeling loop's work-queue row.
#[derive(Debug, Clone)]
pub struct LabelCandidate {
    pub file_id: i64,
    pub path: String,
    pub sidecar_path: String,
}

/// A labeled file with no plan row yet — the planner's work-queue row.
#[derive(Debug, Clone)]
pub struct PlanCandidate {
    pub file_id: i64,
    pub path: String,
    pub label_id: i64,
    pub doc_type: String,
    pub title: Option<String>,
    pub canonical_filename: Option<String>,
    pub suggested_tags: Option<String>,
    pub target_group_path: Option<String>,
    pub date: Option<String>,
    pub confidence: f64,
}
