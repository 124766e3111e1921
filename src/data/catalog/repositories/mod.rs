//! Catalog repositories
//!
//! Types (`File`, `Label`, `Plan`, etc.) live in `crate::data::catalog::models`.

pub mod extractions;
pub mod files;
pub mod labels;
pub mod plans;
pub mod runs;

pub use extractions::{
    get_latest_extraction, insert_extraction, list_extractions_for_file,
};
pub use files::{count_files, files_needing_extraction, get_file, get_file_by_path, upsert_file};
pub use labels::{files_needing_labeling, get_latest_label_for_file, insert_label};
pub use plans::{files_needing_planning, get_plan, get_plans_for_run, insert_plan, mark_materialized};
pub use runs::{finish_run, get_run, start_run};
