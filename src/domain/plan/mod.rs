//! Planning phase: target path derivation, export, and materialization.

pub mod export;
pub mod materialize;
pub mod planner;
pub mod tags_macos;

pub use export::{export_plans, read_plans_jsonl, ExportError};
pub use materialize::{
    run_materialization, run_materialization_from_plans, MaterializeError, MaterializeSummary,
};
pub use planner::{run_planning, PlanSummary, PlannerError};
