//! Copy/hardlink materialization and Finder-tag application (C8)

use std::path::Path;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::warn;

use crate::core::config::LucienConfig;
use crate::data::catalog::CatalogError;
use crate::data::catalog::models::Plan;
use crate::data::catalog::repositories::{get_plans_for_run, mark_materialized};

use super::tags_macos::TagApplier;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Default, Clone)]
pub struct MaterializeSummary {
    pub attempted: usize,
    pub materialized: usize,
    pub failed: usize,
}

fn place_file(plan: &Plan) -> std::io::Result<()> {
    let target = Path::new(&plan.target_path);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match plan.operation.as_str() {
        "hardlink" => match std::fs::hard_link(&plan.source_path, target) {
            Ok(()) => Ok(()),
            Err(_) => std::fs::copy(&plan.source_path, target).map(|_| ()),
        },
        _ => std::fs::copy(&plan.source_path, target).map(|_| ()),
    }
}

pub async fn run_materialization(
    pool: &SqlitePool,
    config: &LucienConfig,
    plan_run_id: i64,
) -> Result<MaterializeSummary, MaterializeError> {
    let plans = get_plans_for_run(pool, plan_run_id).await?;
    materialize_plans(pool, config, plans).await
}

/// Materialize a set of plan rows sourced outside the catalog's own
/// work queue, e.g. rows parsed back out of a previously exported JSONL
/// file. Each plan's `id` must still resolve against `pool`'s catalog so
/// `mark_materialized` can record the outcome there.
pub async fn run_materialization_from_plans(
    pool: &SqlitePool,
    config: &LucienConfig,
    plans: Vec<Plan>,
) -> Result<MaterializeSummary, MaterializeError> {
    materialize_plans(pool, config, plans).await
}

async fn materialize_plans(
    pool: &SqlitePool,
    config: &LucienConfig,
    plans: Vec<Plan>,
) -> Result<MaterializeSummary, MaterializeError> {
    let mut summary = MaterializeSummary::default();
    let tagger = super::tags_macos::finder_tagger();

    for plan in plans {
        if plan.materialized_at.is_some() {
            continue;
        }
        summary.attempted += 1;

        if let Err(e) = place_file(&plan) {
            warn!(plan_id = plan.id, error = %e, "failed to materialize plan");
            summary.failed += 1;
            continue;
        }

        if config.materialize.apply_tags {
            if let Some(tags) = &plan.tags {
                if let Err(e) = tagger.apply_tags(Path::new(&plan.target_path), tags) {
                    warn!(plan_id = plan.id, error = %e, "failed to apply tags");
                }
            }
        }

        mark_materialized(pool, plan.id).await?;
        summary.materialized += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(operation: &str, source: &str, target: &str) -> Plan {
        Plan {
            id: 1,
            file_id: 1,
            label_id: 1,
            operation: operation.to_string(),
            source_path: source.to_string(),
            target_path: target.to_string(),
            target_filename: "out.txt".to_string(),
            tags: None,
            needs_review: false,
            materialized_at: None,
            plan_run_id: 1,
            created_at: 0,
        }
    }

    #[test]
    fn test_place_file_copies_source_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"hello").unwrap();
        let target = dir.path().join("staged").join("out.txt");

        let p = plan("copy", source.to_str().unwrap(), target.to_str().unwrap());
        place_file(&p).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[test]
    fn test_place_file_hardlinks_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"hello").unwrap();
        let target = dir.path().join("out.txt");

        let p = plan("hardlink", source.to_str().unwrap(), target.to_str().unwrap());
        place_file(&p).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }
}
