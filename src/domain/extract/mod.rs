//! Extraction phase: content store, extractor chain, subprocess worker
//! pool, and the self-re-exec worker entry point.

pub mod chain;
pub mod extractors;
pub mod pool;
pub mod store;
pub mod worker;

use sqlx::SqlitePool;
use thiserror::Error;

use crate::core::config::LucienConfig;
use crate::core::constants::{POOL_MAX_TASKS_HEAVY, POOL_MAX_TASKS_LIGHT};
use crate::data::catalog::CatalogError;
use crate::data::catalog::repositories::{finish_run, start_run};

use pool::{ExtractionPool, PoolError, PoolOptions, PoolSummary};

#[derive(Error, Debug)]
pub enum ExtractPhaseError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Run the extraction phase: start a run, drain the ready queue through
/// the worker pool, and close out the run with its final status.
pub async fn run_extraction(
    pool: &SqlitePool,
    config: &LucienConfig,
    workers: Option<usize>,
    limit: Option<i64>,
) -> Result<PoolSummary, ExtractPhaseError> {
    let run_id = start_run(pool, "extract", None).await?;

    let worker_count = workers.or(config.pool.workers).unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });
    let recycle_threshold = if config.extraction.use_docling {
        POOL_MAX_TASKS_HEAVY
    } else {
        POOL_MAX_TASKS_LIGHT
    };

    let options = PoolOptions {
        worker_count,
        recycle_threshold,
        use_docling: config.extraction.use_docling,
        max_text_length: config.extraction.max_text_length,
        extracted_text_dir: config.extracted_text_dir.clone(),
        skip_extensions: config.extraction.skip_extensions.clone(),
        limit,
    };

    let supervisor = ExtractionPool::new(pool.clone(), options);
    let result = supervisor.run(run_id).await;

    match &result {
        Ok(_summary) => {
            finish_run(pool, run_id, "completed", None).await?;
        }
        Err(e) => {
            finish_run(pool, run_id, "failed", Some(&e.to_string())).await?;
        }
    }

    Ok(result?)
}

