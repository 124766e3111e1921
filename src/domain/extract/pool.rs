//! Extraction worker pool supervisor (C5)
//!
//! Runs extraction across a fixed number of self-re-exec'd subprocess
//! workers. The supervisor never blocks waiting on a single worker: it
//! dispatches a request/response round trip as its own tokio task per
//! in-flight worker and sweeps every worker's `JoinHandle::is_finished()`
//! on a short interval, so one slow file can't stall the others and a
//! hung worker is still detected and recycled.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use sqlx::SqlitePool;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::core::cli::EXTRACT_WORKER_ARG;
use crate::core::constants::{
    ERR_PREFIX_WORKER_HUNG, POOL_BATCH_PAGE_SIZE, POOL_HANG_TIMEOUT_SECS,
    POOL_POLL_INTERVAL_BUSY_MS, POOL_POLL_INTERVAL_IDLE_MS, POOL_PREFILL_MULTIPLIER,
    POOL_REFILL_THRESHOLD_MULTIPLIER, POOL_SLOW_THRESHOLD_SECS,
};
use crate::data::catalog::CatalogError;
use crate::data::catalog::models::File;
use crate::data::catalog::repositories::{files_needing_extraction, insert_extraction};

use super::worker::{WorkerRequest, WorkerResponse};

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker error: {0}")]
    Worker(String),
}

#[derive(Debug, Default, Clone)]
pub struct PoolSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub recycled_workers: usize,
}

pub struct PoolOptions {
    pub worker_count: usize,
    pub recycle_threshold: u32,
    pub use_docling: bool,
    pub max_text_length: usize,
    pub extracted_text_dir: PathBuf,
    pub skip_extensions: Vec<String>,
    pub limit: Option<i64>,
}

struct WorkerHandles {
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

struct WorkerSlot {
    child: Child,
    task_count: u32,
    handles: Option<WorkerHandles>,
    in_flight: Option<InFlight>,
}

struct InFlight {
    file_id: i64,
    started_at: Instant,
    join: JoinHandle<(WorkerHandles, Result<WorkerResponse, PoolError>)>,
}

fn spawn_worker() -> Result<WorkerSlot, PoolError> {
    let exe = std::env::current_exe()?;
    let mut child = Command::new(exe)
        .arg(EXTRACT_WORKER_ARG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(PoolError::Io)?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| PoolError::Worker("worker stdin not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PoolError::Worker("worker stdout not piped".to_string()))?;

    Ok(WorkerSlot {
        child,
        task_count: 0,
        handles: Some(WorkerHandles {
            stdin,
            reader: BufReader::new(stdout),
        }),
        in_flight: None,
    })
}

async fn roundtrip(
    mut handles: WorkerHandles,
    req: WorkerRequest,
) -> (WorkerHandles, Result<WorkerResponse, PoolError>) {
    let result: Result<WorkerResponse, PoolError> = async {
        let encoded = serde_json::to_string(&req)
            .map_err(|e| PoolError::Worker(format!("failed to encode request: {e}")))?;
        handles.stdin.write_all(encoded.as_bytes()).await?;
        handles.stdin.write_all(b"\n").await?;
        handles.stdin.flush().await?;

        let mut line = String::new();
        let n = handles.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(PoolError::Worker("worker closed its stdout".to_string()));
        }

        serde_json::from_str(line.trim())
            .map_err(|e| PoolError::Worker(format!("failed to decode response: {e}")))
    }
    .await;

    (handles, result)
}

pub struct ExtractionPool {
    pool: SqlitePool,
    options: PoolOptions,
}

impl ExtractionPool {
    pub fn new(pool: SqlitePool, options: PoolOptions) -> Self {
        Self { pool, options }
    }

    pub async fn run(&self, extraction_run_id: i64) -> Result<PoolSummary, PoolError> {
        let worker_count = self.options.worker_count.max(1);
        let mut slots = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            slots.push(spawn_worker()?);
        }

        let mut ready: VecDeque<File> = VecDeque::new();
        let mut exhausted = false;
        let mut remaining_limit = self.options.limit;
        let mut summary = PoolSummary::default();

        loop {
            self.refill(&mut ready, &mut exhausted, &mut remaining_limit, worker_count)
                .await?;

            let mut dispatched_any = false;
            for slot in slots.iter_mut() {
                if slot.in_flight.is_some() {
                    continue;
                }
                let Some(handles) = slot.handles.take() else {
                    continue;
                };
                let Some(file) = ready.pop_front() else {
                    slot.handles = Some(handles);
                    continue;
                };

                let req = WorkerRequest {
                    file_id: file.id,
                    path: file.path.clone(),
                    sha256: file.sha256.clone(),
                    mime_type: file.mime_type.clone(),
                    use_docling: self.options.use_docling,
                    max_text_length: self.options.max_text_length,
                    extracted_text_dir: self.options.extracted_text_dir.clone(),
                    skip_extensions: self.options.skip_extensions.clone(),
                };

                summary.attempted += 1;
                dispatched_any = true;
                slot.in_flight = Some(InFlight {
                    file_id: file.id,
                    started_at: Instant::now(),
                    join: tokio::spawn(roundtrip(handles, req)),
                });
            }

            let mut completed_any = false;
            for slot in slots.iter_mut() {
                let Some(in_flight) = slot.in_flight.as_ref() else {
                    continue;
                };

                let elapsed = in_flight.started_at.elapsed();
                if elapsed > Duration::from_secs(POOL_HANG_TIMEOUT_SECS) {
                    let file_id = in_flight.file_id;
                    let in_flight = slot.in_flight.take().unwrap();
                    in_flight.join.abort();
                    slot.child.start_kill().ok();
                    let message = format!("{ERR_PREFIX_WORKER_HUNG}{}s", elapsed.as_secs());
                    record_failure(&self.pool, file_id, extraction_run_id, &message).await?;
                    summary.failed += 1;
                    summary.recycled_workers += 1;
                    *slot = spawn_worker()?;
                    completed_any = true;
                    continue;
                }

                if elapsed > Duration::from_secs(POOL_SLOW_THRESHOLD_SECS) {
                    tracing::warn!(file_id = in_flight.file_id, elapsed_secs = elapsed.as_secs(), "extraction task running slow");
                }

                if !in_flight.join.is_finished() {
                    continue;
                }

                let in_flight = slot.in_flight.take().unwrap();
                completed_any = true;
                match in_flight.join.await {
                    Ok((handles, Ok(response))) => {
                        apply_response(&self.pool, &response, extraction_run_id).await?;
                        if response.status == "success" {
                            summary.succeeded += 1;
                        } else {
                            summary.failed += 1;
                        }
                        slot.task_count += 1;
                        slot.handles = Some(handles);

                        if slot.task_count >= self.options.recycle_threshold {
                            slot.child.start_kill().ok();
                            *slot = spawn_worker()?;
                            summary.recycled_workers += 1;
                        }
                    }
                    Ok((_handles, Err(e))) => {
                        record_failure(&self.pool, in_flight.file_id, extraction_run_id, &e.to_string())
                            .await?;
                        summary.failed += 1;
                        slot.child.start_kill().ok();
                        *slot = spawn_worker()?;
                        summary.recycled_workers += 1;
                    }
                    Err(join_err) => {
                        record_failure(
                            &self.pool,
                            in_flight.file_id,
                            extraction_run_id,
                            &format!("worker task panicked: {join_err}"),
                        )
                        .await?;
                        summary.failed += 1;
                        slot.child.start_kill().ok();
                        *slot = spawn_worker()?;
                        summary.recycled_workers += 1;
                    }
                }
            }

            let all_idle = slots.iter().all(|s| s.in_flight.is_none());
            if all_idle && ready.is_empty() && exhausted {
                break;
            }

            let poll_interval = if completed_any || dispatched_any {
                POOL_POLL_INTERVAL_BUSY_MS
            } else {
                POOL_POLL_INTERVAL_IDLE_MS
            };
            tokio::time::sleep(Duration::from_millis(poll_interval)).await;
        }

        for slot in slots.iter_mut() {
            drop(slot.handles.take());
            let _ = tokio::time::timeout(Duration::from_secs(5), slot.child.wait()).await;
        }

        Ok(summary)
    }

    async fn refill(
        &self,
        ready: &mut VecDeque<File>,
        exhausted: &mut bool,
        remaining_limit: &mut Option<i64>,
        worker_count: usize,
    ) -> Result<(), PoolError> {
        if *exhausted {
            return Ok(());
        }
        if ready.len() >= POOL_REFILL_THRESHOLD_MULTIPLIER * worker_count {
            return Ok(());
        }
        if let Some(limit) = remaining_limit {
            if *limit <= 0 {
                *exhausted = true;
                return Ok(());
            }
        }

        let target = (POOL_PREFILL_MULTIPLIER * worker_count) as i64;
        let page = target.min(POOL_BATCH_PAGE_SIZE);
        let page = match remaining_limit {
            Some(limit) => page.min(*limit),
            None => page,
        };
        if page <= 0 {
            *exhausted = true;
            return Ok(());
        }

        let batch = files_needing_extraction(&self.pool, page, &self.options.skip_extensions).await?;
        let fetched = batch.len() as i64;
        if batch.is_empty() {
            *exhausted = true;
        } else {
            ready.extend(batch);
        }

        if let Some(limit) = remaining_limit {
            *limit -= fetched.min(*limit);
        }

        Ok(())
    }
}

async fn apply_response(
    pool: &SqlitePool,
    response: &WorkerResponse,
    extraction_run_id: i64,
) -> Result<(), PoolError> {
    insert_extraction(
        pool,
        response.file_id,
        response.method.as_deref().unwrap_or("unknown"),
        &response.status,
        response.sidecar_path.as_deref(),
        response.char_count,
        response.error.as_deref(),
        extraction_run_id,
    )
    .await?;
    Ok(())
}

async fn record_failure(
    pool: &SqlitePool,
    file_id: i64,
    extraction_run_id: i64,
    error: &str,
) -> Result<(), PoolError> {
    insert_extraction(
        pool,
        file_id,
        "unknown",
        "failed",
        None,
        None,
        Some(error),
        extraction_run_id,
    )
    .await?;
    Ok(())
}

