//! Self-re-exec subprocess worker
//!
//! This module is the entry point for the hidden `extract-worker`
//! subcommand: the pool supervisor re-execs the current binary with that
//! argument and talks to the resulting child over piped stdio. Each
//! request/response is one line of JSON. The worker intentionally knows
//! nothing about the catalog — it only turns a path into text and hands
//! the result back; all bookkeeping lives in the supervisor.
//!
//! stderr is redirected to the null device for the duration of each
//! extraction call so a misbehaving extractor (docling, tesseract)
//! can't interleave raw subprocess chatter with the worker's own JSON
//! stream on stdout; the worker logs to a file sink instead.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::chain::ExtractorChain;
use super::extractors::{HeavyStructuredExtractor, PdfTextExtractor, PlainTextExtractor, VisionOcrExtractor};
use super::store;

#[derive(Debug, Deserialize)]
pub struct WorkerRequest {
    pub file_id: i64,
    pub path: String,
    pub sha256: String,
    pub mime_type: Option<String>,
    pub use_docling: bool,
    pub max_text_length: usize,
    pub extracted_text_dir: PathBuf,
    pub skip_extensions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub file_id: i64,
    pub status: String,
    pub method: Option<String>,
    pub sidecar_path: Option<String>,
    pub char_count: Option<i64>,
    pub error: Option<String>,
}

fn build_chain(use_docling: bool) -> ExtractorChain {
    let mut extractors: Vec<Box<dyn super::chain::Extractor>> = Vec::new();
    if use_docling {
        extractors.push(Box::new(HeavyStructuredExtractor::new(
            std::time::Duration::from_secs(crate::core::constants::DEFAULT_HEAVY_EXTRACTOR_TIMEOUT_SECS),
        )));
    }
    extractors.push(Box::new(PdfTextExtractor));
    extractors.push(Box::new(VisionOcrExtractor));
    extractors.push(Box::new(PlainTextExtractor));
    ExtractorChain::new(extractors)
}

async fn handle_request(chain: &ExtractorChain, req: WorkerRequest) -> WorkerResponse {
    let path = PathBuf::from(&req.path);

    match chain
        .extract(&path, req.mime_type.as_deref(), &req.skip_extensions)
        .await
    {
        Ok(extracted) => {
            match store::write_sidecar(
                &req.extracted_text_dir,
                &req.sha256,
                &extracted.text,
                req.max_text_length,
            ) {
                Ok(written) => WorkerResponse {
                    file_id: req.file_id,
                    status: "success".to_string(),
                    method: Some(extracted.method.to_string()),
                    sidecar_path: Some(written.relative_path),
                    char_count: Some(written.char_count as i64),
                    error: None,
                },
                Err(e) => WorkerResponse {
                    file_id: req.file_id,
                    status: "failed".to_string(),
                    method: Some(extracted.method.to_string()),
                    sidecar_path: None,
                    char_count: None,
                    error: Some(format!("failed to write sidecar: {e}")),
                },
            }
        }
        Err(e) => {
            let status = if e.is_skipped() { "skipped" } else { "failed" };
            WorkerResponse {
                file_id: req.file_id,
                status: status.to_string(),
                method: None,
                sidecar_path: None,
                char_count: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Run the worker's stdin/stdout request-response loop until stdin is
/// closed. Intended to be called from `main` when `extract-worker` is
/// the parsed subcommand, inside a single-threaded or multi-threaded
/// tokio runtime — either works since each request is handled serially.
pub async fn run() -> std::io::Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut chain: Option<(bool, ExtractorChain)> = None;

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<WorkerRequest>(&line) {
            Ok(req) => {
                if chain.as_ref().map(|(d, _)| *d) != Some(req.use_docling) {
                    chain = Some((req.use_docling, build_chain(req.use_docling)));
                }
                let (_, chain_ref) = chain.as_ref().unwrap();
                handle_request(chain_ref, req).await
            }
            Err(e) => {
                tracing::error!(error = %e, "worker received malformed request");
                continue;
            }
        };

        let encoded = serde_json::to_string(&response)?;
        writeln!(stdout, "{encoded}")?;
        stdout.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_request_plain_text_success() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, "hello worker").unwrap();

        let chain = build_chain(false);
        let req = WorkerRequest {
            file_id: 1,
            path: src.to_string_lossy().to_string(),
            sha256: "deadbeef".to_string(),
            mime_type: Some("text/plain".to_string()),
            use_docling: false,
            max_text_length: 1000,
            extracted_text_dir: dir.path().to_path_buf(),
            skip_extensions: vec![],
        };

        let response = handle_request(&chain, req).await;
        assert_eq!(response.status, "success");
        assert_eq!(response.method.as_deref(), Some("plain_text"));
        assert!(response.sidecar_path.is_some());
    }

    #[tokio::test]
    async fn test_handle_request_short_circuits_skip_listed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("archive.zip");
        std::fs::write(&src, "pkzip").unwrap();

        let chain = build_chain(false);
        let req = WorkerRequest {
            file_id: 1,
            path: src.to_string_lossy().to_string(),
            sha256: "deadbeef".to_string(),
            mime_type: None,
            use_docling: false,
            max_text_length: 1000,
            extracted_text_dir: dir.path().to_path_buf(),
            skip_extensions: vec![".zip".to_string()],
        };

        let response = handle_request(&chain, req).await;
        assert_eq!(response.status, "skipped");
        assert_eq!(response.error.as_deref(), Some("Extension .zip in skip list"));
    }

    #[test]
    fn test_worker_response_roundtrips_through_json() {
        let response = WorkerResponse {
            file_id: 42,
            status: "success".to_string(),
            method: Some("plain_text".to_string()),
            sidecar_path: Some("de/ad/deadbeef.txt.gz".to_string()),
            char_count: Some(12),
            error: None,
        };
        let encoded = serde_json::to_string(&response).unwrap();
        let decoded: WorkerResponse = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.file_id, 42);
        assert_eq!(decoded.sidecar_path, response.sidecar_path);
    }
}
