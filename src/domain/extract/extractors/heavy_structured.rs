//! Heavy structured extractor ("docling")
//!
//! Shells out to an external `docling` conversion tool for PDFs and
//! office documents, trading speed for layout-aware text (tables, page
//! structure). Gated behind `extraction.use_docling` since it is far
//! slower than the other extractors and not every deployment has the
//! tool installed.
//!
//! The external call is a blocking subprocess wait, raced against a
//! wall-clock timeout via `tokio::time::timeout` around a
//! `spawn_blocking`. If the timeout fires first, the blocking thread
//! (and the child process on it) is abandoned rather than joined — the
//! extraction pool's outer hang timeout is the backstop that recycles a
//! worker stuck behind a runaway subprocess.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use async_trait::async_trait;

use super::super::chain::{Extractor, ExtractorError};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "xlsx", "doc", "ppt", "xls"];

pub struct HeavyStructuredExtractor {
    timeout: Duration,
}

impl HeavyStructuredExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Extractor for HeavyStructuredExtractor {
    fn name(&self) -> &'static str {
        "docling"
    }

    fn supports(&self, path: &Path, _mime_type: Option<&str>) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let path = path.to_path_buf();
        let timeout = self.timeout;

        let call = tokio::task::spawn_blocking(move || run_docling(&path));

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(ExtractorError::new(format!(
                "docling worker thread panicked: {join_err}"
            ))),
            Err(_) => Err(ExtractorError::new(format!(
                "docling extraction timed out after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

fn run_docling(path: &PathBuf) -> Result<String, ExtractorError> {
    let output = Command::new("docling")
        .arg(path)
        .arg("--to")
        .arg("text")
        .arg("--output")
        .arg("-")
        .output()
        .map_err(|e| ExtractorError::new(format!("failed to spawn docling: {e}")))?;

    if !output.status.success() {
        return Err(ExtractorError::new(format!(
            "docling exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| ExtractorError::new(format!("docling produced non-UTF-8 output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_pdf_and_office_extensions() {
        let extractor = HeavyStructuredExtractor::new(Duration::from_secs(90));
        assert!(extractor.supports(Path::new("a.pdf"), None));
        assert!(extractor.supports(Path::new("a.DOCX"), None));
        assert!(!extractor.supports(Path::new("a.txt"), None));
    }

    #[tokio::test]
    async fn test_extract_missing_binary_reports_error() {
        let extractor = HeavyStructuredExtractor::new(Duration::from_secs(5));
        let err = extractor
            .extract(Path::new("/nonexistent/does-not-matter.pdf"))
            .await
            .unwrap_err();
        assert!(!err.0.is_empty());
    }
}
