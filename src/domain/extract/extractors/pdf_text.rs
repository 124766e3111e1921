//! Light PDF text extractor
//!
//! Pulls embedded text directly from a PDF's content streams via
//! `pdf_extract`. Much faster than the structured extractor but blind to
//! tables, scanned pages, and layout — those fall through to OCR.

use std::path::Path;

use async_trait::async_trait;

use super::super::chain::{Extractor, ExtractorError};

pub struct PdfTextExtractor;

#[async_trait]
impl Extractor for PdfTextExtractor {
    fn name(&self) -> &'static str {
        "pdf_text"
    }

    fn supports(&self, path: &Path, _mime_type: Option<&str>) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let bytes = std::fs::read(&path)
                .map_err(|e| ExtractorError::new(format!("failed to read {}: {e}", path.display())))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| ExtractorError::new(format!("pdf_extract failed: {e}")))
        })
        .await
        .map_err(|e| ExtractorError::new(format!("pdf_text worker thread panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_only_pdf() {
        let extractor = PdfTextExtractor;
        assert!(extractor.supports(Path::new("a.pdf"), None));
        assert!(extractor.supports(Path::new("a.PDF"), None));
        assert!(!extractor.supports(Path::new("a.docx"), None));
    }

    #[tokio::test]
    async fn test_extract_missing_file_errors() {
        let extractor = PdfTextExtractor;
        let err = extractor
            .extract(Path::new("/nonexistent/a.pdf"))
            .await
            .unwrap_err();
        assert!(err.0.contains("failed to read"));
    }
}
