//! OCR extractor
//!
//! Shells out to `tesseract` for image files and scanned pages that have
//! no extractable text layer. Last resort before falling through to the
//! plain-text extractor, which would just produce garbage on an image.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;

use super::super::chain::{Extractor, ExtractorError};

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "tif", "bmp", "gif"];

pub struct VisionOcrExtractor;

#[async_trait]
impl Extractor for VisionOcrExtractor {
    fn name(&self) -> &'static str {
        "vision_ocr"
    }

    fn supports(&self, path: &Path, mime_type: Option<&str>) -> bool {
        if let Some(mime) = mime_type {
            if mime.starts_with("image/") {
                return true;
            }
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || run_tesseract(&path))
            .await
            .map_err(|e| ExtractorError::new(format!("vision_ocr worker thread panicked: {e}")))?
    }
}

fn run_tesseract(path: &std::path::Path) -> Result<String, ExtractorError> {
    let output = Command::new("tesseract")
        .arg(path)
        .arg("stdout")
        .output()
        .map_err(|e| ExtractorError::new(format!("failed to spawn tesseract: {e}")))?;

    if !output.status.success() {
        return Err(ExtractorError::new(format!(
            "tesseract exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| ExtractorError::new(format!("tesseract produced non-UTF-8 output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_image_mime_and_extensions() {
        let extractor = VisionOcrExtractor;
        assert!(extractor.supports(Path::new("a.png"), None));
        assert!(extractor.supports(Path::new("a.unknown"), Some("image/webp")));
        assert!(!extractor.supports(Path::new("a.txt"), Some("text/plain")));
    }

    #[tokio::test]
    async fn test_extract_missing_binary_reports_error() {
        let extractor = VisionOcrExtractor;
        let err = extractor
            .extract(Path::new("/nonexistent/a.png"))
            .await
            .unwrap_err();
        assert!(!err.0.is_empty());
    }
}
