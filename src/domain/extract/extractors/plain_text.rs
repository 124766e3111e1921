//! Plain-text extractor
//!
//! Catch-all for everything else: reads the raw bytes, sniffs the
//! character encoding with `chardetng`, and decodes with `encoding_rs`.
//! Always claims support, so the chain never runs out of options for a
//! file it could otherwise read byte-for-byte.

use std::path::Path;

use async_trait::async_trait;
use chardetng::EncodingDetector;

use super::super::chain::{Extractor, ExtractorError};

pub struct PlainTextExtractor;

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain_text"
    }

    fn supports(&self, _path: &Path, _mime_type: Option<&str>) -> bool {
        true
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractorError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || decode_file(&path))
            .await
            .map_err(|e| ExtractorError::new(format!("plain_text worker thread panicked: {e}")))?
    }
}

fn decode_file(path: &Path) -> Result<String, ExtractorError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ExtractorError::new(format!("failed to read {}: {e}", path.display())))?;

    let mut detector = EncodingDetector::new();
    detector.feed(&bytes, true);
    let encoding = detector.guess(None, true);

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors && text.trim().is_empty() {
        return Err(ExtractorError::new(format!(
            "could not decode {} as text ({})",
            path.display(),
            encoding.name()
        )));
    }

    Ok(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_decodes_utf8_text() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        std::fs::write(&file_path, "hello world").unwrap();

        let extractor = PlainTextExtractor;
        let text = extractor.extract(&file_path).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_extract_missing_file_errors() {
        let extractor = PlainTextExtractor;
        let err = extractor
            .extract(Path::new("/nonexistent/a.txt"))
            .await
            .unwrap_err();
        assert!(err.0.contains("failed to read"));
    }

    #[test]
    fn test_supports_always_true() {
        let extractor = PlainTextExtractor;
        assert!(extractor.supports(Path::new("anything.bin"), None));
    }
}
