//! Extractor fallback chain (C4)
//!
//! Extractors are tried in registration order; the first one that
//! claims a file via `supports()` is tried, and on failure the chain
//! moves to the next supporting extractor rather than giving up
//! immediately. The registry's order encodes the fallback policy: the
//! heavy structured extractor first (when enabled), then the light PDF
//! extractor, then OCR, then plain text as the catch-all.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::constants::{
    ERR_NO_EXTRACTOR_AVAILABLE, ERR_PREFIX_ALL_FAILED, ERR_TEMPLATE_EXTENSION_IN_SKIP_LIST,
};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExtractorError(pub String);

impl ExtractorError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Machine-readable name recorded in `extractions.method`.
    fn name(&self) -> &'static str;

    /// Whether this extractor should be tried for a given path/mime.
    fn supports(&self, path: &Path, mime_type: Option<&str>) -> bool;

    async fn extract(&self, path: &Path) -> Result<String, ExtractorError>;
}

pub struct ExtractedText {
    pub text: String,
    pub method: &'static str,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{ERR_NO_EXTRACTOR_AVAILABLE}")]
    NoExtractorAvailable,

    #[error("{ERR_PREFIX_ALL_FAILED}{0}")]
    AllFailed(String),

    #[error("{0}")]
    SkippedExtension(String),
}

impl ChainError {
    /// Whether this outcome should be recorded as `skipped` rather than
    /// `failed` — both the skip-list short-circuit and "nothing in the
    /// registry claims this file" are configuration facts, not failures.
    pub fn is_skipped(&self) -> bool {
        matches!(self, ChainError::NoExtractorAvailable | ChainError::SkippedExtension(_))
    }
}

fn matching_skip_extension(path: &Path, skip_extensions: &[String]) -> Option<String> {
    let lowered = path.to_string_lossy().to_lowercase();
    skip_extensions
        .iter()
        .find(|ext| lowered.ends_with(&ext.to_lowercase()))
        .cloned()
}

pub struct ExtractorChain {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorChain {
    pub fn new(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    pub async fn extract(
        &self,
        path: &Path,
        mime_type: Option<&str>,
        skip_extensions: &[String],
    ) -> Result<ExtractedText, ChainError> {
        if let Some(ext) = matching_skip_extension(path, skip_extensions) {
            let message = ERR_TEMPLATE_EXTENSION_IN_SKIP_LIST.replace("{ext}", &ext);
            return Err(ChainError::SkippedExtension(message));
        }

        let mut last_error: Option<String> = None;
        let mut tried_any = false;

        for extractor in &self.extractors {
            if !extractor.supports(path, mime_type) {
                continue;
            }
            tried_any = true;

            match extractor.extract(path).await {
                Ok(text) => {
                    return Ok(ExtractedText {
                        text,
                        method: extractor.name(),
                    });
                }
                Err(e) => {
                    tracing::debug!(
                        extractor = extractor.name(),
                        path = %path.display(),
                        error = %e,
                        "extractor failed, trying next"
                    );
                    last_error = Some(e.0);
                }
            }
        }

        match last_error {
            Some(err) => Err(ChainError::AllFailed(err)),
            None if tried_any => Err(ChainError::AllFailed("no error recorded".to_string())),
            None => Err(ChainError::NoExtractorAvailable),
        }
    }
}
