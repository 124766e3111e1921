//! Content-addressed extraction store (C3)
//!
//! Extracted text is stored gzip-compressed, sharded two levels deep by
//! the leading hex characters of the file's content digest (so a large
//! archive doesn't dump tens of thousands of sidecars into one
//! directory), as `<shard>/<shard>/<digest>.txt.gz`.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::core::constants::{SIDECAR_EXTENSION, TEXT_TRUNCATION_MARKER_TEMPLATE};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of writing a sidecar: its path relative to the extracted-text
/// root, and the character count of what was actually stored (after any
/// truncation).
pub struct WrittenSidecar {
    pub relative_path: String,
    pub char_count: usize,
}

/// Path of a digest's sidecar relative to the extracted-text root.
pub fn relative_sidecar_path(digest: &str) -> String {
    if digest.len() < 4 {
        return format!("{digest}{SIDECAR_EXTENSION}");
    }
    format!(
        "{}/{}/{}{}",
        &digest[0..2],
        &digest[2..4],
        digest,
        SIDECAR_EXTENSION
    )
}

/// Truncate `text` to at most `max_chars` characters, keeping a head and
/// tail half separated by the truncation marker, if it exceeds the
/// limit. Returns the text unchanged otherwise.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        return text.to_string();
    }

    let marker = TEXT_TRUNCATION_MARKER_TEMPLATE.replace("{max}", &max_chars.to_string());
    let half = max_chars / 2;
    let head: String = text.chars().take(half).collect();
    let tail: String = text
        .chars()
        .skip(char_count.saturating_sub(half))
        .collect();

    format!("{head}{marker}{tail}")
}

/// Gzip-compress `text` (after truncation) and write it under `root` at
/// its content-addressed path, creating parent directories as needed.
pub fn write_sidecar(
    root: &Path,
    digest: &str,
    text: &str,
    max_chars: usize,
) -> Result<WrittenSidecar, StoreError> {
    let stored = truncate_text(text, max_chars);
    let relative_path = relative_sidecar_path(digest);
    let full_path = root.join(&relative_path);

    if let Some(parent) = full_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = std::fs::File::create(&full_path).map_err(|e| StoreError::Io {
        path: full_path.clone(),
        source: e,
    })?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(stored.as_bytes())
        .map_err(|e| StoreError::Io {
            path: full_path.clone(),
            source: e,
        })?;
    encoder.finish().map_err(|e| StoreError::Io {
        path: full_path.clone(),
        source: e,
    })?;

    Ok(WrittenSidecar {
        relative_path,
        char_count: stored.chars().count(),
    })
}

/// Read and decompress a sidecar given its path relative to the
/// extracted-text root.
pub fn read_sidecar(root: &Path, relative_path: &str) -> Result<String, StoreError> {
    let full_path = root.join(relative_path);
    let file = std::fs::File::open(&full_path).map_err(|e| StoreError::Io {
        path: full_path.clone(),
        source: e,
    })?;
    let mut decoder = GzDecoder::new(file);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| StoreError::Io {
            path: full_path,
            source: e,
        })?;
    Ok(text)
}
