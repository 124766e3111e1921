//! Platform-aware data storage directory management
//!
//! ## Platform Paths
//!
//! | Type | Windows | macOS | Linux |
//! |------|---------|-------|-------|
//! | Data | `%APPDATA%\Lucien\` | `~/Library/Application Support/Lucien/` | `$XDG_DATA_HOME/lucien/` |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;

use super::constants::{APP_DOT_FOLDER, APP_NAME, ENV_DATA_DIR};
use crate::utils::file::expand_path;

/// Data subdirectories under the resolved data directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSubdir {
    /// Catalog database, WAL and journal files
    Catalog,
    /// Content-addressed extracted-text sidecars
    ExtractedText,
    /// Worker subprocess log sink
    WorkerLogs,
    /// Materialization staging tree
    Staging,
}

impl DataSubdir {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DataSubdir::Catalog => "catalog",
            DataSubdir::ExtractedText => "extracted-text",
            DataSubdir::WorkerLogs => "worker-logs",
            DataSubdir::Staging => "staging",
        }
    }

    /// Subdirectories created unconditionally at startup. The staging
    /// directory is created lazily by the materializer since operators
    /// commonly point it at a different volume via configuration.
    pub const fn all() -> &'static [DataSubdir] {
        &[DataSubdir::Catalog, DataSubdir::ExtractedText, DataSubdir::WorkerLogs]
    }
}

/// Resolves and owns the engine's data directory and its subdirectories.
///
/// Catalog path, extracted-text root, and staging root are all
/// independently overridable via configuration; this struct only
/// resolves the *default* locations under the platform data directory.
/// Callers that have an explicit config-provided path should use that
/// instead of `subdir()`.
#[derive(Debug, Clone)]
pub struct AppStorage {
    data_dir: PathBuf,
}

impl AppStorage {
    /// Initialize storage with the platform-appropriate data directory,
    /// creating the fixed subdirectories.
    pub async fn init() -> Result<Self> {
        let data_dir = Self::resolve_data_dir();

        Self::ensure_directories_static(&data_dir).await?;

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        tracing::debug!(data_dir = %data_dir.display(), "storage initialized");

        Ok(Self { data_dir })
    }

    /// Resolve the data directory from an env var override or the
    /// platform default, falling back to a dotfolder in the cwd.
    pub fn resolve_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            return expand_path(&dir);
        }

        if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            return proj_dirs.data_dir().to_path_buf();
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        cwd.join(APP_DOT_FOLDER)
    }

    async fn ensure_directories_static(data_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

        for subdir in DataSubdir::all() {
            let path = data_dir.join(subdir.as_str());
            tokio::fs::create_dir_all(&path).await.with_context(|| {
                format!("failed to create {} directory: {}", subdir.as_str(), path.display())
            })?;
        }

        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to a fixed subdirectory (not canonicalized: callers may pass
    /// this to code that creates the directory lazily).
    pub fn subdir(&self, subdir: DataSubdir) -> PathBuf {
        self.data_dir.join(subdir.as_str())
    }

    pub fn data_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(filename)
    }

    pub fn subdir_path(&self, subdir: DataSubdir, filename: &str) -> PathBuf {
        self.data_dir.join(subdir.as_str()).join(filename)
    }

    #[cfg(test)]
    pub fn init_for_test(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }
}
