//! Command-line surface.
//!
//! Direct phase subcommands rather than a single long-running `serve`
//! command, since this engine drives discrete pipeline phases rather
//! than a server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::constants::{APP_NAME_LOWER, ENV_CONFIG, ENV_DATA_DIR, ENV_LOG, WORKER_SUBCOMMAND_NAME};

#[derive(Parser, Debug)]
#[command(name = APP_NAME_LOWER, version, about = "Document archive processing engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the catalog database file (overrides config's `index_db`)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to a config file to load instead of the project-local default
    #[arg(long, global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Output path, meaning depends on the command (plan export, init-config target)
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Overwrite an existing target where the command would otherwise refuse
    #[arg(long, global = true)]
    pub force: bool,

    /// Cap the number of rows/files processed by the invoked phase
    #[arg(long, global = true)]
    pub limit: Option<i64>,

    /// Override the worker pool size for `extract`
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Override the log filter (same syntax as RUST_LOG)
    #[arg(long, global = true, env = ENV_LOG)]
    pub log: Option<String>,

    /// Override the resolved data directory
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk a source tree and record a content-addressed inventory
    Scan {
        /// Root directory to scan; defaults to the config's `source_root`
        root: Option<PathBuf>,
    },

    /// Report catalog totals and phase coverage without mutating anything
    Stats,

    /// Write a fully-commented default configuration file
    InitConfig,

    /// Extract plain text from files that have not yet been extracted
    Extract,

    /// Classify extracted files via the LLM labeling loop
    Label,

    /// Derive target paths/filenames/tags from labels
    Plan,

    /// Realize a plan run into the staging tree
    Materialize {
        /// A plan-run identifier, or a path to an exported plan file
        plan: String,
    },

    /// Hidden self-re-exec entry point used internally by the extraction pool
    #[command(hide = true, name = "extract-worker")]
    ExtractWorker,
}

impl Commands {
    pub fn is_hidden_worker(&self) -> bool {
        matches!(self, Commands::ExtractWorker)
    }
}

/// Name clap registers for the hidden worker subcommand; used by the pool
/// supervisor when re-exec'ing the current binary.
pub const EXTRACT_WORKER_ARG: &str = WORKER_SUBCOMMAND_NAME;

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_scan_with_root() {
        let cli = Cli::parse_from(["lucien", "scan", "/tmp/archive"]);
        match cli.command {
            Commands::Scan { root } => assert_eq!(root, Some(PathBuf::from("/tmp/archive"))),
            other => panic!("expected Scan, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_materialize_plan_arg() {
        let cli = Cli::parse_from(["lucien", "materialize", "plan-42"]);
        match cli.command {
            Commands::Materialize { plan } => assert_eq!(plan, "plan-42"),
            other => panic!("expected Materialize, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["lucien", "--limit", "10", "--workers", "4", "extract"]);
        assert_eq!(cli.limit, Some(10));
        assert_eq!(cli.workers, Some(4));
    }

    #[test]
    fn test_extract_worker_is_hidden_but_parseable() {
        let cli = Cli::parse_from(["lucien", "extract-worker"]);
        assert!(cli.command.is_hidden_worker());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
