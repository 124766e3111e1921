// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Lucien";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "lucien";

/// Unix-style dotfile folder name, used only as a last-resort fallback
/// when platform project directories cannot be resolved
pub const APP_DOT_FOLDER: &str = ".lucien";

// =============================================================================
// Configuration Files
// =============================================================================

/// Project-local config file name
pub const CONFIG_FILE_NAME: &str = "lucien.yaml";

/// Environment variable for an explicit config file path override
pub const ENV_CONFIG: &str = "LUCIEN_CONFIG";

/// Prefix for environment-variable configuration overlay (nested keys
/// joined with `__`, e.g. `LUCIEN_LLM__BASE_URL`)
pub const ENV_CONFIG_PREFIX: &str = "LUCIEN_";

// =============================================================================
// Environment Variables - Logging & Storage
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "LUCIEN_LOG";

/// Environment variable to override the data directory
pub const ENV_DATA_DIR: &str = "LUCIEN_DATA_DIR";

/// Environment variable carrying an optional bearer token for the LLM
/// endpoint. Never persisted in the config file.
pub const ENV_LLM_API_KEY: &str = "LUCIEN_LLM_API_KEY";

// =============================================================================
// Catalog (SQLite)
// =============================================================================

/// Catalog database filename
pub const CATALOG_DB_FILENAME: &str = "catalog.db";

/// Catalog connection pool max connections
pub const CATALOG_MAX_CONNECTIONS: u32 = 5;

/// Catalog busy timeout in seconds
pub const CATALOG_BUSY_TIMEOUT_SECS: u64 = 30;

/// Catalog cache size (negative = KB, so -64000 = 64MB)
pub const CATALOG_CACHE_SIZE: &str = "-64000";

/// Catalog WAL auto-checkpoint threshold (pages, ~4MB at 1000)
pub const CATALOG_WAL_AUTOCHECKPOINT: &str = "1000";

/// WAL checkpoint interval in seconds (5 minutes)
pub const CATALOG_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Storage Layout
// =============================================================================

/// Default extracted-text sidecar directory name (relative to data dir)
pub const DEFAULT_EXTRACTED_TEXT_DIRNAME: &str = "extracted-text";

/// Default materialization staging directory name (relative to data dir)
pub const DEFAULT_STAGING_DIRNAME: &str = "staging";

/// Worker subprocess log subdirectory name (relative to data dir)
pub const WORKER_LOG_DIRNAME: &str = "worker-logs";

// =============================================================================
// Scanner (C2)
// =============================================================================

/// Hash chunk size in bytes used while streaming file contents (8 KiB,
/// matching the reference implementation)
pub const SCAN_HASH_CHUNK_BYTES: usize = 8 * 1024;

/// Default hash algorithm name
pub const DEFAULT_HASH_ALGORITHM: &str = "sha256";

/// Default directory names pruned during the scan walk
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    "node_modules",
    "__pycache__",
    ".DS_Store",
];

// =============================================================================
// Extraction store (C3)
// =============================================================================

/// Default maximum sidecar text length in characters before truncation
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 50_000;

/// Exact truncation marker text inserted between head and tail when a
/// sidecar's text is truncated (wording from the reference implementation)
pub const TEXT_TRUNCATION_MARKER_TEMPLATE: &str =
    "\n\n[... text truncated to {max} characters ...]\n\n";

/// Sidecar file extension suffix (appended to the hex digest)
pub const SIDECAR_EXTENSION: &str = ".txt.gz";

// =============================================================================
// Extractor chain (C4)
// =============================================================================

/// Default per-extractor wall-clock timeout for the heavy extractor, in seconds
pub const DEFAULT_HEAVY_EXTRACTOR_TIMEOUT_SECS: u64 = 90;

/// Prefix used when all extractors in the chain fail
pub const ERR_PREFIX_ALL_FAILED: &str = "All extractors failed. Last error: ";

/// Error text when no extractor in the registry matches a file's suffix
pub const ERR_NO_EXTRACTOR_AVAILABLE: &str = "No extractor available for this file type";

/// Template for the skip-extensions short-circuit error; `{ext}` is
/// replaced with the matched, as-configured suffix
pub const ERR_TEMPLATE_EXTENSION_IN_SKIP_LIST: &str = "Extension {ext} in skip list";

// =============================================================================
// Extraction pool (C5)
// =============================================================================

/// Default page size when draining the catalog's "files needing extraction" query
pub const POOL_BATCH_PAGE_SIZE: i64 = 100;

/// Ready-queue refill threshold multiplier (refill when below `2 * workers`)
pub const POOL_REFILL_THRESHOLD_MULTIPLIER: usize = 2;

/// Ready-queue initial pre-fill target multiplier (`3 * workers`)
pub const POOL_PREFILL_MULTIPLIER: usize = 3;

/// Supervisor poll interval after observing at least one completion, in milliseconds
pub const POOL_POLL_INTERVAL_BUSY_MS: u64 = 50;

/// Supervisor poll interval when no completions were observed, in milliseconds
pub const POOL_POLL_INTERVAL_IDLE_MS: u64 = 100;

/// Elapsed time past which an in-flight task is classified "processing-slow" (seconds)
pub const POOL_SLOW_THRESHOLD_SECS: u64 = 120;

/// Elapsed time past which an in-flight task is classified "hung" (seconds)
pub const POOL_HANG_TIMEOUT_SECS: u64 = 600;

/// Prefix for the synthesized error recorded when an in-flight task exceeds `POOL_HANG_TIMEOUT_SECS`
pub const ERR_PREFIX_WORKER_HUNG: &str = "Worker hung after ";

/// Default worker recycle threshold (tasks per worker) when the heavy extractor is enabled
pub const POOL_MAX_TASKS_HEAVY: u32 = 20;

/// Default worker recycle threshold (tasks per worker) when the heavy extractor is disabled
pub const POOL_MAX_TASKS_LIGHT: u32 = 200;

/// Hidden subcommand name used for the self-re-exec worker entry point
pub const WORKER_SUBCOMMAND_NAME: &str = "extract-worker";

// =============================================================================
// LLM client (C6)
// =============================================================================

/// Default LLM call timeout in seconds
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Default maximum LLM retries (first attempt + `max_retries - 1` additional tries)
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 3;

/// Fixed sampling temperature for labeling requests
pub const LLM_TEMPERATURE: f32 = 0.1;

/// Fixed max-tokens bound for labeling requests
pub const LLM_MAX_TOKENS: u32 = 1000;

/// Explanation prefix applied when an out-of-vocabulary doc_type is auto-corrected
pub const AUTO_CORRECT_EXPLANATION_PREFIX: &str = "[Auto-corrected from '{original}'] ";

/// The doc_type substituted for any value outside the configured vocabulary
pub const DOC_TYPE_OTHER: &str = "other";

// =============================================================================
// Labeling loop (C7)
// =============================================================================

/// Default confidence threshold below which escalation triggers
pub const DEFAULT_ESCALATION_THRESHOLD: f64 = 0.7;

/// Default doc types considered sensitive enough to always escalate
pub const DEFAULT_ESCALATION_DOC_TYPES: &[&str] =
    &["taxes", "medical", "legal", "insurance"];

/// Doc types that, combined with a missing date or issuer, also trigger escalation
pub const CRITICAL_FIELD_DOC_TYPES: &[&str] =
    &["financial", "tax", "medical", "insurance", "legal"];

/// Number of trailing parent directory names included in the labeling context
pub const CONTEXT_PARENT_DIR_COUNT: usize = 5;

/// Maximum extracted-text length included directly in the user prompt before
/// a second, tighter truncation is applied for prompt construction
pub const PROMPT_TEXT_MAX_LENGTH: usize = 8_000;

/// Marker inserted when the prompt's embedded text is truncated (head/tail split)
pub const PROMPT_TRUNCATION_MARKER: &str = "\n\n[... middle section omitted ...]\n\n";

/// Fraction of `PROMPT_TEXT_MAX_LENGTH` kept from the head when truncating for the prompt
pub const PROMPT_TRUNCATION_HEAD_RATIO: f64 = 0.7;

/// Length (hex characters) the prompt-version hash is truncated to
pub const PROMPT_VERSION_HASH_LEN: usize = 16;

// =============================================================================
// Planner & Materializer (C8)
// =============================================================================

/// Confidence below which a plan row is flagged needs_review
pub const NEEDS_REVIEW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Doc types that always flag needs_review regardless of confidence
pub const NEEDS_REVIEW_DOC_TYPES: &[&str] = &["other", "uncategorized"];

/// Default naming separator used only as an advisory/fallback filename builder
pub const DEFAULT_NAMING_SEPARATOR: &str = "__";

/// Default advisory naming format string (documentation only; the label's
/// canonical_filename is authoritative and this is only a fallback builder)
pub const DEFAULT_NAMING_FORMAT: &str = "YYYY-MM-DD__Domain__Issuer__Title";

/// Default advisory date format used by the fallback filename builder
pub const DEFAULT_NAMING_DATE_FORMAT: &str = "%Y-%m-%d";
