//! Layered engine configuration.
//!
//! Precedence, highest wins: `LUCIEN_`-prefixed environment variables
//! (nested keys joined with `__`) > project-local `./lucien.yaml` > the
//! user-global config file under the platform config directory > the
//! built-in defaults below. An all-`Option` mirror struct is deeply
//! merged across each layer, then folded onto the defaults as a final
//! assembly step, with the environment overlay applied last.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::constants::*;

// =============================================================================
// Runtime configuration (fully resolved, no Options)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LucienConfig {
    pub source_root: Option<PathBuf>,
    pub index_db: PathBuf,
    pub extracted_text_dir: PathBuf,
    pub staging_root: PathBuf,
    pub llm: LlmConfig,
    pub extraction: ExtractionConfig,
    pub scan: ScanConfig,
    pub taxonomy: TaxonomyConfig,
    pub naming: NamingConfig,
    pub materialize: MaterializeConfig,
    pub pool: PoolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub default_model: String,
    pub escalation_model: String,
    pub escalation_threshold: f64,
    pub escalation_doc_types: Vec<String>,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            default_model: "llama3".to_string(),
            escalation_model: "llama3:70b".to_string(),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            escalation_doc_types: DEFAULT_ESCALATION_DOC_TYPES.iter().map(|s| s.to_string()).collect(),
            max_retries: DEFAULT_LLM_MAX_RETRIES,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub skip_extensions: Vec<String>,
    pub methods: Vec<String>,
    pub max_text_length: usize,
    pub use_docling: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            skip_extensions: vec![".zip".to_string(), ".exe".to_string(), ".dmg".to_string()],
            methods: vec![
                "docling".to_string(),
                "pdf_text".to_string(),
                "vision_ocr".to_string(),
                "plain_text".to_string(),
            ],
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            use_docling: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    pub skip_dirs: Vec<String>,
    pub follow_symlinks: bool,
    pub hash_algorithm: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
            follow_symlinks: false,
            hash_algorithm: DEFAULT_HASH_ALGORITHM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    pub top_level: Vec<String>,
    pub doc_types: Vec<String>,
    pub tags: Vec<String>,
    pub family_members: Vec<String>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            top_level: vec![
                "Financial".to_string(),
                "Medical".to_string(),
                "Legal".to_string(),
                "Personal".to_string(),
            ],
            doc_types: vec![
                "financial".to_string(),
                "tax".to_string(),
                "medical".to_string(),
                "insurance".to_string(),
                "legal".to_string(),
                "receipt".to_string(),
                "correspondence".to_string(),
                "uncategorized".to_string(),
            ],
            tags: vec!["important".to_string(), "archived".to_string()],
            family_members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    pub format: String,
    pub separator: String,
    pub date_format: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_NAMING_FORMAT.to_string(),
            separator: DEFAULT_NAMING_SEPARATOR.to_string(),
            date_format: DEFAULT_NAMING_DATE_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeConfig {
    pub default_mode: String,
    pub apply_tags: bool,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        Self {
            default_mode: "copy".to_string(),
            apply_tags: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// None = host CPU count, clamped to >= 1
    pub workers: Option<usize>,
    pub max_tasks_heavy: u32,
    pub max_tasks_light: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_tasks_heavy: POOL_MAX_TASKS_HEAVY,
            max_tasks_light: POOL_MAX_TASKS_LIGHT,
        }
    }
}

impl Default for LucienConfig {
    fn default() -> Self {
        let data_dir = crate::core::storage::AppStorage::resolve_data_dir();
        Self {
            source_root: None,
            index_db: data_dir.join(crate::core::storage::DataSubdir::Catalog.as_str()).join(CATALOG_DB_FILENAME),
            extracted_text_dir: data_dir.join(DEFAULT_EXTRACTED_TEXT_DIRNAME),
            staging_root: data_dir.join(DEFAULT_STAGING_DIRNAME),
            llm: LlmConfig::default(),
            extraction: ExtractionConfig::default(),
            scan: ScanConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            naming: NamingConfig::default(),
            materialize: MaterializeConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

// =============================================================================
// File overlay (all-Option mirror, deeply merged)
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawConfig {
    pub source_root: Option<PathBuf>,
    pub index_db: Option<PathBuf>,
    pub extracted_text_dir: Option<PathBuf>,
    pub staging_root: Option<PathBuf>,
    #[serde(default)]
    pub llm: RawLlmConfig,
    #[serde(default)]
    pub extraction: RawExtractionConfig,
    #[serde(default)]
    pub scan: RawScanConfig,
    #[serde(default)]
    pub taxonomy: RawTaxonomyConfig,
    #[serde(default)]
    pub naming: RawNamingConfig,
    #[serde(default)]
    pub materialize: RawMaterializeConfig,
    #[serde(default)]
    pub pool: RawPoolConfig,
}

macro_rules! raw_section {
    ($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Default, Clone, Deserialize)]
        pub struct $name {
            $(pub $field: Option<$ty>,)*
        }

        impl $name {
            fn merge(&mut self, other: Self) {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            }
        }
    };
}

raw_section!(RawLlmConfig {
    base_url: String,
    default_model: String,
    escalation_model: String,
    escalation_threshold: f64,
    escalation_doc_types: Vec<String>,
    max_retries: u32,
    timeout_secs: u64,
});

raw_section!(RawExtractionConfig {
    skip_extensions: Vec<String>,
    methods: Vec<String>,
    max_text_length: usize,
    use_docling: bool,
});

raw_section!(RawScanConfig {
    skip_dirs: Vec<String>,
    follow_symlinks: bool,
    hash_algorithm: String,
});

raw_section!(RawTaxonomyConfig {
    top_level: Vec<String>,
    doc_types: Vec<String>,
    tags: Vec<String>,
    family_members: Vec<String>,
});

raw_section!(RawNamingConfig {
    format: String,
    separator: String,
    date_format: String,
});

raw_section!(RawMaterializeConfig {
    default_mode: String,
    apply_tags: bool,
});

raw_section!(RawPoolConfig {
    workers: usize,
    max_tasks_heavy: u32,
    max_tasks_light: u32,
});

impl RawConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(raw)
    }

    /// Merge `other` over `self`; fields set in `other` win.
    pub fn merge(&mut self, other: RawConfig) {
        if other.source_root.is_some() {
            self.source_root = other.source_root;
        }
        if other.index_db.is_some() {
            self.index_db = other.index_db;
        }
        if other.extracted_text_dir.is_some() {
            self.extracted_text_dir = other.extracted_text_dir;
        }
        if other.staging_root.is_some() {
            self.staging_root = other.staging_root;
        }
        self.llm.merge(other.llm);
        self.extraction.merge(other.extraction);
        self.scan.merge(other.scan);
        self.taxonomy.merge(other.taxonomy);
        self.naming.merge(other.naming);
        self.materialize.merge(other.materialize);
        self.pool.merge(other.pool);
    }

    /// Fold this overlay onto a base runtime config, field by field.
    fn apply_onto(self, base: &mut LucienConfig) {
        if let Some(v) = self.source_root {
            base.source_root = Some(v);
        }
        if let Some(v) = self.index_db {
            base.index_db = v;
        }
        if let Some(v) = self.extracted_text_dir {
            base.extracted_text_dir = v;
        }
        if let Some(v) = self.staging_root {
            base.staging_root = v;
        }

        let llm = self.llm;
        if let Some(v) = llm.base_url {
            base.llm.base_url = v;
        }
        if let Some(v) = llm.default_model {
            base.llm.default_model = v;
        }
        if let Some(v) = llm.escalation_model {
            base.llm.escalation_model = v;
        }
        if let Some(v) = llm.escalation_threshold {
            base.llm.escalation_threshold = v;
        }
        if let Some(v) = llm.escalation_doc_types {
            base.llm.escalation_doc_types = v;
        }
        if let Some(v) = llm.max_retries {
            base.llm.max_retries = v;
        }
        if let Some(v) = llm.timeout_secs {
            base.llm.timeout_secs = v;
        }

        let extraction = self.extraction;
        if let Some(v) = extraction.skip_extensions {
            base.extraction.skip_extensions = v;
        }
        if let Some(v) = extraction.methods {
            base.extraction.methods = v;
        }
        if let Some(v) = extraction.max_text_length {
            base.extraction.max_text_length = v;
        }
        if let Some(v) = extraction.use_docling {
            base.extraction.use_docling = v;
        }

        let scan = self.scan;
        if let Some(v) = scan.skip_dirs {
            base.scan.skip_dirs = v;
        }
        if let Some(v) = scan.follow_symlinks {
            base.scan.follow_symlinks = v;
        }
        if let Some(v) = scan.hash_algorithm {
            base.scan.hash_algorithm = v;
        }

        let taxonomy = self.taxonomy;
        if let Some(v) = taxonomy.top_level {
            base.taxonomy.top_level = v;
        }
        if let Some(v) = taxonomy.doc_types {
            base.taxonomy.doc_types = v;
        }
        if let Some(v) = taxonomy.tags {
            base.taxonomy.tags = v;
        }
        if let Some(v) = taxonomy.family_members {
            base.taxonomy.family_members = v;
        }

        let naming = self.naming;
        if let Some(v) = naming.format {
            base.naming.format = v;
        }
        if let Some(v) = naming.separator {
            base.naming.separator = v;
        }
        if let Some(v) = naming.date_format {
            base.naming.date_format = v;
        }

        let materialize = self.materialize;
        if let Some(v) = materialize.default_mode {
            base.materialize.default_mode = v;
        }
        if let Some(v) = materialize.apply_tags {
            base.materialize.apply_tags = v;
        }

        let pool = self.pool;
        if let Some(v) = pool.workers {
            base.pool.workers = Some(v);
        }
        if let Some(v) = pool.max_tasks_heavy {
            base.pool.max_tasks_heavy = v;
        }
        if let Some(v) = pool.max_tasks_light {
            base.pool.max_tasks_light = v;
        }
    }
}

// =============================================================================
// File path resolution
// =============================================================================

/// Path to the project-local config file in the current working directory.
pub fn project_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Path to the user-global config file under the platform config directory.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|d| d.config_dir().join(CONFIG_FILE_NAME))
}

// =============================================================================
// Load & environment overlay
// =============================================================================

impl LucienConfig {
    /// Load configuration applying the documented precedence: defaults,
    /// then user-global file, then project-local file, then environment
    /// variables (highest wins).
    pub fn load() -> Result<Self> {
        let mut raw = RawConfig::default();

        if let Some(user_path) = user_config_path() {
            if user_path.is_file() {
                tracing::debug!(path = %user_path.display(), "loading user-global config");
                raw.merge(RawConfig::load_from_file(&user_path)?);
            }
        }

        let project_path = match std::env::var(ENV_CONFIG) {
            Ok(explicit) => PathBuf::from(explicit),
            Err(_) => project_config_path(),
        };
        if project_path.is_file() {
            tracing::debug!(path = %project_path.display(), "loading project-local config");
            raw.merge(RawConfig::load_from_file(&project_path)?);
        }

        let mut config = LucienConfig::default();
        raw.apply_onto(&mut config);
        apply_env_overlay(&mut config);

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Serialize the default configuration to a commented YAML document
    /// for `init-config`.
    pub fn render_default_yaml() -> Result<String> {
        let config = LucienConfig::default();
        let body = serde_yaml::to_string(&config).context("failed to serialize default config")?;
        Ok(format!(
            "# Lucien configuration.\n\
             # Values here are the built-in defaults; uncomment and edit to override.\n\
             # Precedence (highest wins): LUCIEN_ environment variables > this file\n\
             # (when project-local) > the user-global config file > these defaults.\n\n{body}"
        ))
    }
}

/// Apply `LUCIEN_`-prefixed, `__`-nested environment variable overrides
/// onto an already-assembled configuration. Scalars are parsed with YAML
/// so booleans/numbers/lists can be expressed the same way as in the file
/// (`LUCIEN_TAXONOMY__DOC_TYPES='["a","b"]'`).
fn apply_env_overlay(config: &mut LucienConfig) {
    macro_rules! overlay {
        ($env_key:expr, $field:expr) => {
            if let Ok(raw) = std::env::var($env_key) {
                match serde_yaml::from_str(&raw) {
                    Ok(value) => $field = value,
                    Err(err) => tracing::warn!(key = $env_key, %err, "ignoring unparsable env override"),
                }
            }
        };
    }

    if let Ok(raw) = std::env::var(format!("{ENV_CONFIG_PREFIX}SOURCE_ROOT")) {
        config.source_root = Some(PathBuf::from(raw));
    }
    overlay!(format!("{ENV_CONFIG_PREFIX}INDEX_DB"), config.index_db);
    overlay!(format!("{ENV_CONFIG_PREFIX}EXTRACTED_TEXT_DIR"), config.extracted_text_dir);
    overlay!(format!("{ENV_CONFIG_PREFIX}STAGING_ROOT"), config.staging_root);

    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__BASE_URL"), config.llm.base_url);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__DEFAULT_MODEL"), config.llm.default_model);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__ESCALATION_MODEL"), config.llm.escalation_model);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__ESCALATION_THRESHOLD"), config.llm.escalation_threshold);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__ESCALATION_DOC_TYPES"), config.llm.escalation_doc_types);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__MAX_RETRIES"), config.llm.max_retries);
    overlay!(format!("{ENV_CONFIG_PREFIX}LLM__TIMEOUT_SECS"), config.llm.timeout_secs);

    overlay!(format!("{ENV_CONFIG_PREFIX}EXTRACTION__SKIP_EXTENSIONS"), config.extraction.skip_extensions);
    overlay!(format!("{ENV_CONFIG_PREFIX}EXTRACTION__METHODS"), config.extraction.methods);
    overlay!(format!("{ENV_CONFIG_PREFIX}EXTRACTION__MAX_TEXT_LENGTH"), config.extraction.max_text_length);
    overlay!(format!("{ENV_CONFIG_PREFIX}EXTRACTION__USE_DOCLING"), config.extraction.use_docling);

    overlay!(format!("{ENV_CONFIG_PREFIX}SCAN__SKIP_DIRS"), config.scan.skip_dirs);
    overlay!(format!("{ENV_CONFIG_PREFIX}SCAN__FOLLOW_SYMLINKS"), config.scan.follow_symlinks);
    overlay!(format!("{ENV_CONFIG_PREFIX}SCAN__HASH_ALGORITHM"), config.scan.hash_algorithm);

    overlay!(format!("{ENV_CONFIG_PREFIX}TAXONOMY__TOP_LEVEL"), config.taxonomy.top_level);
    overlay!(format!("{ENV_CONFIG_PREFIX}TAXONOMY__DOC_TYPES"), config.taxonomy.doc_types);
    overlay!(format!("{ENV_CONFIG_PREFIX}TAXONOMY__TAGS"), config.taxonomy.tags);
    overlay!(format!("{ENV_CONFIG_PREFIX}TAXONOMY__FAMILY_MEMBERS"), config.taxonomy.family_members);

    overlay!(format!("{ENV_CONFIG_PREFIX}NAMING__FORMAT"), config.naming.format);
    overlay!(format!("{ENV_CONFIG_PREFIX}NAMING__SEPARATOR"), config.naming.separator);
    overlay!(format!("{ENV_CONFIG_PREFIX}NAMING__DATE_FORMAT"), config.naming.date_format);

    overlay!(format!("{ENV_CONFIG_PREFIX}MATERIALIZE__DEFAULT_MODE"), config.materialize.default_mode);
    overlay!(format!("{ENV_CONFIG_PREFIX}MATERIALIZE__APPLY_TAGS"), config.materialize.apply_tags);

    if let Ok(raw) = std::env::var(format!("{ENV_CONFIG_PREFIX}POOL__WORKERS")) {
        match raw.parse::<usize>() {
            Ok(v) => config.pool.workers = Some(v),
            Err(err) => tracing::warn!(%err, "ignoring unparsable LUCIEN_POOL__WORKERS"),
        }
    }
    overlay!(format!("{ENV_CONFIG_PREFIX}POOL__MAX_TASKS_HEAVY"), config.pool.max_tasks_heavy);
    overlay!(format!("{ENV_CONFIG_PREFIX}POOL__MAX_TASKS_LIGHT"), config.pool.max_tasks_light);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_sane_values() {
        let config = LucienConfig::default();
        assert!(config.source_root.is_none());
        assert_eq!(config.llm.escalation_threshold, DEFAULT_ESCALATION_THRESHOLD);
        assert_eq!(config.extraction.max_text_length, DEFAULT_MAX_TEXT_LENGTH);
        assert!(!config.scan.follow_symlinks);
        assert_eq!(config.pool.max_tasks_heavy, POOL_MAX_TASKS_HEAVY);
        assert!(config.pool.workers.is_none());
    }

    #[test]
    fn test_raw_merge_prefers_later_values() {
        let mut base = RawConfig::default();
        base.llm.base_url = Some("http://a".to_string());
        base.llm.max_retries = Some(1);

        let mut overlay = RawConfig::default();
        overlay.llm.base_url = Some("http://b".to_string());

        base.merge(overlay);

        assert_eq!(base.llm.base_url, Some("http://b".to_string()));
        assert_eq!(base.llm.max_retries, Some(1));
    }

    #[test]
    fn test_raw_apply_onto_only_overrides_present_fields() {
        let mut config = LucienConfig::default();
        let original_model = config.llm.default_model.clone();

        let mut raw = RawConfig::default();
        raw.llm.escalation_threshold = Some(0.42);
        raw.apply_onto(&mut config);

        assert_eq!(config.llm.escalation_threshold, 0.42);
        assert_eq!(config.llm.default_model, original_model);
    }

    #[test]
    fn test_env_overlay_overrides_base_url() {
        // SAFETY: test runs single-threaded
        unsafe { std::env::set_var("LUCIEN_LLM__BASE_URL", "http://overridden:1234") };
        let mut config = LucienConfig::default();
        apply_env_overlay(&mut config);
        assert_eq!(config.llm.base_url, "http://overridden:1234");
        unsafe { std::env::remove_var("LUCIEN_LLM__BASE_URL") };
    }
}
