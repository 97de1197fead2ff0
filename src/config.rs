//! Configuration module for the compliance checker.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.clausewise/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CW_` and use double underscores
//! to separate nested levels:
//! - `CW_PIPELINE__THRESHOLD=0.8` sets `pipeline.threshold`
//! - `CW_SEARCH__INDEX=rules` sets `search.index`
//! - `CW_LOGGING__DEFAULT=debug` sets `logging.default`
//!
//! The Azure variables used by existing deployments are honoured as well:
//! `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_API_VERSION`,
//! `AZURE_OPENAI_CHAT_MODEL`, `AZURE_SEARCH_ENDPOINT` and `AZURE_SEARCH_API_KEY`.
//! `CW_` variables win over them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::documents::{DEFAULT_CHUNK_SIZE, DocumentsConfig};
use crate::retry::RetryPolicy;
use crate::semantic::thresholds;
use crate::types::ClauseKind;

/// Directory holding settings and caches, searched for from the current
/// directory upwards.
pub const CONFIG_DIR: &str = ".clausewise";

const SETTINGS_FILE: &str = "settings.toml";

/// Azure variable names and the settings keys they feed.
const AZURE_ENV: [(&str, &str); 6] = [
    ("AZURE_OPENAI_ENDPOINT", "llm.endpoint"),
    ("AZURE_OPENAI_API_KEY", "llm.api_key"),
    ("AZURE_OPENAI_API_VERSION", "llm.api_version"),
    ("AZURE_OPENAI_CHAT_MODEL", "llm.deployment"),
    ("AZURE_SEARCH_ENDPOINT", "search.endpoint"),
    ("AZURE_SEARCH_API_KEY", "search.api_key"),
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .clausewise is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Azure OpenAI chat deployment
    #[serde(default)]
    pub llm: LlmConfig,

    /// Keyword search backend
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    /// Rule corpus and its embedding cache
    #[serde(default)]
    pub rules: RulesConfig,

    /// Strategy selection and failure handling
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Marker substrings for marker-based extraction
    #[serde(default)]
    pub clauses: ClausesConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, keyed by log target (e.g. `pipeline = "debug"`)
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default = "default_llm_api_version")]
    pub api_version: String,

    /// Chat deployment name
    #[serde(default)]
    pub deployment: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// Azure when an endpoint is configured, otherwise local
    Auto,
    /// In-memory index over the rule corpus
    Local,
    /// Azure AI Search index
    Azure,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_backend")]
    pub backend: SearchBackend,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default = "default_search_index")]
    pub index: String,

    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Skip TLS certificate verification (intercepting corporate proxies)
    #[serde(default = "default_false")]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX model
    Fastembed,
    /// Azure OpenAI embeddings deployment (uses the `[llm]` endpoint and key)
    Azure,
    /// Feature hashing, no model download
    Hashing,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_backend")]
    pub backend: EmbeddingBackend,

    /// fastembed model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Azure embeddings deployment name
    #[serde(default)]
    pub deployment: String,

    #[serde(default = "default_embedding_api_version")]
    pub api_version: String,

    /// Vector length of the hashing backend
    #[serde(default = "default_hashing_dimensions")]
    pub dimensions: usize,

    /// Where fastembed stores downloaded models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub show_progress: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RulesConfig {
    /// Plain-text rule corpus
    #[serde(default = "default_rules_source")]
    pub source: PathBuf,

    /// Persisted `{id, text, embedding}` cache
    #[serde(default = "default_rules_cache")]
    pub cache: PathBuf,

    /// Words per rule
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    Keyword,
    Embedding,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Model,
    Marker,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    Model,
    Threshold,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_retrieval")]
    pub retrieval: RetrievalMode,

    #[serde(default = "default_extraction")]
    pub extraction: ExtractionMode,

    #[serde(default = "default_validation")]
    pub validation: ValidationMode,

    /// Minimum similarity for threshold validation (inclusive)
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Ranked rules shown to the model validator
    #[serde(default = "default_context_rules")]
    pub context_rules: usize,

    /// Retries after the first attempt of a provider call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Abort the run on a provider failure instead of degrading the verdict
    #[serde(default = "default_false")]
    pub fail_fast: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClausesConfig {
    /// Clause name to marker substring (case-insensitive)
    #[serde(default = "default_markers")]
    pub markers: BTreeMap<String, String>,
}

impl ClausesConfig {
    /// Markers keyed by clause; unknown names are skipped.
    pub fn parsed(&self) -> Vec<(ClauseKind, String)> {
        self.markers
            .iter()
            .filter_map(|(name, marker)| Some((name.parse().ok()?, marker.clone())))
            .collect()
    }
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_llm_api_version() -> String {
    "2024-08-01-preview".to_string()
}
fn default_search_backend() -> SearchBackend {
    SearchBackend::Auto
}
fn default_search_index() -> String {
    "mou_index".to_string()
}
fn default_search_api_version() -> String {
    "2023-11-01".to_string()
}
fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::Fastembed
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_embedding_api_version() -> String {
    "2024-02-01".to_string()
}
fn default_hashing_dimensions() -> usize {
    384
}
fn default_rules_source() -> PathBuf {
    PathBuf::from("mou_rules.txt")
}
fn default_rules_cache() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("rules.json")
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_retrieval() -> RetrievalMode {
    RetrievalMode::Keyword
}
fn default_extraction() -> ExtractionMode {
    ExtractionMode::Model
}
fn default_validation() -> ValidationMode {
    ValidationMode::Model
}
fn default_threshold() -> f32 {
    thresholds::DEFAULT
}
fn default_context_rules() -> usize {
    1
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_markers() -> BTreeMap<String, String> {
    ClauseKind::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), kind.default_marker().to_string()))
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            rules: RulesConfig::default(),
            pipeline: PipelineConfig::default(),
            clauses: ClausesConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            api_version: default_llm_api_version(),
            deployment: String::new(),
            temperature: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: default_search_backend(),
            endpoint: String::new(),
            api_key: String::new(),
            index: default_search_index(),
            api_version: default_search_api_version(),
            accept_invalid_certs: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            model: default_embedding_model(),
            deployment: String::new(),
            api_version: default_embedding_api_version(),
            dimensions: default_hashing_dimensions(),
            cache_dir: None,
            show_progress: true,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            source: default_rules_source(),
            cache: default_rules_cache(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retrieval: default_retrieval(),
            extraction: default_extraction(),
            validation: default_validation(),
            threshold: default_threshold(),
            context_rules: default_context_rules(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            fail_fast: false,
        }
    }
}

impl Default for ClausesConfig {
    fn default() -> Self {
        Self {
            markers: default_markers(),
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backend after resolving `auto`.
    pub fn resolved_backend(&self) -> SearchBackend {
        match self.backend {
            SearchBackend::Auto if self.endpoint.is_empty() => SearchBackend::Local,
            SearchBackend::Auto => SearchBackend::Azure,
            other => other,
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_ms))
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .clausewise directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Azure variables under their historical names
            .merge(azure_env())
            // Layer in environment variables with CW_ prefix
            // Use double underscore (__) to separate nested levels
            // Single underscore (_) remains as is within field names
            .merge(Env::prefixed("CW_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".") // Double underscore becomes dot
                    .into()
            }))
    }

    /// Find the workspace root by looking for .clausewise directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .clausewise is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under `dir/.clausewise`
    pub fn init_config_file(dir: &Path, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = dir.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let settings = Settings {
            workspace_root: Some(dir.to_path_buf()),
            ..Settings::default()
        };
        settings.save(&config_path)?;

        Ok(config_path)
    }

    /// Resolve a workspace-relative path against the detected root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Reject option combinations that cannot produce a run.
    pub fn validate(&self) -> Result<(), String> {
        let pipeline = &self.pipeline;

        if pipeline.validation == ValidationMode::Threshold
            && pipeline.retrieval != RetrievalMode::Embedding
        {
            return Err(
                "threshold validation needs similarity scores; set pipeline.retrieval = \"embedding\""
                    .to_string(),
            );
        }
        if !(-1.0..=1.0).contains(&pipeline.threshold) {
            return Err(format!(
                "pipeline.threshold must be within [-1, 1], got {}",
                pipeline.threshold
            ));
        }
        if pipeline.context_rules == 0 {
            return Err("pipeline.context_rules must be at least 1".to_string());
        }
        if self.documents.chunk_size == 0 || self.rules.chunk_size == 0 {
            return Err("chunk sizes must be greater than zero".to_string());
        }
        for (name, marker) in &self.clauses.markers {
            name.parse::<ClauseKind>()
                .map_err(|e| format!("clauses.markers: {e}"))?;
            if marker.trim().is_empty() {
                return Err(format!("clauses.markers.{name} must not be empty"));
            }
        }

        Ok(())
    }
}

/// The Azure variables mapped onto their settings keys.
fn azure_env() -> Env {
    let names: Vec<&str> = AZURE_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        let upper = key.as_str().to_ascii_uppercase();
        AZURE_ENV
            .iter()
            .find(|(name, _)| *name == upper)
            .map(|(_, target)| (*target).into())
            .unwrap_or_else(|| key.as_str().to_lowercase().into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.search.index, "mou_index");
        assert_eq!(settings.pipeline.threshold, 0.75);
        assert_eq!(settings.pipeline.retrieval, RetrievalMode::Keyword);
        assert_eq!(settings.pipeline.validation, ValidationMode::Model);
        assert_eq!(settings.documents.default_document, "proper_mou_document.txt");
        assert_eq!(
            settings.clauses.markers["parties_responsibilities"],
            "responsibilit"
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[pipeline]
retrieval = "embedding"
validation = "threshold"
threshold = 0.6
fail_fast = true

[search]
index = "rules_v2"
accept_invalid_certs = true

[clauses.markers]
purpose = "objective"

[logging.modules]
pipeline = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.pipeline.retrieval, RetrievalMode::Embedding);
        assert_eq!(settings.pipeline.validation, ValidationMode::Threshold);
        assert_eq!(settings.pipeline.threshold, 0.6);
        assert!(settings.pipeline.fail_fast);
        assert_eq!(settings.search.index, "rules_v2");
        assert!(settings.search.accept_invalid_certs);
        assert_eq!(settings.clauses.markers["purpose"], "objective");
        assert!(
            settings
                .clauses
                .parsed()
                .contains(&(ClauseKind::Purpose, "objective".to_string()))
        );
        assert_eq!(settings.logging.modules["pipeline"], "debug");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.pipeline.max_retries = 5;
        settings.rules.chunk_size = 50;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.pipeline.max_retries, 5);
        assert_eq!(loaded.rules.chunk_size, 50);
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[documents]\nchunk_size = 120\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified value
        assert_eq!(settings.documents.chunk_size, 120);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert_eq!(settings.pipeline.context_rules, 1);
        assert_eq!(settings.clauses.markers.len(), ClauseKind::ALL.len());
    }

    #[test]
    fn test_init_config_file() {
        let temp_dir = TempDir::new().unwrap();

        let path = Settings::init_config_file(temp_dir.path(), false).unwrap();
        assert!(path.ends_with(".clausewise/settings.toml"));
        assert!(Settings::init_config_file(temp_dir.path(), false).is_err());
        assert!(Settings::init_config_file(temp_dir.path(), true).is_ok());

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.workspace_root.as_deref(), Some(temp_dir.path()));
    }

    #[test]
    fn test_threshold_needs_embedding_retrieval() {
        let mut settings = Settings::default();
        settings.pipeline.validation = ValidationMode::Threshold;
        assert!(settings.validate().unwrap_err().contains("embedding"));

        settings.pipeline.retrieval = RetrievalMode::Embedding;
        assert!(settings.validate().is_ok());

        settings.pipeline.threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_unknown_marker_clause_is_rejected() {
        let mut settings = Settings::default();
        settings
            .clauses
            .markers
            .insert("arbitration".to_string(), "arbitrat".to_string());
        assert!(settings.validate().unwrap_err().contains("arbitration"));
    }

    #[test]
    fn test_search_backend_resolution() {
        let mut search = SearchConfig::default();
        assert_eq!(search.resolved_backend(), SearchBackend::Local);

        search.endpoint = "https://acme.search.windows.net".to_string();
        assert_eq!(search.resolved_backend(), SearchBackend::Azure);

        search.backend = SearchBackend::Local;
        assert_eq!(search.resolved_backend(), SearchBackend::Local);
    }

    #[test]
    fn test_resolve_path() {
        let settings = Settings {
            workspace_root: Some(PathBuf::from("/work")),
            ..Settings::default()
        };
        assert_eq!(
            settings.resolve_path(Path::new("mou_rules.txt")),
            PathBuf::from("/work/mou_rules.txt")
        );
        assert_eq!(
            settings.resolve_path(Path::new("/abs/rules.txt")),
            PathBuf::from("/abs/rules.txt")
        );
    }
}
