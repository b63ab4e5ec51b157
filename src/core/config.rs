//! Jobmatch configuration module
//!
//! Config is read from `.jobmatch.json` in the data root. Every field has a
//! default, so a partial file (or no file at all) is valid.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::error::EngineError;

pub const CONFIG_FILE: &str = ".jobmatch.json";
pub const CONFIG_VERSION: u32 = 1;
/// Environment variable holding the generation API key (never read from file)
pub const API_KEY_ENV: &str = "JOBMATCH_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

/// Where job records come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// SQLite database holding `job_posts` (authoritative)
    #[serde(default)]
    pub database: Option<String>,

    /// Spreadsheet exports (JSON or YAML row arrays)
    #[serde(default)]
    pub sheets: Vec<String>,
}

/// Nearest-neighbour strategy used by index queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategy {
    /// Full scan, exact cosine similarity
    #[default]
    Exact,
    /// HNSW graph candidates, re-scored exactly
    Hnsw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_dir")]
    pub dir: String,

    #[serde(default)]
    pub strategy: QueryStrategy,

    #[serde(default = "default_ef_search", rename = "efSearch")]
    pub ef_search: usize,
}

fn default_index_dir() -> String {
    ".jobmatch/index".to_string()
}

fn default_ef_search() -> usize {
    50
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_index_dir(),
            strategy: QueryStrategy::default(),
            ef_search: default_ef_search(),
        }
    }
}

/// Default Model2Vec model ID
pub const DEFAULT_MODEL2VEC_MODEL: &str = "minishlab/potion-multilingual-128M";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Use Model2Vec instead of the built-in HTP embedder
    #[serde(default, rename = "useAdvanced")]
    pub use_advanced: bool,

    #[serde(default, rename = "modelPath")]
    pub model_path: Option<String>,

    #[serde(default = "default_model_id", rename = "modelId")]
    pub model_id: String,

    #[serde(default = "default_cache_ttl", rename = "cacheTtlSecs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity", rename = "cacheCapacity")]
    pub cache_capacity: usize,
}

fn default_model_id() -> String {
    DEFAULT_MODEL2VEC_MODEL.to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            use_advanced: false,
            model_path: None,
            model_id: default_model_id(),
            cache_ttl_secs: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_top_n", rename = "topN")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    10
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k", rename = "topK")]
    pub top_k: usize,

    /// Upper bound on snippets in one context block
    #[serde(default = "default_max_items", rename = "maxItems")]
    pub max_items: usize,

    /// Total character budget of the context block
    #[serde(default = "default_max_chars", rename = "maxChars")]
    pub max_chars: usize,

    /// Description characters kept per snippet
    #[serde(default = "default_snippet_chars", rename = "snippetChars")]
    pub snippet_chars: usize,

    /// Snapshot age after which retrieval is flagged stale (0 disables)
    #[serde(default = "default_max_index_age", rename = "maxIndexAgeHours")]
    pub max_index_age_hours: u64,

    /// Pool multiplier used when the query names a location
    #[serde(default = "default_location_pool_factor", rename = "locationPoolFactor")]
    pub location_pool_factor: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_max_items() -> usize {
    10
}

fn default_max_chars() -> usize {
    6000
}

fn default_snippet_chars() -> usize {
    500
}

fn default_max_index_age() -> u64 {
    24
}

fn default_location_pool_factor() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_items: default_max_items(),
            max_chars: default_max_chars(),
            snippet_chars: default_snippet_chars(),
            max_index_age_hours: default_max_index_age(),
            location_pool_factor: default_location_pool_factor(),
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> std::result::Result<(), EngineError> {
        if self.max_items == 0 {
            return Err(EngineError::Config(
                "retrieval.maxItems must be greater than 0".into(),
            ));
        }
        if self.max_chars == 0 {
            return Err(EngineError::Config(
                "retrieval.maxChars must be greater than 0".into(),
            ));
        }
        if self.location_pool_factor == 0 {
            return Err(EngineError::Config(
                "retrieval.locationPoolFactor must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_api_base", rename = "apiBase")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens", rename = "maxTokens")]
    pub max_tokens: usize,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> usize {
    800
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            sources: SourcesConfig::default(),
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            ranking: RankingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if config_path.exists() {
            match Self::load_from_file(&config_path) {
                Ok(config) => {
                    if config.version > CONFIG_VERSION {
                        tracing::warn!(
                            "config version {} is newer than supported version {}",
                            config.version,
                            CONFIG_VERSION
                        );
                    }
                    return config;
                }
                Err(e) => {
                    tracing::warn!("failed to load {}: {}. Using defaults.", CONFIG_FILE, e);
                }
            }
        }

        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(root.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Generate default config file content
    pub fn default_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Config::default())?)
    }

    /// Get resolved paths based on the data root
    pub fn resolve_paths(&self, root: &Path) -> ResolvedPaths {
        let resolve = |p: &str| {
            let path = PathBuf::from(p);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };

        ResolvedPaths {
            root: root.to_path_buf(),
            index_dir: resolve(&self.index.dir),
            database: self.sources.database.as_deref().map(resolve),
            sheets: self.sources.sheets.iter().map(|s| resolve(s)).collect(),
            model_path: self.embedding.model_path.as_deref().map(resolve),
        }
    }
}

/// Resolved absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub root: PathBuf,
    pub index_dir: PathBuf,
    pub database: Option<PathBuf>,
    pub sheets: Vec<PathBuf>,
    pub model_path: Option<PathBuf>,
}
