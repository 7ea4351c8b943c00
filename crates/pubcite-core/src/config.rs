use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PubciteError, Result};

/// Upper bound accepted for `fetch.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Root configuration, loaded from `~/.config/pubcite/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PubciteConfig {
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Search URL with an `{id}` placeholder for the percent-encoded identifier.
    pub query_url: String,
    pub min_interval_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Rotated per request. Empty means the built-in list.
    pub user_agents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_hours: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub pretty: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            query_url: "https://pubmed.ncbi.nlm.nih.gov/?term={id}".to_string(),
            min_interval_ms: 1000,
            max_retries: 3,
            timeout_secs: 30,
            user_agents: Vec::new(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: 24 * 7,
            directory: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "article_metadata.csl.json".to_string(),
            pretty: true,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl PubciteConfig {
    /// Standard config file path: `~/.config/pubcite/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PUBCITE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pubcite")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fetch.query_url.contains("{id}") {
            return Err(PubciteError::ConfigError(format!(
                "fetch.query_url must contain an {{id}} placeholder: {}",
                self.fetch.query_url
            )));
        }
        if self.fetch.max_retries > MAX_RETRIES_LIMIT {
            return Err(PubciteError::ConfigError(format!(
                "fetch.max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                self.fetch.max_retries
            )));
        }
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Directory for cached article pages.
    pub fn cache_dir(&self) -> PathBuf {
        match self.cache.directory.as_deref() {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("pubcite")
                .join("pages"),
        }
    }
}
