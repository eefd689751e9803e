//! TOML configuration.
//!
//! ```toml
//! [data]
//! path = "data/file_info.csv"
//!
//! [index]
//! top_k = 10
//!
//! [embedding]
//! provider = "hashing"
//! dims = 384
//!
//! [search]
//! default_start_date = "2024-01-01"
//! default_end_date = "2024-09-29"
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use filescout_core::models::parse_iso_date;
use filescout_core::refine::DateWindow;
use filescout_core::search::{SearchSettings, SubQueryPolicy};
use filescout_core::split::SplitMode;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// CSV file the corpus is bootstrapped from.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "hashing".to_string()
}
fn default_dims() -> usize {
    384
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_start_date")]
    pub default_start_date: String,
    #[serde(default = "default_end_date")]
    pub default_end_date: String,
    #[serde(default = "default_nfiles")]
    pub default_nfiles: usize,
    #[serde(default)]
    pub split_mode: SplitMode,
    #[serde(default)]
    pub sub_query_policy: SubQueryPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_start_date: default_start_date(),
            default_end_date: default_end_date(),
            default_nfiles: default_nfiles(),
            split_mode: SplitMode::default(),
            sub_query_policy: SubQueryPolicy::default(),
        }
    }
}

fn default_start_date() -> String {
    "2024-01-01".to_string()
}
fn default_end_date() -> String {
    "2024-09-29".to_string()
}
fn default_nfiles() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Config pointing at `data_path` with every other section defaulted.
    pub fn with_data_path(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data: DataConfig {
                path: data_path.into(),
            },
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Search tuning for the core, derived from `[index]` and `[search]`.
    pub fn search_settings(&self) -> Result<SearchSettings> {
        let start = parse_iso_date(&self.search.default_start_date)
            .context("search.default_start_date")?;
        let end =
            parse_iso_date(&self.search.default_end_date).context("search.default_end_date")?;
        Ok(SearchSettings {
            top_k: self.index.top_k,
            split_mode: self.search.split_mode,
            sub_query_policy: self.search.sub_query_policy,
            default_window: DateWindow { start, end },
            default_nfiles: self.search.default_nfiles,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.top_k == 0 {
            anyhow::bail!("index.top_k must be >= 1");
        }

        if self.search.default_nfiles == 0 {
            anyhow::bail!("search.default_nfiles must be >= 1");
        }

        let settings = self.search_settings()?;
        if settings.default_window.start > settings.default_window.end {
            anyhow::bail!("search.default_start_date must not be after search.default_end_date");
        }

        if self.embedding.dims == 0 {
            anyhow::bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }

        match self.embedding.provider.as_str() {
            "hashing" => {}
            "openai" => {
                if self.embedding.model.is_none() {
                    anyhow::bail!("embedding.model must be specified when provider is 'openai'");
                }
            }
            other => anyhow::bail!(
                "Unknown embedding provider: '{}'. Must be hashing or openai.",
                other
            ),
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Relative data paths are resolved against the config file's directory.
    if config.data.path.is_relative() {
        if let Some(dir) = path.parent() {
            config.data.path = dir.join(&config.data.path);
        }
    }

    config.validate()?;
    Ok(config)
}
