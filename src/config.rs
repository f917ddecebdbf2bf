use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EmbdConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model family: `flag`, `minilm`, `mpnet`, or `hash`.
    pub family: String,
    pub size: String,
    pub normalized: bool,
    /// Output width of the `hash` family. Catalog models ignore it.
    pub dimension: usize,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum in-process memo entries; 0 means unbounded.
    pub memo_capacity: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_embd_dir()
            .join("cache.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_embd_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            family: "flag".into(),
            size: "large".into(),
            normalized: true,
            dimension: 384,
            cache_dir,
        }
    }
}

/// Returns `~/.embd/`, or `./.embd/` when no home directory is known.
pub fn default_embd_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".embd")
}

/// Returns the default config file path: `~/.embd/config.toml`
pub fn default_config_path() -> PathBuf {
    default_embd_dir().join("config.toml")
}

impl EmbdConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            EmbdConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (EMBD_DB, EMBD_MODEL, EMBD_SIZE, EMBD_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("EMBD_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("EMBD_MODEL") {
            self.embedding.family = val;
        }
        if let Ok(val) = std::env::var("EMBD_SIZE") {
            self.embedding.size = val;
        }
        if let Ok(val) = std::env::var("EMBD_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
