//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/casg.sqlite"
//!
//! [storage]
//! default_index = "default"
//! max_page_size = 1000
//!
//! [server]
//! bind = "127.0.0.1:8040"
//! fetch_path = "/query/fetch"
//! search_path = "/query/search"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use cas_gateway_core::engine::{EngineSettings, DEFAULT_INDEX, DEFAULT_MAX_PAGE_SIZE};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_index")]
    pub default_index: String,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            default_index: default_index(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_index() -> String {
    DEFAULT_INDEX.to_string()
}
fn default_max_page_size() -> i64 {
    DEFAULT_MAX_PAGE_SIZE
}

impl StorageConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_index: self.default_index.clone(),
            max_page_size: self.max_page_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Fetch route prefix; the hash is appended as `/{hash}`.
    #[serde(default = "default_fetch_path")]
    pub fetch_path: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            fetch_path: default_fetch_path(),
            search_path: default_search_path(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8040".to_string()
}
fn default_fetch_path() -> String {
    "/query/fetch".to_string()
}
fn default_search_path() -> String {
    "/query/search".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.storage.default_index.trim().is_empty() {
        anyhow::bail!("storage.default_index must not be empty");
    }

    if config.storage.max_page_size < 1 {
        anyhow::bail!("storage.max_page_size must be >= 1");
    }

    for (key, route) in [
        ("server.fetch_path", &config.server.fetch_path),
        ("server.search_path", &config.server.search_path),
    ] {
        if !route.starts_with('/') || route.len() < 2 || route.ends_with('/') {
            anyhow::bail!(
                "{} must start with '/' and not end with '/', got '{}'",
                key,
                route
            );
        }
    }

    if config.server.fetch_path == config.server.search_path {
        anyhow::bail!("server.fetch_path and server.search_path must differ");
    }

    Ok(())
}
