//! Process configuration loaded from a JSON file at startup

use crate::error::{ProxyError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MIB: u64 = 1024 * 1024;
/// Upper bound for `max_file_size`, in MiB
const MAX_FILE_SIZE_LIMIT: u64 = 1024 * 1024;

/// Validated, read-only process configuration.
///
/// Sizes are in MiB as written in the file; use the `*_bytes` accessors.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_site: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub auth_key: String,
    #[serde(default)]
    pub quality: f32,
    #[serde(default)]
    pub max_file_size: u64,
    #[serde(default)]
    port: u32,
    #[serde(default)]
    pub max_cache_size: u64,
    #[serde(default)]
    pub free_cache_size: u64,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./i")
}

impl Config {
    /// Load from `CONFIG_PATH`, or `config.json` in the working directory
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
        Self::load(Path::new(&path))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_site.is_empty()
            || self.api_key.is_empty()
            || self.auth_key.is_empty()
            || self.quality == 0.0
            || self.max_file_size == 0
            || self.port == 0
            || self.max_cache_size == 0
            || self.free_cache_size == 0
        {
            return Err(ProxyError::Config(
                "missing required configuration fields".to_string(),
            ));
        }

        if self.port > u32::from(u16::MAX) {
            return Err(ProxyError::Config(format!("invalid port: {}", self.port)));
        }

        if self.max_file_size > MAX_FILE_SIZE_LIMIT {
            return Err(ProxyError::Config(format!(
                "max_file_size out of range: {}",
                self.max_file_size
            )));
        }

        Ok(())
    }

    pub fn port(&self) -> u16 {
        u16::try_from(self.port).unwrap_or(u16::MAX)
    }

    pub fn max_file_bytes(&self) -> usize {
        usize::try_from(self.max_file_size * MIB).unwrap_or(usize::MAX)
    }

    pub fn cache_ceiling_bytes(&self) -> u64 {
        self.max_cache_size.saturating_mul(MIB)
    }

    pub fn cache_floor_bytes(&self) -> u64 {
        self.free_cache_size.saturating_mul(MIB)
    }
}
