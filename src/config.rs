use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::TravelParams;

/// Top-level configuration; every section is optional
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub params: TravelParams,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Postcode lookup settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ResolverConfig {
    pub base_url: String,
    /// Attempts per postcode before giving up
    pub retries: u32,
    /// Fixed delay between attempts
    pub backoff_ms: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Lookups in flight at once during batch resolution
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.postcodes.io".to_string(),
            retries: 2,
            backoff_ms: 1000,
            timeout_secs: 10,
            concurrency: 8,
        }
    }
}

impl ResolverConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
