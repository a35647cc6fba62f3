//! Configuration for the coins explorer
//!
//! Loaded from a TOML file (path in `COINS_CONFIG`), then overridden by
//! environment variables. Every section is optional.
//!
//! ```toml
//! [data]
//! coins = "data/coins.csv"
//! wages = "data/wages.csv"
//! geo_mints = "data/mints.geojson"
//! geo_authorities = "data/authorities.geojson"
//!
//! [cache]
//! max_age_hours = 24
//!
//! [server]
//! bind = "0.0.0.0:8080"
//! static_dir = "public"
//!
//! [fields]
//! MINT = "Mint"
//! VALUEd = "Value (in denarii)"
//! ```

use crate::error::{CoinsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// Environment variables
// ============================================================================

pub const CONFIG_PATH_ENV: &str = "COINS_CONFIG";
pub const DATA_COINS_ENV: &str = "COINS_DATA_COINS";
pub const DATA_WAGES_ENV: &str = "COINS_DATA_WAGES";
pub const BIND_ENV: &str = "COINS_BIND";

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;
const MAX_AGE_CAP_HOURS: u64 = 24 * 365 * 1000;

/// Dataset file locations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub coins: Option<PathBuf>,
    pub wages: Option<PathBuf>,
    pub geo_mints: Option<PathBuf>,
    pub geo_authorities: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which a cached dataset is reloaded on next access
    pub max_age_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
        }
    }
}

impl CacheConfig {
    /// Capped at roughly a thousand years
    pub fn max_age(&self) -> chrono::Duration {
        let hours = self.max_age_hours.min(MAX_AGE_CAP_HOURS);
        chrono::Duration::hours(hours as i64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,

    /// Directory of static front-end files served at `/`
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            static_dir: None,
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,

    /// External field name -> human readable label
    pub fields: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| CoinsError::config(format!("invalid TOML: {}", e)))
    }

    /// Load a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| CoinsError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    /// Load from `COINS_CONFIG` (defaults when unset), then apply overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(coins) = lookup(DATA_COINS_ENV) {
            self.data.coins = Some(PathBuf::from(coins));
        }

        if let Some(wages) = lookup(DATA_WAGES_ENV) {
            self.data.wages = Some(PathBuf::from(wages));
        }

        if let Some(bind) = lookup(BIND_ENV) {
            self.server.bind = bind;
        }
    }

    /// Label for a field, if configured
    pub fn field_label(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
