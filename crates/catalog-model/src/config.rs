//! Catalog session configuration.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use wms_common::{CatalogError, CatalogResult};

/// Settings shared by every model in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Prefix of the caching proxy outbound URLs are routed through
    pub proxy_prefix: Option<String>,

    /// Cache duration used when an item sets none
    pub default_cache_duration: String,

    /// Imagery providers kept per item
    pub imagery_cache_capacity: usize,

    /// Upper bound when expanding a time dimension
    pub max_discrete_times: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            proxy_prefix: None,
            default_cache_duration: "1d".to_string(),
            imagery_cache_capacity: 16,
            max_discrete_times: 1000,
        }
    }
}

impl CatalogConfig {
    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&contents).map_err(|e| {
            CatalogError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration from `CATALOG_*` environment variables.
    pub fn from_env() -> CatalogResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            proxy_prefix: env::var("CATALOG_PROXY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty()),
            default_cache_duration: env::var("CATALOG_DEFAULT_CACHE_DURATION")
                .unwrap_or(defaults.default_cache_duration),
            imagery_cache_capacity: parse_var(
                "CATALOG_IMAGERY_CACHE_CAPACITY",
                defaults.imagery_cache_capacity,
            )?,
            max_discrete_times: parse_var(
                "CATALOG_MAX_DISCRETE_TIMES",
                defaults.max_discrete_times,
            )?,
        })
    }
}

fn parse_var(name: &str, default: usize) -> CatalogResult<usize> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| CatalogError::Config(format!("{name} must be a number, got '{value}'"))),
        Err(_) => Ok(default),
    }
}
