//! Cache configuration
//!
//! A [`CacheConfig`] can be built in code, loaded from a YAML or JSON file,
//! and overridden from `PERSCACHE_*` environment variables.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{error::IoOperation, storage::DEFAULT_LOCATION, CacheError, Result};

/// Prefix of the environment variables read by [`CacheConfig::from_env`]
pub const ENV_PREFIX: &str = "PERSCACHE_";

/// Settings for a [`Cache`](crate::Cache) backed by local files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding cache blobs
    pub location: PathBuf,
    /// Upper bound on the total size of stored blobs, in bytes
    pub max_size: Option<u64>,
    /// TTL applied to cached functions that do not set their own
    pub default_ttl_secs: Option<u64>,
    /// Run every cached function directly
    pub disabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from(DEFAULT_LOCATION),
            max_size: None,
            default_ttl_secs: None,
            disabled: false,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().apply_overrides(std::env::vars())
    }

    /// Load configuration from a file
    ///
    /// The format is picked from the extension: `.yaml`/`.yml` or `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| CacheError::io(path, IoOperation::Read, e))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
        let config: Self = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| CacheError::invalid_config("file", format!("{}: {}", path.display(), e)))?,
            "json" => serde_json::from_str(&content)
                .map_err(|e| CacheError::invalid_config("file", format!("{}: {}", path.display(), e)))?,
            other => {
                return Err(CacheError::invalid_config(
                    "file",
                    format!("unsupported config format {:?} for {}", other, path.display()),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Apply `PERSCACHE_*` variables from an iterator of `(name, value)` pairs
    ///
    /// Unrelated variables are ignored. An empty value clears an optional
    /// setting.
    pub fn apply_overrides<I, K, V>(mut self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(field) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match field {
                "LOCATION" => {
                    self.location = PathBuf::from(value);
                }
                "MAX_SIZE" => {
                    self.max_size = parse_optional_u64("max_size", value)?;
                }
                "TTL_SECS" => {
                    self.default_ttl_secs = parse_optional_u64("default_ttl_secs", value)?;
                }
                "DISABLED" => {
                    self.disabled = parse_flag("disabled", value)?;
                }
                _ => {}
            }
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings no cache could honour
    pub fn validate(&self) -> Result<()> {
        if self.location.as_os_str().is_empty() {
            return Err(CacheError::invalid_config("location", "must not be empty"));
        }
        if self.max_size == Some(0) {
            return Err(CacheError::invalid_config("max_size", "must be positive"));
        }
        if self.default_ttl_secs == Some(0) {
            return Err(CacheError::invalid_config("default_ttl_secs", "must be positive"));
        }
        Ok(())
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}

fn parse_optional_u64(field: &str, value: &str) -> Result<Option<u64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|e| CacheError::invalid_config(field, format!("{value:?}: {e}")))
}

fn parse_flag(field: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CacheError::invalid_config(field, format!("{value:?} is not a boolean"))),
    }
}
