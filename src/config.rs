//! Configuration loading helpers.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::cache::{ContentAwareCache, DEFAULT_MAX_SIZE};

/// Errors returned by configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error while reading config files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parse error.
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),
    /// Invalid value for a key.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Raw value string.
        value: String,
    },
    /// Unknown configuration key.
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Top-level configuration schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OxicacheConfig {
    /// Cache engine configuration.
    pub cache: Option<CacheSection>,
    /// Per-extension priority overrides, keyed with or without the
    /// leading dot.
    pub priorities: Option<HashMap<String, f64>>,
}

/// Cache engine configuration overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    /// Size bound in bytes.
    pub max_size: Option<u64>,
}

impl OxicacheConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load configuration from the `OXICACHE_CONFIG` env var (if set),
    /// then apply `OXICACHE__section__field` overrides.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let config_path = env::var("OXICACHE_CONFIG").ok();
        let mut config = match config_path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment overrides in-place.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        for (key, value) in env::vars() {
            if !key.starts_with("OXICACHE__") {
                continue;
            }
            let path = key["OXICACHE__".len()..].to_ascii_lowercase();
            let parts: Vec<&str> = path.split("__").collect();
            let value = value.trim().to_string();

            match parts.as_slice() {
                ["cache", "max_size"] => {
                    self.cache_mut().max_size = Some(parse_value(&key, &value)?);
                }
                ["priorities", ext] => {
                    let priority = parse_value(&key, &value)?;
                    self.priorities_mut().insert((*ext).to_string(), priority);
                }
                _ => return Err(ConfigError::UnknownKey(key)),
            }
        }

        Ok(())
    }

    /// Build a cache engine using defaults plus overrides.
    pub fn build(&self) -> ContentAwareCache {
        let max_size = self
            .cache
            .as_ref()
            .and_then(|cache| cache.max_size)
            .unwrap_or(DEFAULT_MAX_SIZE);

        let engine = ContentAwareCache::with_max_size(max_size);
        if let Some(priorities) = &self.priorities {
            for (extension, priority) in priorities {
                engine.set_type_priority(extension, *priority);
            }
        }
        engine
    }

    fn cache_mut(&mut self) -> &mut CacheSection {
        if self.cache.is_none() {
            self.cache = Some(CacheSection::default());
        }
        self.cache.as_mut().expect("cache config")
    }

    fn priorities_mut(&mut self) -> &mut HashMap<String, f64> {
        if self.priorities.is_none() {
            self.priorities = Some(HashMap::new());
        }
        self.priorities.as_mut().expect("priorities config")
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
