//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub index: IndexSettings,

    #[serde(default)]
    pub skiplist: SkiplistSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings shared by all indexes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexSettings {
    /// Keys reserved up front by new hash indexes
    #[serde(default)]
    pub hash_initial_capacity: usize,
}

/// Skiplist index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SkiplistSettings {
    /// Node height cap; the skiplist clamps it to `1..=MAX_LEVELS`
    #[serde(default = "default_max_level")]
    pub max_level: usize,

    /// Seed for level generation; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_level() -> usize {
    32
}

impl Default for SkiplistSettings {
    fn default() -> Self {
        Self {
            max_level: default_max_level(),
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("docindex").join("config.toml")),
            Some(PathBuf::from("./docindex.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Index overrides
        if let Some(capacity) = lookup("DOCINDEX_HASH_CAPACITY") {
            if let Ok(c) = capacity.parse() {
                self.index.hash_initial_capacity = c;
            }
        }

        // Skiplist overrides
        if let Some(max_level) = lookup("DOCINDEX_MAX_LEVEL") {
            if let Ok(l) = max_level.parse() {
                self.skiplist.max_level = l;
            }
        }
        if let Some(seed) = lookup("DOCINDEX_SEED") {
            if let Ok(s) = seed.parse() {
                self.skiplist.seed = Some(s);
            }
        }

        // Logging overrides
        if let Some(level) = lookup("DOCINDEX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("DOCINDEX_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# docindex Configuration
#
# Environment variables override these settings:
# - DOCINDEX_HASH_CAPACITY
# - DOCINDEX_MAX_LEVEL
# - DOCINDEX_SEED
# - DOCINDEX_LOG_LEVEL
# - DOCINDEX_LOG_FORMAT

[index]
# Keys reserved up front by new hash indexes
hash_initial_capacity = 0

[skiplist]
# Maximum node height (1 to 64)
max_level = 32

# Fixed seed for reproducible node heights
# seed = 42

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
