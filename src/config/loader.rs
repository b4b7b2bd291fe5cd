//! Configuration loader for memtrace
//!
//! Handles loading configuration from TOML files and merging with defaults.
//! The tracer itself runs on [`TracerConfig::default`] when attached by the
//! loader; files are read only when an embedder or the collector asks.

use super::defaults::default_config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File read by [`load_config`]
pub const DEFAULT_CONFIG_FILE: &str = "memtrace.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracerConfig {
    #[serde(default = "default_channel")]
    pub channel: ChannelConfig,

    #[serde(default = "default_hooks")]
    pub hooks: HookConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Collector channel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Well-known channel name, without platform prefix or suffix
    #[serde(default = "default_channel_name")]
    pub name: String,
    /// ASCII handshake sent right after connecting
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

/// Interception targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    #[serde(default = "default_module")]
    pub module: String,
    #[serde(default = "default_allocate_export")]
    pub allocate_export: String,
    #[serde(default = "default_free_export")]
    pub free_export: String,
    /// Skip hook installation when no collector is listening
    #[serde(default = "default_require_collector")]
    pub require_collector: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<TracerConfig, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: TracerConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration or returns defaults if file doesn't exist
    pub fn load_or_default(&self) -> TracerConfig {
        self.load().unwrap_or_default()
    }

    /// Saves configuration to file
    pub fn save(&self, config: &TracerConfig) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads `memtrace.toml` from the working directory
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config() -> Result<TracerConfig, ConfigError> {
    match ConfigLoader::new(DEFAULT_CONFIG_FILE).load() {
        Err(ConfigError::FileNotFound(_)) => Ok(TracerConfig::default()),
        other => other,
    }
}

// Default functions for serde
fn default_channel() -> ChannelConfig {
    let defaults = default_config();
    ChannelConfig {
        name: defaults.channel.name,
        greeting: defaults.channel.greeting,
    }
}

fn default_hooks() -> HookConfig {
    let defaults = default_config();
    HookConfig {
        module: defaults.hooks.module,
        allocate_export: defaults.hooks.allocate_export,
        free_export: defaults.hooks.free_export,
        require_collector: defaults.hooks.require_collector,
    }
}

fn default_logging() -> LoggingConfig {
    let defaults = default_config();
    LoggingConfig {
        enabled: defaults.logging.enabled,
        level: defaults.logging.level,
        file: defaults.logging.file,
    }
}

// Individual field defaults
fn default_channel_name() -> String {
    default_config().channel.name
}

fn default_greeting() -> String {
    default_config().channel.greeting
}

fn default_module() -> String {
    default_config().hooks.module
}

fn default_allocate_export() -> String {
    default_config().hooks.allocate_export
}

fn default_free_export() -> String {
    default_config().hooks.free_export
}

fn default_require_collector() -> bool {
    default_config().hooks.require_collector
}

fn default_log_enabled() -> bool {
    default_config().logging.enabled
}

fn default_log_level() -> String {
    default_config().logging.level
}

fn default_log_file() -> String {
    default_config().logging.file
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            channel: default_channel(),
            hooks: default_hooks(),
            logging: default_logging(),
        }
    }
}
