//! Configuration validator for memtrace
//!
//! Validates configuration values before the tracer acts on them.

use super::loader::{ChannelConfig, ConfigError, HookConfig, LoggingConfig, TracerConfig};
use crate::hooks::{native_targets_match, NATIVE_ALLOCATE_EXPORT, NATIVE_FREE_EXPORT, NATIVE_MODULE};

/// Longest channel name accepted (named pipe paths cap at 256 characters)
pub const MAX_CHANNEL_NAME_LEN: usize = 200;

/// Longest greeting accepted
pub const MAX_GREETING_LEN: usize = 256;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &TracerConfig) -> Result<(), ConfigError> {
        Self::validate_channel(&config.channel)?;
        Self::validate_hooks(&config.hooks)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates channel configuration
    fn validate_channel(channel: &ChannelConfig) -> Result<(), ConfigError> {
        if channel.name.is_empty() {
            return Err(ConfigError::Invalid(
                "Channel name cannot be empty".to_string(),
            ));
        }

        if channel.name.len() > MAX_CHANNEL_NAME_LEN {
            return Err(ConfigError::Invalid(format!(
                "Channel name cannot exceed {} characters",
                MAX_CHANNEL_NAME_LEN
            )));
        }

        // The name is joined onto a platform prefix; separators would escape it
        if channel.name.contains(['/', '\\', '\0']) {
            return Err(ConfigError::Invalid(
                "Channel name cannot contain path separators".to_string(),
            ));
        }

        if !channel.greeting.is_ascii() || channel.greeting.len() > MAX_GREETING_LEN {
            return Err(ConfigError::Invalid(format!(
                "Greeting must be ASCII and at most {} bytes",
                MAX_GREETING_LEN
            )));
        }

        Ok(())
    }

    /// Validates interception targets
    fn validate_hooks(hooks: &HookConfig) -> Result<(), ConfigError> {
        if hooks.module.is_empty() {
            return Err(ConfigError::Invalid(
                "Hook module cannot be empty".to_string(),
            ));
        }

        if hooks.allocate_export.is_empty() || hooks.free_export.is_empty() {
            return Err(ConfigError::Invalid(
                "Hooked export names cannot be empty".to_string(),
            ));
        }

        if hooks.allocate_export == hooks.free_export {
            return Err(ConfigError::Invalid(format!(
                "Allocate and free hooks both target {}",
                hooks.free_export
            )));
        }

        if !native_targets_match(hooks) {
            return Err(ConfigError::Invalid(format!(
                "Only {} and {} in {} can be traced, got {} and {} in {}",
                NATIVE_ALLOCATE_EXPORT,
                NATIVE_FREE_EXPORT,
                NATIVE_MODULE,
                hooks.allocate_export,
                hooks.free_export,
                hooks.module
            )));
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        if logging.enabled && logging.file.is_empty() {
            return Err(ConfigError::Invalid(
                "Log file path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &TracerConfig) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
