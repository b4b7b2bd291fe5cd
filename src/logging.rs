//! Logging setup
//!
//! Inside a traced process stdout may not exist, so the tracer logs to a
//! file. Nothing is logged from the hook path.

use crate::config::{ConfigError, LoggingConfig};
use crate::core::types::{TraceError, TraceResult};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber writing to `config.file`
///
/// Returns false when logging is disabled or another subscriber is already
/// installed.
pub fn init(config: &LoggingConfig) -> TraceResult<bool> {
    if !config.enabled {
        return Ok(false);
    }

    let filter = build_filter(&config.level)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_ids(true)
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Filter for the configured level
pub fn build_filter(level: &str) -> TraceResult<EnvFilter> {
    EnvFilter::try_new(level).map_err(|e| {
        TraceError::Config(ConfigError::Invalid(format!(
            "Invalid log level {}: {}",
            level, e
        )))
    })
}
