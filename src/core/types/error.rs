//! Error types for the tracer control path

use crate::config::ConfigError;
use std::io;
use thiserror::Error;

/// Main error type for hook installation and channel setup
///
/// Nothing here ever reaches the traced program: the lifecycle controller
/// turns every error into a log line and an inert tracer.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Export {export} not found in {module}")]
    ExportNotFound { module: String, export: String },

    #[error("Failed to patch {export}: {reason}")]
    PatchRejected { export: String, reason: String },

    #[error("No import slots reference {0}")]
    NoImportSlots(String),

    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    #[error("Collector unavailable at {endpoint}: {reason}")]
    ChannelUnavailable { endpoint: String, reason: String },

    #[error("Memory protection error: {0}")]
    ProtectionError(String),

    #[error("OS API error: {0}")]
    OsApi(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type alias for tracer operations
pub type TraceResult<T> = Result<T, TraceError>;

impl TraceError {
    /// Creates an OS API error from the calling thread's last OS error
    pub fn last_os_error(context: &str) -> Self {
        TraceError::OsApi(format!("{}: {}", context, io::Error::last_os_error()))
    }

    /// Creates an export-not-found error
    pub fn export_not_found(module: impl Into<String>, export: impl Into<String>) -> Self {
        TraceError::ExportNotFound {
            module: module.into(),
            export: export.into(),
        }
    }

    /// Creates a patch rejected error
    pub fn patch_rejected(export: impl Into<String>, reason: impl Into<String>) -> Self {
        TraceError::PatchRejected {
            export: export.into(),
            reason: reason.into(),
        }
    }

    /// Creates a channel unavailable error
    pub fn channel_unavailable(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        TraceError::ChannelUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}
