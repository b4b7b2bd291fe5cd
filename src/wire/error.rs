//! Wire protocol error type

use crate::core::types::RecordKind;
use thiserror::Error;

/// Errors produced while decoding or validating wire messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Truncated message: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Invalid message length: {0}")]
    InvalidLength(usize),

    #[error("Unknown message kind: {0}")]
    UnknownKind(u16),

    #[error("Length mismatch for {kind} message: declared {declared}, schema requires {expected}")]
    LengthMismatch {
        kind: RecordKind,
        declared: usize,
        expected: usize,
    },

    #[error("Invalid schema for {kind}: {reason}")]
    InvalidSchema { kind: RecordKind, reason: String },
}

/// Result type alias for wire operations
pub type WireResult<T> = Result<T, WireError>;
