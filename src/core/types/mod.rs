//! Core type definitions for memtrace
//!
//! Addresses, telemetry records and the control-path error type.

mod address;
mod error;
mod record;

// Re-export all public types
pub use address::Address;
pub use error::{TraceError, TraceResult};
pub use record::{AllocationRecord, FreeRecord, RecordKind};
