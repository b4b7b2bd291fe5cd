//! Core module containing fundamental types for memtrace

pub mod types;

// Re-export commonly used types for convenience
pub use types::{Address, AllocationRecord, FreeRecord, RecordKind, TraceError, TraceResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
