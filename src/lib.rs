//! memtrace: in-process heap allocation tracer
//!
//! Redirects the process's heap allocate/free entry points, serializes one
//! compact record per operation and streams the records to an external
//! collector. Without a collector the tracer stays inert.

#[cfg(not(any(windows, all(target_os = "linux", target_pointer_width = "64"))))]
compile_error!("memtrace supports Windows and 64-bit Linux only");

pub mod channel;
pub mod collector;
pub mod config;
pub mod core;
pub mod hooks;
pub mod intercept;
pub mod lifecycle;
pub mod logging;
#[cfg(target_os = "linux")]
pub mod unix;
pub mod wire;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use core::types::{Address, AllocationRecord, FreeRecord, RecordKind, TraceError, TraceResult};

pub use channel::{ChannelManager, ChannelStats, Connector, Transport};
pub use config::TracerConfig;
pub use intercept::{EngineState, HookTarget, InterceptionEngine, PatchPlatform};
pub use lifecycle::{LifecycleEvent, Tracer, TracerBuilder};
pub use wire::{decode, serialize, DecodedRecord, MessageReader, WireMessage};
