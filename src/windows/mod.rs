//! Windows backend
//!
//! Safe wrappers around the Windows API calls the tracer needs, and the
//! import address table patcher built on them. All unsafe FFI calls are
//! contained within this module.

pub mod bindings;
pub mod iat;
pub mod types;
pub mod utils;

pub use iat::WindowsPlatform;
pub use types::{Handle, PageGuard};

// Re-export key bindings
pub use bindings::{kernel32, ntdll, psapi};
