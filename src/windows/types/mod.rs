//! Windows-specific type wrappers

pub mod handle;
pub mod protect;

pub use handle::Handle;
pub use protect::PageGuard;
