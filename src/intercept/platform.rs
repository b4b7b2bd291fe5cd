//! Platform capability used by the interception engine

use crate::core::types::{Address, TraceResult};

/// OS operations needed to redirect an exported function
///
/// Implementations live next to the OS bindings they wrap; tests inject a
/// fake that records what would have been patched.
pub trait PatchPlatform: Send + Sync {
    /// Resolves a loaded module by name and pins it for the process lifetime
    fn resolve_module(&self, name: &str) -> TraceResult<Address>;

    /// Resolves the entry point of an export of a resolved module
    fn resolve_export(&self, module: Address, export: &str) -> TraceResult<Address>;

    /// Redirects every call to `target` through `hook`
    ///
    /// Returns the number of call sites rewritten. The tracer's own module is
    /// never rewritten, so it can keep calling `target` directly.
    ///
    /// # Safety
    /// `hook` must be a function with the same signature and calling
    /// convention as `target`, and must stay valid for the process lifetime.
    unsafe fn install_trampoline(
        &self,
        module: Address,
        export: &str,
        target: Address,
        hook: Address,
    ) -> TraceResult<usize>;
}

/// The patching backend for the compilation target
#[cfg(windows)]
pub fn native_platform() -> Box<dyn PatchPlatform> {
    Box::new(crate::windows::WindowsPlatform::new())
}

/// The patching backend for the compilation target
#[cfg(target_os = "linux")]
pub fn native_platform() -> Box<dyn PatchPlatform> {
    Box::new(crate::unix::UnixPlatform::new())
}
