//! Trace hooks
//!
//! The functions call sites are redirected to. Each one calls the preserved
//! original first, then serializes a record into a stack buffer and hands it
//! to the channel. Nothing between the original call and the send allocates
//! or logs: the hook runs inside every heap operation of the process,
//! including the ones made by the channel itself.

mod guard;
#[cfg(target_os = "linux")]
mod unix;
#[cfg(windows)]
mod windows;

pub use guard::ReentrancyGuard;

use crate::config::HookConfig;
use crate::core::types::{Address, AllocationRecord, FreeRecord};
use crate::intercept::HookTarget;
use crate::lifecycle::Tracer;
use crate::wire::{serialize, WireMessage, WireRecord};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

static BOUND: AtomicPtr<Tracer> = AtomicPtr::new(ptr::null_mut());

/// Makes `tracer` the one the native trampolines report to
pub fn bind(tracer: &'static Tracer) {
    BOUND.store(tracer as *const Tracer as *mut Tracer, Ordering::Release);
}

/// The tracer the native trampolines report to, if any
#[inline]
pub fn bound() -> Option<&'static Tracer> {
    // SAFETY: only 'static references are ever stored
    unsafe { BOUND.load(Ordering::Acquire).as_ref() }
}

/// One export to redirect and the trampoline that replaces it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    pub target: HookTarget,
    pub export: String,
    pub hook: Address,
}

impl HookSpec {
    pub fn new(target: HookTarget, export: impl Into<String>, hook: Address) -> Self {
        HookSpec {
            target,
            export: export.into(),
            hook,
        }
    }
}

/// Module whose exports the native trampolines stand in for
#[cfg(windows)]
pub const NATIVE_MODULE: &str = "ntdll.dll";
#[cfg(windows)]
pub const NATIVE_ALLOCATE_EXPORT: &str = "RtlAllocateHeap";
#[cfg(windows)]
pub const NATIVE_FREE_EXPORT: &str = "RtlFreeHeap";

/// Module whose exports the native trampolines stand in for
#[cfg(target_os = "linux")]
pub const NATIVE_MODULE: &str = "libc.so.6";
#[cfg(target_os = "linux")]
pub const NATIVE_ALLOCATE_EXPORT: &str = "malloc";
#[cfg(target_os = "linux")]
pub const NATIVE_FREE_EXPORT: &str = "free";

/// The configured targets are the ones the native trampolines implement
///
/// The trampolines carry the exact signatures of these exports and fall
/// back to them when their slot is empty, so any other target would be
/// called with the wrong arguments.
pub fn native_targets_match(config: &HookConfig) -> bool {
    config.module.eq_ignore_ascii_case(NATIVE_MODULE)
        && config.allocate_export == NATIVE_ALLOCATE_EXPORT
        && config.free_export == NATIVE_FREE_EXPORT
}

/// The native trampolines, paired with the exports they replace
#[cfg(windows)]
pub fn native_hook_specs() -> Vec<HookSpec> {
    vec![
        HookSpec::new(
            HookTarget::Allocate,
            NATIVE_ALLOCATE_EXPORT,
            Address::new(windows::allocate_hook as usize),
        ),
        HookSpec::new(
            HookTarget::Free,
            NATIVE_FREE_EXPORT,
            Address::new(windows::free_hook as usize),
        ),
    ]
}

/// The native trampolines, paired with the exports they replace
#[cfg(target_os = "linux")]
pub fn native_hook_specs() -> Vec<HookSpec> {
    vec![
        HookSpec::new(
            HookTarget::Allocate,
            NATIVE_ALLOCATE_EXPORT,
            Address::new(unix::allocate_hook as usize),
        ),
        HookSpec::new(
            HookTarget::Free,
            NATIVE_FREE_EXPORT,
            Address::new(unix::free_hook as usize),
        ),
    ]
}

/// Serializes `record` on the stack and sends it; the outcome is ignored
#[inline]
fn emit<R: WireRecord>(tracer: &Tracer, record: &R) {
    let mut message = WireMessage::new();
    serialize(record, &mut message);
    tracer.channel().send(message.as_bytes());
}

impl Tracer {
    /// Runs an intercepted allocation and reports it
    ///
    /// `call` receives the preserved original (`None` when the slot is
    /// empty, in which case it must fall back to the real operation) and
    /// returns the allocated block. Passes through without a record when the
    /// slot is empty or when called from inside another hook on this thread.
    #[inline]
    pub fn traced_allocate<F>(&self, size: usize, call: F) -> Address
    where
        F: FnOnce(Option<Address>) -> Address,
    {
        let original = self.originals().get(HookTarget::Allocate);
        let block = call(original);

        if original.is_some() {
            if let Some(_guard) = ReentrancyGuard::enter() {
                emit(self, &AllocationRecord::new(size, block));
            }
        }
        block
    }

    /// Runs an intercepted free and reports it
    ///
    /// Same contract as [`Tracer::traced_allocate`]; the result of the
    /// original is returned unchanged.
    #[inline]
    pub fn traced_free<F, T>(&self, address: Address, call: F) -> T
    where
        F: FnOnce(Option<Address>) -> T,
    {
        let original = self.originals().get(HookTarget::Free);
        let result = call(original);

        if original.is_some() {
            if let Some(_guard) = ReentrancyGuard::enter() {
                emit(self, &FreeRecord::new(address));
            }
        }
        result
    }
}
