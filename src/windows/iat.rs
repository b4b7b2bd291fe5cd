//! Import address table patching
//!
//! Every loaded module except the tracer's own gets each IAT entry that
//! holds the target's address rewritten to the hook. Matching by value also
//! catches imports the loader resolved through a forwarder
//! (`kernel32!HeapAlloc` ends up as `ntdll!RtlAllocateHeap`).

use crate::core::types::{Address, TraceError, TraceResult};
use crate::intercept::PatchPlatform;
use crate::windows::bindings::{kernel32, psapi};
use crate::windows::types::PageGuard;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;
use winapi::shared::minwindef::HMODULE;
use winapi::um::winnt::{
    IMAGE_DIRECTORY_ENTRY_IMPORT, IMAGE_DOS_HEADER, IMAGE_DOS_SIGNATURE, IMAGE_IMPORT_DESCRIPTOR,
    IMAGE_NT_HEADERS, IMAGE_NT_SIGNATURE, PAGE_READWRITE,
};

/// Patches import address tables of the current process
#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        WindowsPlatform
    }
}

impl PatchPlatform for WindowsPlatform {
    fn resolve_module(&self, name: &str) -> TraceResult<Address> {
        let module = kernel32::module_handle_pinned(name)?;
        Ok(Address::from(module as *const u8))
    }

    fn resolve_export(&self, module: Address, export: &str) -> TraceResult<Address> {
        // SAFETY: module came from resolve_module and is pinned
        unsafe { kernel32::get_proc_address(module.as_mut_ptr(), export) }
    }

    unsafe fn install_trampoline(
        &self,
        _module: Address,
        export: &str,
        target: Address,
        hook: Address,
    ) -> TraceResult<usize> {
        let own = kernel32::module_from_address(Address::new(own_module_marker as usize))?;
        let modules = psapi::enum_process_modules(kernel32::current_process())?;

        let mut patched = 0;
        let mut first_error = None;
        for module in modules.into_iter().filter(|m| *m != own) {
            for slot in import_slots(module) {
                if *slot.as_ptr::<usize>() != target.as_usize() {
                    continue;
                }
                match patch_slot(slot, hook) {
                    Ok(()) => patched += 1,
                    Err(e) => {
                        debug!(export, slot = %slot, error = %e, "import slot not patched");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if patched == 0 => Err(TraceError::patch_rejected(export, e.to_string())),
            _ => Ok(patched),
        }
    }
}

fn own_module_marker() {}

/// Addresses of every bound IAT entry of `module`
///
/// # Safety
/// `module` must be a loaded module of the current process
unsafe fn import_slots(module: HMODULE) -> Vec<Address> {
    let base = Address::from(module as *const u8);
    let mut slots = Vec::new();

    let dos = &*base.as_ptr::<IMAGE_DOS_HEADER>();
    if dos.e_magic != IMAGE_DOS_SIGNATURE {
        return slots;
    }
    let nt = &*base.add(dos.e_lfanew as usize).as_ptr::<IMAGE_NT_HEADERS>();
    if nt.Signature != IMAGE_NT_SIGNATURE {
        return slots;
    }

    let directory = nt.OptionalHeader.DataDirectory[IMAGE_DIRECTORY_ENTRY_IMPORT as usize];
    if directory.VirtualAddress == 0 || directory.Size == 0 {
        return slots;
    }

    let mut descriptor = base
        .add(directory.VirtualAddress as usize)
        .as_ptr::<IMAGE_IMPORT_DESCRIPTOR>();
    while (*descriptor).Name != 0 {
        let mut thunk = base.add((*descriptor).FirstThunk as usize).as_ptr::<usize>();
        while *thunk != 0 {
            slots.push(Address::from(thunk));
            thunk = thunk.add(1);
        }
        descriptor = descriptor.add(1);
    }

    slots
}

/// Rewrites one IAT entry
///
/// # Safety
/// `slot` must be an IAT entry of a loaded module
unsafe fn patch_slot(slot: Address, hook: Address) -> TraceResult<()> {
    let _guard = PageGuard::new(slot, mem::size_of::<usize>(), PAGE_READWRITE)?;
    // Other threads may be calling through the slot right now
    (*slot.as_ptr::<AtomicUsize>()).store(hook.as_usize(), Ordering::SeqCst);
    Ok(())
}
