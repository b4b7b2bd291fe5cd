//! Global offset table patching
//!
//! Every loaded object except the tracer's own and the dynamic linker gets
//! its `JUMP_SLOT` and `GLOB_DAT` entries for the export rewritten to the
//! hook. Entries are matched by symbol name, so lazily bound slots that
//! still point at a PLT stub are caught too.

use super::bindings::{self, LoadedObject};
use super::elf::{self, DynamicTables};
use crate::core::types::{Address, TraceError, TraceResult};
use crate::intercept::PatchPlatform;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Patches global offset tables of the current process
#[derive(Debug, Default)]
pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        UnixPlatform
    }
}

/// One GOT entry referencing an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotSlot {
    pub object: String,
    pub address: Address,
    /// Inside a segment that is read-only after relocation
    pub relro: bool,
}

impl PatchPlatform for UnixPlatform {
    fn resolve_module(&self, name: &str) -> TraceResult<Address> {
        bindings::dlopen_loaded(name)
    }

    fn resolve_export(&self, module: Address, export: &str) -> TraceResult<Address> {
        // SAFETY: module came from resolve_module and is pinned
        unsafe { bindings::dlsym(module, export) }
    }

    unsafe fn install_trampoline(
        &self,
        _module: Address,
        export: &str,
        _target: Address,
        hook: Address,
    ) -> TraceResult<usize> {
        let mut patched = 0;
        let mut first_error = None;

        for slot in got_slots(export) {
            match patch_slot(&slot, hook) {
                Ok(()) => patched += 1,
                Err(e) => {
                    debug!(
                        export,
                        object = %slot.object,
                        slot = %slot.address,
                        error = %e,
                        "GOT slot not patched"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if patched == 0 => Err(TraceError::patch_rejected(export, e.to_string())),
            _ => Ok(patched),
        }
    }
}

fn own_object_marker() {}

/// Every GOT entry for `export` outside the tracer's own object
pub fn got_slots(export: &str) -> Vec<GotSlot> {
    let own = own_object_marker as usize;
    let mut slots = Vec::new();

    for object in bindings::loaded_objects() {
        if object.contains(own) || object.is_dynamic_linker() {
            continue;
        }
        // SAFETY: objects stay loaded while their headers are walked
        unsafe { collect_slots(&object, export, &mut slots) };
    }

    slots
}

unsafe fn collect_slots(object: &LoadedObject, export: &str, slots: &mut Vec<GotSlot>) {
    let Some(tables) = DynamicTables::read(object) else {
        return;
    };

    for rela in tables.got_relocations() {
        if tables.symbol_name(rela).to_bytes() != export.as_bytes() {
            continue;
        }
        let address = object.base + elf::entry_offset(rela);
        let relro = object
            .relro()
            .any(|(start, size)| address >= start && address < start + size);
        slots.push(GotSlot {
            object: object.name.clone(),
            address: Address::new(address),
            relro,
        });
    }
}

/// Rewrites one GOT entry, lifting RELRO protection around the write
unsafe fn patch_slot(slot: &GotSlot, hook: Address) -> TraceResult<()> {
    let width = mem::size_of::<usize>();
    if slot.relro {
        bindings::protect(
            slot.address.as_usize(),
            width,
            libc::PROT_READ | libc::PROT_WRITE,
        )?;
    }

    // Other threads may be calling through the slot right now
    (*slot.address.as_ptr::<AtomicUsize>()).store(hook.as_usize(), Ordering::SeqCst);

    if slot.relro {
        bindings::protect(slot.address.as_usize(), width, libc::PROT_READ)?;
    }
    Ok(())
}
