//! `RtlAllocateHeap` / `RtlFreeHeap` trampolines

use super::bound;
use crate::core::types::Address;
use crate::windows::ntdll::{self, RtlAllocateHeapFn, RtlFreeHeapFn};
use std::mem;
use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::ULONG;
use winapi::shared::ntdef::{BOOLEAN, PVOID};

pub(super) extern "system" fn allocate_hook(heap: PVOID, flags: ULONG, size: SIZE_T) -> PVOID {
    let call = |original: Option<Address>| -> Address {
        // SAFETY: the slot only ever holds the resolved RtlAllocateHeap, and
        // the direct import is never redirected.
        let block = unsafe {
            match original {
                Some(original) => {
                    let original: RtlAllocateHeapFn = mem::transmute(original.as_usize());
                    original(heap, flags, size)
                }
                None => ntdll::RtlAllocateHeap(heap, flags, size),
            }
        };
        Address::from(block as *const u8)
    };

    match bound() {
        Some(tracer) => tracer.traced_allocate(size, call).as_mut_ptr(),
        None => call(None).as_mut_ptr(),
    }
}

pub(super) extern "system" fn free_hook(heap: PVOID, flags: ULONG, base: PVOID) -> BOOLEAN {
    let call = |original: Option<Address>| -> BOOLEAN {
        // SAFETY: as above, for RtlFreeHeap
        unsafe {
            match original {
                Some(original) => {
                    let original: RtlFreeHeapFn = mem::transmute(original.as_usize());
                    original(heap, flags, base)
                }
                None => ntdll::RtlFreeHeap(heap, flags, base),
            }
        }
    };

    match bound() {
        Some(tracer) => tracer.traced_free(Address::from(base as *const u8), call),
        None => call(None),
    }
}
