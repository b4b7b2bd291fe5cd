//! NTDLL.dll heap entry points
//!
//! The tracer's own imports are never redirected, so these declarations
//! always reach the real heap manager.

use winapi::shared::basetsd::SIZE_T;
use winapi::shared::minwindef::ULONG;
use winapi::shared::ntdef::{BOOLEAN, PVOID};

/// Signature of `RtlAllocateHeap`
pub type RtlAllocateHeapFn =
    unsafe extern "system" fn(heap: PVOID, flags: ULONG, size: SIZE_T) -> PVOID;

/// Signature of `RtlFreeHeap`
pub type RtlFreeHeapFn =
    unsafe extern "system" fn(heap: PVOID, flags: ULONG, base: PVOID) -> BOOLEAN;

#[link(name = "ntdll")]
extern "system" {
    pub fn RtlAllocateHeap(heap: PVOID, flags: ULONG, size: SIZE_T) -> PVOID;
    pub fn RtlFreeHeap(heap: PVOID, flags: ULONG, base: PVOID) -> BOOLEAN;
}

#[cfg(test)]
mod tests {
    use super::*;
    use winapi::um::heapapi::GetProcessHeap;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_direct_heap_round_trip() {
        unsafe {
            let heap = GetProcessHeap();
            let block = RtlAllocateHeap(heap, 0, 64);
            assert!(!block.is_null());
            assert_ne!(RtlFreeHeap(heap, 0, block), 0);
        }
    }
}
