//! `malloc` / `free` trampolines

use super::bound;
use crate::core::types::Address;
use libc::{c_void, size_t};
use std::mem;

type MallocFn = unsafe extern "C" fn(size: size_t) -> *mut c_void;
type FreeFn = unsafe extern "C" fn(ptr: *mut c_void);

pub(super) extern "C" fn allocate_hook(size: size_t) -> *mut c_void {
    let call = |original: Option<Address>| -> Address {
        // SAFETY: the slot only ever holds the resolved malloc, and the
        // tracer's own GOT is never redirected.
        let block = unsafe {
            match original {
                Some(original) => {
                    let original: MallocFn = mem::transmute(original.as_usize());
                    original(size)
                }
                None => libc::malloc(size),
            }
        };
        Address::from(block as *const u8)
    };

    match bound() {
        Some(tracer) => tracer.traced_allocate(size, call).as_mut_ptr(),
        None => call(None).as_mut_ptr(),
    }
}

pub(super) extern "C" fn free_hook(ptr: *mut c_void) {
    let call = |original: Option<Address>| {
        // SAFETY: as above, for free
        unsafe {
            match original {
                Some(original) => {
                    let original: FreeFn = mem::transmute(original.as_usize());
                    original(ptr)
                }
                None => libc::free(ptr),
            }
        }
    };

    match bound() {
        Some(tracer) => tracer.traced_free(Address::from(ptr as *const u8), call),
        None => call(None),
    }
}
