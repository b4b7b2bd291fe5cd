//! Owned HANDLE with automatic cleanup

use crate::windows::bindings::kernel32;
use std::{fmt, ptr};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::winnt::HANDLE;

/// Owned Windows HANDLE, closed on drop
pub struct Handle {
    handle: HANDLE,
}

impl Handle {
    /// Takes ownership of a raw handle
    pub fn new(handle: HANDLE) -> Self {
        Handle { handle }
    }

    pub fn null() -> Self {
        Handle {
            handle: ptr::null_mut(),
        }
    }

    /// False for both null and `INVALID_HANDLE_VALUE`
    pub fn is_valid(&self) -> bool {
        !self.handle.is_null() && self.handle != INVALID_HANDLE_VALUE
    }

    pub fn raw(&self) -> HANDLE {
        self.handle
    }

    /// Releases ownership without closing
    pub fn take(mut self) -> HANDLE {
        let handle = self.handle;
        self.handle = ptr::null_mut();
        handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.is_valid() {
            // Ignore errors on cleanup
            unsafe {
                let _ = kernel32::close_handle(self.handle);
            }
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", self.handle)
    }
}

// Send + Sync are safe because HANDLEs are process-local
unsafe impl Send for Handle {}
unsafe impl Sync for Handle {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle_is_invalid() {
        let handle = Handle::null();
        assert!(!handle.is_valid());
        assert_eq!(handle.raw(), ptr::null_mut());
    }

    #[test]
    fn test_invalid_handle_value_is_not_closed() {
        let handle = Handle::new(INVALID_HANDLE_VALUE);
        assert!(!handle.is_valid());
        drop(handle);
    }

    #[test]
    fn test_handle_take() {
        let handle = Handle::new(ptr::null_mut());
        let raw = handle.take();
        assert_eq!(raw, ptr::null_mut());
    }
}
