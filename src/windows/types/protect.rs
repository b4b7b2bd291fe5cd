//! Temporary page protection changes

use crate::core::types::{Address, TraceResult};
use crate::windows::bindings::kernel32;
use tracing::debug;
use winapi::shared::minwindef::DWORD;

/// Makes a range writable and restores the previous protection on drop
pub struct PageGuard {
    address: Address,
    size: usize,
    previous: DWORD,
}

impl PageGuard {
    /// Applies `protection` to `[address, address + size)`
    ///
    /// # Safety
    /// The range must belong to committed pages of the current process, and
    /// no other code may rely on the pages' protection while the guard lives.
    pub unsafe fn new(address: Address, size: usize, protection: DWORD) -> TraceResult<Self> {
        let previous = kernel32::virtual_protect(address, size, protection)?;
        Ok(PageGuard {
            address,
            size,
            previous,
        })
    }

    pub fn previous(&self) -> DWORD {
        self.previous
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        // SAFETY: the range was valid when the guard was created and the
        // guarded module is pinned.
        let restored =
            unsafe { kernel32::virtual_protect(self.address, self.size, self.previous) };
        if let Err(e) = restored {
            debug!(error = %e, address = %self.address, "failed to restore page protection");
        }
    }
}
