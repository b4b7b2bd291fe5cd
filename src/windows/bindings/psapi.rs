//! PSAPI.dll bindings for module enumeration

use crate::core::types::{TraceError, TraceResult};
use std::mem;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE};
use winapi::um::psapi::EnumProcessModules;
use winapi::um::winnt::HANDLE;

/// Safe wrapper for EnumProcessModules
///
/// Grows the buffer until every loaded module fits.
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn enum_process_modules(handle: HANDLE) -> TraceResult<Vec<HMODULE>> {
    let mut modules: Vec<HMODULE> = vec![std::ptr::null_mut(); 256];

    loop {
        let mut bytes_needed: DWORD = 0;
        let result = EnumProcessModules(
            handle,
            modules.as_mut_ptr(),
            (modules.len() * mem::size_of::<HMODULE>()) as DWORD,
            &mut bytes_needed,
        );

        if result == FALSE {
            return Err(TraceError::last_os_error("EnumProcessModules"));
        }

        let count = bytes_needed as usize / mem::size_of::<HMODULE>();
        if count <= modules.len() {
            modules.truncate(count);
            return Ok(modules);
        }
        modules.resize(count, std::ptr::null_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::bindings::kernel32;

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_enum_current_process_modules() {
        let modules = unsafe { enum_process_modules(kernel32::current_process()) }.unwrap();
        assert!(!modules.is_empty());

        let ntdll = kernel32::module_handle_pinned("ntdll.dll").unwrap();
        assert!(modules.contains(&ntdll));
    }
}
