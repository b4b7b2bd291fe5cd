//! Kernel32.dll bindings for module resolution and page protection

use crate::core::types::{Address, TraceError, TraceResult};
use crate::windows::utils::string_to_wide;
use std::ffi::CString;
use std::ptr;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE, LPVOID};
use winapi::um::handleapi::CloseHandle;
use winapi::um::libloaderapi::{
    GetModuleHandleExW, GetProcAddress, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
    GET_MODULE_HANDLE_EX_FLAG_PIN, GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
};
use winapi::um::memoryapi::VirtualProtect;
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::winnt::HANDLE;

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle
pub unsafe fn close_handle(handle: HANDLE) -> TraceResult<()> {
    if handle.is_null() {
        return Ok(());
    }

    if CloseHandle(handle) == FALSE {
        Err(TraceError::last_os_error("CloseHandle"))
    } else {
        Ok(())
    }
}

/// Pseudo handle of the current process; never needs closing
pub fn current_process() -> HANDLE {
    unsafe { GetCurrentProcess() }
}

/// Resolves an already loaded module and pins it until process exit
pub fn module_handle_pinned(name: &str) -> TraceResult<HMODULE> {
    let wide = string_to_wide(name);
    let mut module: HMODULE = ptr::null_mut();

    let ok = unsafe {
        GetModuleHandleExW(GET_MODULE_HANDLE_EX_FLAG_PIN, wide.as_ptr(), &mut module)
    };
    if ok == FALSE || module.is_null() {
        Err(TraceError::ModuleNotFound(name.to_string()))
    } else {
        Ok(module)
    }
}

/// Module containing `address`, without touching its reference count
pub fn module_from_address(address: Address) -> TraceResult<HMODULE> {
    let mut module: HMODULE = ptr::null_mut();

    let ok = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            address.as_ptr::<u16>(),
            &mut module,
        )
    };
    if ok == FALSE || module.is_null() {
        Err(TraceError::last_os_error("GetModuleHandleExW"))
    } else {
        Ok(module)
    }
}

/// Safe wrapper for GetProcAddress
///
/// # Safety
/// `module` must be a loaded module handle
pub unsafe fn get_proc_address(module: HMODULE, export: &str) -> TraceResult<Address> {
    let name = CString::new(export)
        .map_err(|_| TraceError::export_not_found(format!("{:p}", module), export))?;

    let proc = GetProcAddress(module, name.as_ptr());
    if proc.is_null() {
        Err(TraceError::export_not_found(format!("{:p}", module), export))
    } else {
        Ok(Address::from(proc as *const u8))
    }
}

/// Safe wrapper for VirtualProtect; returns the previous protection
///
/// # Safety
/// The range must belong to committed pages of the current process
pub unsafe fn virtual_protect(
    address: Address,
    size: usize,
    protection: DWORD,
) -> TraceResult<DWORD> {
    let mut old: DWORD = 0;

    let ok = VirtualProtect(address.as_mut_ptr::<u8>() as LPVOID, size, protection, &mut old);
    if ok == FALSE {
        Err(TraceError::ProtectionError(format!(
            "VirtualProtect({}, {:#x}) failed: {}",
            address,
            size,
            std::io::Error::last_os_error()
        )))
    } else {
        Ok(old)
    }
}
