//! libc bindings for module resolution and page protection

use crate::core::types::{Address, TraceError, TraceResult};
use std::ffi::{c_void, CStr, CString};
use std::slice;

/// Last `dlerror` message, if any
fn dl_error() -> String {
    // SAFETY: dlerror returns null or a thread-local C string
    unsafe {
        let message = libc::dlerror();
        if message.is_null() {
            "unknown error".to_string()
        } else {
            CStr::from_ptr(message).to_string_lossy().into_owned()
        }
    }
}

/// Resolves an already loaded shared object and pins it until process exit
pub fn dlopen_loaded(name: &str) -> TraceResult<Address> {
    let c_name = CString::new(name).map_err(|_| TraceError::ModuleNotFound(name.to_string()))?;

    let handle = unsafe {
        libc::dlopen(
            c_name.as_ptr(),
            libc::RTLD_LAZY | libc::RTLD_NOLOAD | libc::RTLD_NODELETE,
        )
    };
    if handle.is_null() {
        Err(TraceError::ModuleNotFound(format!("{} ({})", name, dl_error())))
    } else {
        Ok(Address::from(handle as *const u8))
    }
}

/// Safe wrapper for dlsym
///
/// # Safety
/// `handle` must come from [`dlopen_loaded`]
pub unsafe fn dlsym(handle: Address, symbol: &str) -> TraceResult<Address> {
    let not_found = || TraceError::export_not_found(handle.to_string(), symbol);
    let c_symbol = CString::new(symbol).map_err(|_| not_found())?;

    let address = libc::dlsym(handle.as_mut_ptr::<c_void>(), c_symbol.as_ptr());
    if address.is_null() {
        Err(not_found())
    } else {
        Ok(Address::from(address as *const u8))
    }
}

/// A shared object (or the main executable) mapped into the process
#[derive(Debug, Clone)]
pub struct LoadedObject {
    pub name: String,
    pub base: usize,
    pub headers: &'static [libc::Elf64_Phdr],
}

impl LoadedObject {
    /// True when `address` lies in one of the object's loadable segments
    pub fn contains(&self, address: usize) -> bool {
        self.segments(libc::PT_LOAD)
            .any(|(start, size)| address >= start && address < start + size)
    }

    /// Runtime address of the dynamic section
    pub fn dynamic(&self) -> Option<usize> {
        self.segments(libc::PT_DYNAMIC).next().map(|(start, _)| start)
    }

    /// Runtime ranges of the segments made read-only after relocation
    pub fn relro(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.segments(libc::PT_GNU_RELRO)
    }

    /// Turns a dynamic-section pointer into a runtime address
    ///
    /// The loader rewrites most objects' pointers in place; the vDSO and a
    /// few architectures leave them as offsets.
    pub fn relocate(&self, pointer: usize) -> usize {
        if pointer < self.base {
            self.base + pointer
        } else {
            pointer
        }
    }

    /// True for the dynamic linker, whose own allocations back TLS setup
    pub fn is_dynamic_linker(&self) -> bool {
        let file = self.name.rsplit('/').next().unwrap_or(&self.name);
        file.starts_with("ld-linux") || file.starts_with("ld64.so") || file.starts_with("ld.so")
    }

    fn segments(&self, kind: u32) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.headers
            .iter()
            .filter(move |header| header.p_type == kind)
            .map(|header| (self.base + header.p_vaddr as usize, header.p_memsz as usize))
    }
}

unsafe extern "C" fn collect_object(
    info: *mut libc::dl_phdr_info,
    _size: libc::size_t,
    data: *mut c_void,
) -> libc::c_int {
    let objects = &mut *(data as *mut Vec<LoadedObject>);
    let info = &*info;

    let name = if info.dlpi_name.is_null() {
        String::new()
    } else {
        CStr::from_ptr(info.dlpi_name).to_string_lossy().into_owned()
    };
    let headers = if info.dlpi_phdr.is_null() {
        &[][..]
    } else {
        slice::from_raw_parts(info.dlpi_phdr, info.dlpi_phnum as usize)
    };

    objects.push(LoadedObject {
        name,
        base: info.dlpi_addr as usize,
        headers,
    });
    0
}

/// Every object currently mapped into the process
pub fn loaded_objects() -> Vec<LoadedObject> {
    let mut objects: Vec<LoadedObject> = Vec::new();
    unsafe {
        libc::dl_iterate_phdr(
            Some(collect_object),
            &mut objects as *mut Vec<LoadedObject> as *mut c_void,
        );
    }
    objects
}

pub fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        size if size > 0 => size as usize,
        _ => 4096,
    }
}

/// Safe wrapper for mprotect over the pages spanning `[address, address + size)`
///
/// # Safety
/// The range must belong to mapped pages of the current process
pub unsafe fn protect(address: usize, size: usize, protection: libc::c_int) -> TraceResult<()> {
    let page = page_size();
    let start = address & !(page - 1);
    let end = (address + size + page - 1) & !(page - 1);

    if libc::mprotect(start as *mut c_void, end - start, protection) != 0 {
        Err(TraceError::ProtectionError(format!(
            "mprotect({:#x}, {:#x}) failed: {}",
            start,
            end - start,
            std::io::Error::last_os_error()
        )))
    } else {
        Ok(())
    }
}
