//! Named pipe transport

use super::transport::{Connector, Transport};
use crate::windows::types::Handle;
use std::ffi::CString;
use std::{io, ptr};
use tracing::debug;
use winapi::shared::minwindef::{DWORD, FALSE};
use winapi::um::fileapi::{CreateFileA, WriteFile, OPEN_EXISTING};
use winapi::um::handleapi::INVALID_HANDLE_VALUE;
use winapi::um::namedpipeapi::SetNamedPipeHandleState;
use winapi::um::winbase::{
    PIPE_NOWAIT, PIPE_READMODE_MESSAGE, SECURITY_IDENTIFICATION, SECURITY_SQOS_PRESENT,
};
use winapi::um::winnt::{GENERIC_READ, GENERIC_WRITE};

/// Prefix of every local named pipe path
pub const PIPE_PREFIX: &str = r"\\.\pipe\";

/// Connects to `\\.\pipe\<name>`
#[derive(Debug, Clone, Default)]
pub struct PipeConnector;

impl PipeConnector {
    pub fn new() -> Self {
        PipeConnector
    }

    /// Full pipe path for a channel name
    pub fn pipe_path(name: &str) -> String {
        format!("{}{}", PIPE_PREFIX, name)
    }
}

impl Connector for PipeConnector {
    fn connect(&self, name: &str) -> io::Result<Box<dyn Transport>> {
        let path = CString::new(Self::pipe_path(name))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let raw = unsafe {
            CreateFileA(
                path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                SECURITY_SQOS_PRESENT | SECURITY_IDENTIFICATION,
                ptr::null_mut(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        let handle = Handle::new(raw);

        // Message mode keeps records whole; no-wait mode keeps WriteFile from
        // stalling the traced thread when the collector falls behind.
        let mut mode: DWORD = PIPE_READMODE_MESSAGE | PIPE_NOWAIT;
        let ok = unsafe {
            SetNamedPipeHandleState(handle.raw(), &mut mode, ptr::null_mut(), ptr::null_mut())
        };
        if ok == FALSE {
            debug!(error = %io::Error::last_os_error(), "pipe stays in blocking byte mode");
        }

        Ok(Box::new(PipeTransport { handle }))
    }

    fn endpoint(&self, name: &str) -> String {
        Self::pipe_path(name)
    }
}

/// Client end of the collector pipe
pub struct PipeTransport {
    handle: Handle,
}

impl Transport for PipeTransport {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        let mut written: DWORD = 0;
        let ok = unsafe {
            WriteFile(
                self.handle.raw(),
                bytes.as_ptr() as *const _,
                bytes.len() as DWORD,
                &mut written,
                ptr::null_mut(),
            )
        };
        if ok == FALSE {
            Err(io::Error::last_os_error())
        } else {
            Ok(written as usize)
        }
    }
}
