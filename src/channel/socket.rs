//! Unix domain socket transport

use super::transport::{Connector, Transport};
use std::io;
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

/// Directory holding collector sockets
pub const SOCKET_DIR: &str = "/tmp";

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: libc::c_int = libc::MSG_NOSIGNAL | libc::MSG_DONTWAIT;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: libc::c_int = libc::MSG_DONTWAIT;

/// Connects to `<dir>/<name>.sock`
#[derive(Debug, Clone)]
pub struct SocketConnector {
    dir: PathBuf,
}

impl SocketConnector {
    /// Connector for the default socket directory
    pub fn new() -> Self {
        SocketConnector::in_dir(SOCKET_DIR)
    }

    /// Connector for sockets under `dir`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        SocketConnector {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Full socket path for a channel name
    pub fn socket_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.sock", name))
    }
}

impl Default for SocketConnector {
    fn default() -> Self {
        SocketConnector::new()
    }
}

impl Connector for SocketConnector {
    fn connect(&self, name: &str) -> io::Result<Box<dyn Transport>> {
        let stream = UnixStream::connect(self.socket_path(name))?;
        stream.set_nonblocking(true)?;
        Ok(Box::new(SocketTransport { stream }))
    }

    fn endpoint(&self, name: &str) -> String {
        self.socket_path(name).display().to_string()
    }
}

/// Non-blocking stream socket
#[derive(Debug)]
pub struct SocketTransport {
    stream: UnixStream,
}

impl Transport for SocketTransport {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        // send(2) rather than write(2): a collector that went away must not
        // raise SIGPIPE in the traced program.
        let sent = unsafe {
            libc::send(
                self.stream.as_raw_fd(),
                bytes.as_ptr() as *const libc::c_void,
                bytes.len(),
                SEND_FLAGS,
            )
        };
        if sent < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(sent as usize)
        }
    }
}
