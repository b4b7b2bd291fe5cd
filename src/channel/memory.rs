//! In-process loopback channel
//!
//! Captures the byte stream in a pre-sized buffer instead of sending it to
//! another process. Writes never grow the buffer, so capturing does not
//! allocate on the traced path; once full, writes are short and the channel
//! manager counts the record as dropped.

use super::transport::{Connector, Transport};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared view of everything written to a [`MemoryConnector`]'s channels
#[derive(Debug, Clone)]
pub struct Capture {
    inner: Arc<CaptureInner>,
}

#[derive(Debug)]
struct CaptureInner {
    bytes: Mutex<Vec<u8>>,
    writes: AtomicUsize,
}

impl Capture {
    fn with_capacity(capacity: usize) -> Self {
        Capture {
            inner: Arc::new(CaptureInner {
                bytes: Mutex::new(Vec::with_capacity(capacity)),
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// Copy of the captured stream
    pub fn bytes(&self) -> Vec<u8> {
        match self.inner.bytes.lock() {
            Ok(bytes) => bytes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of write calls made, accepted or not
    pub fn writes(&self) -> usize {
        self.inner.writes.load(Ordering::Acquire)
    }
}

/// Connector whose channels append to a shared [`Capture`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    capture: Capture,
    available: bool,
}

impl MemoryConnector {
    /// A connector with room for `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        MemoryConnector {
            capture: Capture::with_capacity(capacity),
            available: true,
        }
    }

    /// A connector that behaves like an absent collector
    pub fn unavailable() -> Self {
        MemoryConnector {
            capture: Capture::with_capacity(0),
            available: false,
        }
    }

    /// Handle on the captured bytes
    pub fn capture(&self) -> Capture {
        self.capture.clone()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, _name: &str) -> io::Result<Box<dyn Transport>> {
        if !self.available {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no collector listening",
            ));
        }
        Ok(Box::new(MemoryTransport {
            capture: self.capture.clone(),
        }))
    }

    fn endpoint(&self, name: &str) -> String {
        format!("memory:{}", name)
    }
}

struct MemoryTransport {
    capture: Capture,
}

impl Transport for MemoryTransport {
    fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        self.capture.inner.writes.fetch_add(1, Ordering::AcqRel);
        let mut buf = match self.capture.inner.bytes.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        let room = buf.capacity() - buf.len();
        if room < bytes.len() {
            return Ok(0);
        }
        buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}
