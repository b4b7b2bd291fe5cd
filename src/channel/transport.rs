//! Transport seams between the channel manager and the OS

use std::io;

/// A connected, write-only byte channel to the collector
///
/// `write` must not block and must not allocate: it runs inside the traced
/// program's allocator.
pub trait Transport: Send + Sync {
    /// Write as much of `bytes` as the channel accepts right now
    fn write(&self, bytes: &[u8]) -> io::Result<usize>;
}

/// Opens the well-known collector endpoint
pub trait Connector: Send + Sync {
    /// Connect to the channel called `name`
    fn connect(&self, name: &str) -> io::Result<Box<dyn Transport>>;

    /// Human-readable endpoint for `name`, for logs
    fn endpoint(&self, name: &str) -> String;
}
