//! Channel manager
//!
//! Owns the single connection from the tracer to the external collector.
//! A missing collector is not an error: the manager stays disconnected and
//! every send becomes a counted drop.

pub mod memory;
#[cfg(windows)]
mod pipe;
#[cfg(unix)]
mod socket;
mod transport;

#[cfg(windows)]
pub use pipe::{PipeConnector, PipeTransport, PIPE_PREFIX};
#[cfg(unix)]
pub use socket::{SocketConnector, SocketTransport, SOCKET_DIR};
pub use transport::{Connector, Transport};

use crate::core::types::TraceError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// The connector for this platform's well-known collector endpoint
pub fn native_connector() -> Box<dyn Connector> {
    #[cfg(windows)]
    {
        Box::new(PipeConnector::new())
    }
    #[cfg(unix)]
    {
        Box::new(SocketConnector::new())
    }
}

/// Snapshot of the channel counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChannelStats {
    /// Messages fully written, greeting included
    pub messages_sent: u64,
    /// Bytes in fully written messages
    pub bytes_sent: u64,
    /// Messages that were not (fully) written
    pub dropped: u64,
    /// Calls that reached the transport
    pub write_attempts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    messages_sent: AtomicU64,
    bytes_sent: AtomicU64,
    dropped: AtomicU64,
    write_attempts: AtomicU64,
}

/// Lifecycle of the connection to the collector
pub struct ChannelManager {
    transport: RwLock<Option<Box<dyn Transport>>>,
    connected: AtomicBool,
    counters: Counters,
}

impl ChannelManager {
    /// Create a disconnected manager
    pub fn new() -> Self {
        ChannelManager {
            transport: RwLock::new(None),
            connected: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Try to open the channel `name` and send `greeting`
    ///
    /// Returns false when no collector is listening. While connected, a
    /// second call keeps the existing handle.
    pub fn connect(&self, connector: &dyn Connector, name: &str, greeting: &[u8]) -> bool {
        let endpoint = connector.endpoint(name);
        {
            let mut slot = self.write_slot();
            if slot.is_some() {
                debug!(%endpoint, "channel already connected");
                return true;
            }

            match connector.connect(name) {
                Ok(transport) => {
                    *slot = Some(transport);
                    self.connected.store(true, Ordering::Release);
                }
                Err(e) => {
                    let error = TraceError::channel_unavailable(endpoint, e);
                    warn!(%error, "tracing disabled");
                    return false;
                }
            }
        }

        info!(%endpoint, "connected to collector");
        if !greeting.is_empty() && !self.send(greeting) {
            warn!(%endpoint, "greeting was not delivered");
        }
        true
    }

    /// Best-effort write of one complete message
    ///
    /// Never blocks: a contended handle, a short write or a missing channel
    /// all count as a dropped message. Safe to call from the hook path.
    pub fn send(&self, bytes: &[u8]) -> bool {
        if !self.connected.load(Ordering::Acquire) {
            return self.drop_message();
        }

        let guard = match self.transport.try_read() {
            Ok(guard) => guard,
            Err(_) => return self.drop_message(),
        };
        let Some(transport) = guard.as_ref() else {
            return self.drop_message();
        };

        self.counters.write_attempts.fetch_add(1, Ordering::Relaxed);
        match transport.write(bytes) {
            Ok(written) if written == bytes.len() => {
                self.counters.messages_sent.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .bytes_sent
                    .fetch_add(bytes.len() as u64, Ordering::Relaxed);
                true
            }
            _ => self.drop_message(),
        }
    }

    /// Release the channel if present; idempotent
    pub fn close(&self) {
        let mut slot = self.write_slot();
        self.connected.store(false, Ordering::Release);
        if slot.take().is_some() {
            info!("collector channel closed");
        }
    }

    /// Whether a channel is currently open
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Current counter values
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            messages_sent: self.counters.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            write_attempts: self.counters.write_attempts.load(Ordering::Relaxed),
        }
    }

    fn drop_message(&self) -> bool {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Box<dyn Transport>>> {
        match self.transport.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        ChannelManager::new()
    }
}
