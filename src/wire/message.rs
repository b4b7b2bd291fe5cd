//! Fixed-capacity message buffer
//!
//! The buffer lives inline (on the hook's stack) so building a message never
//! touches the heap that is being traced.

use std::fmt;

/// Bytes taken by the length prefix and the kind tag
pub const HEADER_LEN: usize = 4;

/// Capacity of a single message
pub const MAX_MESSAGE_LEN: usize = 64;

/// `[u16 total length][u16 kind][fields...]`, native byte order
#[derive(Clone)]
pub struct WireMessage {
    buf: [u8; MAX_MESSAGE_LEN],
    len: usize,
}

impl WireMessage {
    /// Create an empty message
    pub const fn new() -> Self {
        WireMessage {
            buf: [0; MAX_MESSAGE_LEN],
            len: 0,
        }
    }

    /// Forget the current contents
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Reserve `count` bytes at the end and return them, or `None` when full
    pub(crate) fn append_blanks(&mut self, count: usize) -> Option<&mut [u8]> {
        let start = self.len;
        let end = start.checked_add(count)?;
        if end > MAX_MESSAGE_LEN {
            return None;
        }
        self.len = end;
        Some(&mut self.buf[start..end])
    }

    /// Append raw bytes; returns false if they do not fit
    pub(crate) fn append(&mut self, bytes: &[u8]) -> bool {
        match self.append_blanks(bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }

    /// Overwrite two already-written bytes at `at`
    pub(crate) fn patch_u16(&mut self, at: usize, value: u16) {
        if at + 2 <= self.len {
            self.buf[at..at + 2].copy_from_slice(&value.to_ne_bytes());
        }
    }

    /// The serialized bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Value of the length prefix, if one has been written
    pub fn declared_len(&self) -> Option<u16> {
        self.read_u16(0)
    }

    /// Value of the kind tag, if one has been written
    pub fn kind_tag(&self) -> Option<u16> {
        self.read_u16(2)
    }

    fn read_u16(&self, at: usize) -> Option<u16> {
        let bytes = self.as_bytes().get(at..at + 2)?;
        Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }
}

impl Default for WireMessage {
    fn default() -> Self {
        WireMessage::new()
    }
}

impl AsRef<[u8]> for WireMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Debug for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireMessage")
            .field("len", &self.len)
            .field("bytes", &hex::encode(self.as_bytes()))
            .finish()
    }
}
