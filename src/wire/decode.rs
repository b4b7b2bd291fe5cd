//! Consumer side of the wire protocol

use super::error::{WireError, WireResult};
use super::message::HEADER_LEN;
use super::schema::WireRecord;
use crate::core::types::{AllocationRecord, FreeRecord, RecordKind};
use serde::Serialize;

/// A record recovered from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecodedRecord {
    Allocation(AllocationRecord),
    Free(FreeRecord),
}

impl DecodedRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            DecodedRecord::Allocation(_) => RecordKind::Allocation,
            DecodedRecord::Free(_) => RecordKind::Free,
        }
    }
}

/// Decode the first message in `bytes`
///
/// Returns the record and the number of bytes it occupied.
pub fn decode(bytes: &[u8]) -> WireResult<(DecodedRecord, usize)> {
    let declared = declared_len(bytes)?;
    if declared < HEADER_LEN {
        return Err(WireError::InvalidLength(declared));
    }
    if bytes.len() < declared {
        return Err(WireError::Truncated {
            needed: declared,
            available: bytes.len(),
        });
    }

    let tag = u16::from_ne_bytes([bytes[2], bytes[3]]);
    let kind = RecordKind::from_tag(tag).ok_or(WireError::UnknownKind(tag))?;
    let expected = kind.schema().message_len();
    if declared != expected {
        return Err(WireError::LengthMismatch {
            kind,
            declared,
            expected,
        });
    }

    let payload = &bytes[HEADER_LEN..declared];
    let record = match kind {
        RecordKind::Allocation => DecodedRecord::Allocation(decode_fields(payload)),
        RecordKind::Free => DecodedRecord::Free(decode_fields(payload)),
    };
    Ok((record, declared))
}

fn declared_len(bytes: &[u8]) -> WireResult<usize> {
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Truncated {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    Ok(u16::from_ne_bytes([bytes[0], bytes[1]]) as usize)
}

/// Scatter the packed payload back to the record's field offsets.
/// `payload` has been length-checked against the schema by the caller.
fn decode_fields<R: WireRecord>(payload: &[u8]) -> R {
    let mut record = R::zeroed();
    let dst = bytemuck::bytes_of_mut(&mut record);
    let mut cursor = 0;
    for field in R::SCHEMA.fields {
        let width = field.ty.width();
        dst[field.offset..field.end()].copy_from_slice(&payload[cursor..cursor + width]);
        cursor += width;
    }
    record
}

/// Splits a byte stream from one tracer connection into records
///
/// The tracer opens every connection with a raw ASCII greeting that carries
/// no length prefix; it is stripped before framing starts.
#[derive(Debug)]
pub struct MessageReader {
    buf: Vec<u8>,
    greeting: Vec<u8>,
    greeting_pending: bool,
    greeted: bool,
}

impl MessageReader {
    /// Create a reader expecting `greeting` at the start of the stream
    pub fn new(greeting: &[u8]) -> Self {
        MessageReader {
            buf: Vec::with_capacity(4096),
            greeting: greeting.to_vec(),
            greeting_pending: !greeting.is_empty(),
            greeted: false,
        }
    }

    /// Append bytes received from the channel
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Whether the stream started with the expected greeting
    pub fn greeted(&self) -> bool {
        self.greeted
    }

    /// Bytes received but not yet framed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete record, `None` when more bytes are needed
    ///
    /// Messages with an unknown kind are consumed and reported as errors so
    /// the stream stays in sync. A length prefix smaller than the header
    /// cannot be resynchronized and discards the buffered bytes.
    pub fn next_record(&mut self) -> Option<WireResult<DecodedRecord>> {
        if self.greeting_pending {
            let n = self.buf.len().min(self.greeting.len());
            if self.buf[..n] != self.greeting[..n] {
                self.greeting_pending = false;
            } else if n < self.greeting.len() {
                return None;
            } else {
                self.buf.drain(..n);
                self.greeting_pending = false;
                self.greeted = true;
            }
        }

        let declared = declared_len(&self.buf).ok()?;
        if declared < HEADER_LEN {
            self.buf.clear();
            return Some(Err(WireError::InvalidLength(declared)));
        }
        if self.buf.len() < declared {
            return None;
        }

        let result = decode(&self.buf[..declared]).map(|(record, _)| record);
        self.buf.drain(..declared);
        Some(result)
    }
}
