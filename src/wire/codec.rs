//! Schema-driven serializer
//!
//! Runs on every traced allocation: no allocation, no logging, no panics.

use super::message::WireMessage;
use super::schema::{RecordSchema, WireRecord};

/// Serialize `record` into `msg`, replacing its contents
///
/// Returns the number of bytes written, which is also the value stored in
/// the length prefix.
pub fn serialize<R: WireRecord>(record: &R, msg: &mut WireMessage) -> usize {
    serialize_raw(bytemuck::bytes_of(record), R::SCHEMA, msg)
}

/// Serialize the raw bytes of a record described by `schema`
///
/// Fields are copied in schema order at their declared width. A field that
/// falls outside `data` or would overflow the buffer ends the message early;
/// the length prefix always matches what was actually written.
pub fn serialize_raw(data: &[u8], schema: &RecordSchema, msg: &mut WireMessage) -> usize {
    msg.reset();

    // Length is only known once the fields are in; patched below.
    if msg.append_blanks(2).is_none() {
        return 0;
    }
    let mut len = 2;
    if msg.append(&schema.kind.tag().to_ne_bytes()) {
        len += 2;
    }

    for field in schema.fields {
        let Some(src) = data.get(field.offset..field.end()) else {
            break;
        };
        if !msg.append(src) {
            break;
        }
        len += src.len();
    }

    msg.patch_u16(0, len as u16);
    len
}
