//! Wire codec
//!
//! Records are described declaratively by [`RecordSchema`] and serialized
//! into a length-prefixed [`WireMessage`]:
//!
//! ```text
//! offset 0: u16 total length (whole message)
//! offset 2: u16 message kind
//! offset 4: fields in schema order, native byte order, packed
//! ```

mod codec;
mod decode;
mod error;
mod message;
mod schema;

pub use codec::{serialize, serialize_raw};
pub use decode::{decode, DecodedRecord, MessageReader};
pub use error::{WireError, WireResult};
pub use message::{WireMessage, HEADER_LEN, MAX_MESSAGE_LEN};
pub use schema::{
    FieldDescriptor, FieldType, RecordSchema, WireRecord, ALLOCATION_SCHEMA, FREE_SCHEMA,
};
