//! Declarative record layouts
//!
//! Every record type is described as data: a kind tag plus an ordered list of
//! primitive fields, each pointing at a byte offset inside the `#[repr(C)]`
//! record. The codec walks this list instead of knowing the record types.

use super::error::{WireError, WireResult};
use super::message::{HEADER_LEN, MAX_MESSAGE_LEN};
use crate::core::types::{AllocationRecord, FreeRecord, RecordKind};
use bytemuck::Pod;
use std::mem::{self, offset_of};

/// Primitive width and signedness of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl FieldType {
    /// Encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            FieldType::U16 => 2,
            FieldType::I32 | FieldType::U32 => 4,
            FieldType::I64 | FieldType::U64 => 8,
        }
    }
}

/// One field of a record: its type and where it lives in the struct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub ty: FieldType,
    pub offset: usize,
}

impl FieldDescriptor {
    pub const fn new(ty: FieldType, offset: usize) -> Self {
        FieldDescriptor { ty, offset }
    }

    /// One past the last byte of the field inside the record
    pub const fn end(&self) -> usize {
        self.offset + self.ty.width()
    }
}

/// Association of a record kind to its ordered field list
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub kind: RecordKind,
    pub fields: &'static [FieldDescriptor],
}

impl RecordSchema {
    /// Number of field bytes following the header
    pub const fn payload_len(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.fields.len() {
            total += self.fields[i].ty.width();
            i += 1;
        }
        total
    }

    /// Total encoded size, header included
    pub const fn message_len(&self) -> usize {
        HEADER_LEN + self.payload_len()
    }

    /// Check that every field lies inside `R` and the message fits the buffer
    pub fn validate_for<R: WireRecord>(&self) -> WireResult<()> {
        let record_size = mem::size_of::<R>();
        let invalid = |reason: String| WireError::InvalidSchema {
            kind: self.kind,
            reason,
        };

        if self.fields.is_empty() {
            return Err(invalid("schema has no fields".to_string()));
        }

        for (index, field) in self.fields.iter().enumerate() {
            if field.end() > record_size {
                return Err(invalid(format!(
                    "field {} ends at byte {} but the record is {} bytes",
                    index,
                    field.end(),
                    record_size
                )));
            }
        }

        if self.message_len() > MAX_MESSAGE_LEN || self.message_len() > u16::MAX as usize {
            return Err(invalid(format!(
                "message of {} bytes exceeds the {} byte buffer",
                self.message_len(),
                MAX_MESSAGE_LEN
            )));
        }

        Ok(())
    }
}

/// A fixed-layout record the codec can serialize
pub trait WireRecord: Pod {
    const SCHEMA: &'static RecordSchema;
}

pub const ALLOCATION_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Allocation,
    fields: &[
        FieldDescriptor::new(FieldType::U32, offset_of!(AllocationRecord, size)),
        FieldDescriptor::new(FieldType::U32, offset_of!(AllocationRecord, address)),
    ],
};

pub const FREE_SCHEMA: RecordSchema = RecordSchema {
    kind: RecordKind::Free,
    fields: &[FieldDescriptor::new(
        FieldType::U32,
        offset_of!(FreeRecord, address),
    )],
};

impl WireRecord for AllocationRecord {
    const SCHEMA: &'static RecordSchema = &ALLOCATION_SCHEMA;
}

impl WireRecord for FreeRecord {
    const SCHEMA: &'static RecordSchema = &FREE_SCHEMA;
}

impl RecordKind {
    /// The schema describing this kind's payload
    pub const fn schema(self) -> &'static RecordSchema {
        match self {
            RecordKind::Allocation => &ALLOCATION_SCHEMA,
            RecordKind::Free => &FREE_SCHEMA,
        }
    }
}
