//! Integration tests for the wire codec

use memtrace::core::types::{Address, AllocationRecord, FreeRecord, RecordKind};
use memtrace::wire::{
    decode, serialize, serialize_raw, DecodedRecord, FieldDescriptor, FieldType, MessageReader,
    RecordSchema, WireMessage, WireRecord, HEADER_LEN,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn encode<R: WireRecord>(record: &R) -> Vec<u8> {
    let mut msg = WireMessage::new();
    serialize(record, &mut msg);
    msg.as_bytes().to_vec()
}

#[test]
fn test_schemas_match_record_layouts() {
    assert!(AllocationRecord::SCHEMA.validate_for::<AllocationRecord>().is_ok());
    assert!(FreeRecord::SCHEMA.validate_for::<FreeRecord>().is_ok());

    for kind in RecordKind::ALL {
        assert_eq!(kind.schema().kind, kind);
    }
    assert_eq!(RecordKind::Allocation.schema().message_len(), 12);
    assert_eq!(RecordKind::Free.schema().message_len(), 8);
}

#[test]
#[cfg(target_endian = "little")]
fn test_allocation_message_bytes() {
    let bytes = encode(&AllocationRecord::new(0x40, Address::new(0x1000)));
    assert_eq!(bytes, vec![12, 0, 1, 0, 0x40, 0, 0, 0, 0x00, 0x10, 0, 0]);
}

#[test]
#[cfg(target_endian = "little")]
fn test_free_message_bytes() {
    let bytes = encode(&FreeRecord::new(Address::new(0x1000)));
    assert_eq!(bytes, vec![8, 0, 2, 0, 0x00, 0x10, 0, 0]);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_wide_addresses_are_truncated() {
    let record = FreeRecord::new(Address::new(0x7FFE_1234_5678));
    assert_eq!(record.address, 0x1234_5678);
}

#[test]
#[cfg(target_endian = "little")]
fn test_mixed_width_schema() {
    // u16 at 0, padding, u64 at 8, i32 at 16
    static FIELDS: [FieldDescriptor; 3] = [
        FieldDescriptor::new(FieldType::U16, 0),
        FieldDescriptor::new(FieldType::U64, 8),
        FieldDescriptor::new(FieldType::I32, 16),
    ];
    let schema = RecordSchema {
        kind: RecordKind::Allocation,
        fields: &FIELDS,
    };

    let mut data = [0u8; 24];
    data[0..2].copy_from_slice(&0xBEEFu16.to_ne_bytes());
    data[8..16].copy_from_slice(&0x0102_0304_0506_0708u64.to_ne_bytes());
    data[16..20].copy_from_slice(&(-2i32).to_ne_bytes());

    let mut msg = WireMessage::new();
    let len = serialize_raw(&data, &schema, &mut msg);

    assert_eq!(len, HEADER_LEN + 2 + 8 + 4);
    assert_eq!(len, schema.message_len());
    assert_eq!(
        msg.as_bytes(),
        &[
            18, 0, 1, 0, // header
            0xEF, 0xBE, // u16
            8, 7, 6, 5, 4, 3, 2, 1, // full u64
            0xFE, 0xFF, 0xFF, 0xFF, // i32
        ][..]
    );
}

#[test]
fn test_field_outside_record_ends_message() {
    static FIELDS: [FieldDescriptor; 2] = [
        FieldDescriptor::new(FieldType::U32, 0),
        FieldDescriptor::new(FieldType::U64, 4),
    ];
    let schema = RecordSchema {
        kind: RecordKind::Free,
        fields: &FIELDS,
    };

    let mut msg = WireMessage::new();
    let len = serialize_raw(&[1, 2, 3, 4, 5, 6], &schema, &mut msg);

    assert_eq!(len, 8);
    assert_eq!(msg.declared_len(), Some(8));
}

#[test]
fn test_reader_strips_greeting_and_splits_stream() {
    let mut stream = b"hello, sailor".to_vec();
    stream.extend(encode(&AllocationRecord::new(16, Address::new(0xA0))));
    stream.extend(encode(&FreeRecord::new(Address::new(0xA0))));

    let mut reader = MessageReader::new(b"hello, sailor");
    reader.feed(&stream);

    assert_eq!(
        reader.next_record(),
        Some(Ok(DecodedRecord::Allocation(AllocationRecord::new(
            16,
            Address::new(0xA0)
        ))))
    );
    assert_eq!(
        reader.next_record(),
        Some(Ok(DecodedRecord::Free(FreeRecord::new(Address::new(0xA0)))))
    );
    assert_eq!(reader.next_record(), None);
    assert!(reader.greeted());
    assert_eq!(reader.buffered(), 0);
}

fn any_record() -> impl Strategy<Value = DecodedRecord> {
    prop_oneof![
        (any::<u32>(), any::<u32>()).prop_map(|(size, address)| {
            DecodedRecord::Allocation(AllocationRecord::new(
                size as usize,
                Address::new(address as usize),
            ))
        }),
        any::<u32>().prop_map(|address| {
            DecodedRecord::Free(FreeRecord::new(Address::new(address as usize)))
        }),
    ]
}

fn encode_decoded(record: &DecodedRecord, msg: &mut WireMessage) -> usize {
    match record {
        DecodedRecord::Allocation(r) => serialize(r, msg),
        DecodedRecord::Free(r) => serialize(r, msg),
    }
}

proptest! {
    #[test]
    fn prop_declared_length_matches_written(record in any_record()) {
        let mut msg = WireMessage::new();
        let len = encode_decoded(&record, &mut msg);

        prop_assert_eq!(len, msg.len());
        prop_assert_eq!(msg.declared_len(), Some(len as u16));
        prop_assert_eq!(len, record.kind().schema().message_len());
        prop_assert_eq!(msg.kind_tag(), Some(record.kind().tag()));
    }

    #[test]
    fn prop_decode_inverts_serialize(record in any_record()) {
        let mut msg = WireMessage::new();
        let len = encode_decoded(&record, &mut msg);

        let (decoded, used) = decode(msg.as_bytes()).unwrap();
        prop_assert_eq!(decoded, record);
        prop_assert_eq!(used, len);
    }

    #[test]
    fn prop_reused_buffer_is_reset(first in any_record(), second in any_record()) {
        let mut reused = WireMessage::new();
        encode_decoded(&first, &mut reused);
        encode_decoded(&second, &mut reused);

        let mut fresh = WireMessage::new();
        encode_decoded(&second, &mut fresh);
        prop_assert_eq!(reused.as_bytes(), fresh.as_bytes());
    }

    #[test]
    fn prop_reader_handles_any_chunking(
        records in prop::collection::vec(any_record(), 1..40),
        chunk in 1usize..17,
    ) {
        let mut stream = b"hello, sailor".to_vec();
        let mut msg = WireMessage::new();
        for record in &records {
            encode_decoded(record, &mut msg);
            stream.extend_from_slice(msg.as_bytes());
        }

        let mut reader = MessageReader::new(b"hello, sailor");
        let mut decoded = Vec::new();
        for piece in stream.chunks(chunk) {
            reader.feed(piece);
            while let Some(next) = reader.next_record() {
                decoded.push(next.unwrap());
            }
        }

        prop_assert!(reader.greeted());
        prop_assert_eq!(decoded, records);
    }
}
