//! Integration tests for typed access over an in-memory record buffer.

use std::io::Read;

use chrono::NaiveDate;
use smi_marshal::protocol::{accessor, lob};
use smi_marshal::{
    BlobReader, CharReader, ColumnMetadata, Error, MarshalOptions, RecordBuffer, SqlDecimal,
    SqlMoney, SqlValue, WireType,
};

fn row_of(columns: &[ColumnMetadata]) -> RecordBuffer {
    RecordBuffer::new(columns.to_vec())
}

#[test]
fn test_scalar_round_trip() {
    let columns = vec![
        ColumnMetadata::new("id", WireType::BigInt).unwrap(),
        ColumnMetadata::new("flag", WireType::Bit).unwrap(),
        ColumnMetadata::new("ratio", WireType::Float).unwrap(),
        ColumnMetadata::new("small", WireType::SmallInt).unwrap(),
    ];
    let mut row = row_of(&columns);

    accessor::set_i64(&mut row, 0, &columns[0], 9_000_000_000).unwrap();
    accessor::set_bool(&mut row, 1, &columns[1], true).unwrap();
    accessor::set_f64(&mut row, 2, &columns[2], 0.25).unwrap();
    accessor::set_i16(&mut row, 3, &columns[3], -7).unwrap();

    assert_eq!(accessor::get_i64(&mut row, 0, &columns[0]).unwrap(), 9_000_000_000);
    assert!(accessor::get_bool(&mut row, 1, &columns[1]).unwrap());
    assert_eq!(accessor::get_f64(&mut row, 2, &columns[2]).unwrap(), 0.25);
    assert_eq!(
        accessor::get_value(&mut row, 3, &columns[3]).unwrap(),
        SqlValue::I16(-7)
    );
}

#[test]
fn test_setter_rejects_incompatible_kind() {
    let meta = ColumnMetadata::new("flag", WireType::Bit).unwrap();
    let mut row = row_of(&[meta.clone()]);

    let result = accessor::set_string(&mut row, 0, &meta, "yes");
    assert!(matches!(result, Err(Error::InvalidCast { .. })));
    assert!(row.value(0).map(SqlValue::is_null).unwrap_or(false));
}

#[test]
fn test_null_handling() {
    let meta = ColumnMetadata::new("n", WireType::Int).unwrap();
    let mut row = row_of(&[meta.clone()]);

    assert!(accessor::is_null(&mut row, 0).unwrap());
    match accessor::get_i32(&mut row, 0, &meta) {
        Err(Error::NullValue { ordinal }) => assert_eq!(ordinal, 0),
        _ => panic!("Expected NullValue error"),
    }
    let value = accessor::get_nullable(&mut row, 0, |r| accessor::get_i32(r, 0, &meta)).unwrap();
    assert_eq!(value, None);
    assert_eq!(accessor::get_value(&mut row, 0, &meta).unwrap(), SqlValue::Null);
}

#[test]
fn test_money_family() {
    let money = ColumnMetadata::new("price", WireType::Money).unwrap();
    let small = ColumnMetadata::new("fee", WireType::SmallMoney).unwrap();
    let mut row = row_of(&[money.clone(), small.clone()]);

    let decimal: SqlDecimal = "12.34567".parse().unwrap();
    accessor::set_decimal(&mut row, 0, &money, &decimal).unwrap();
    assert_eq!(accessor::get_money(&mut row, 0, &money).unwrap().internal(), 123_456);

    let too_big = SqlMoney::from_internal(3_000_000_000);
    match accessor::set_money(&mut row, 1, &small, too_big) {
        Err(Error::InvalidMetadataValue { wire_type, .. }) => {
            assert_eq!(wire_type, WireType::SmallMoney)
        }
        _ => panic!("Expected InvalidMetadataValue error"),
    }

    let widest = SqlDecimal::new(10i128.pow(37), 38, 0).unwrap();
    assert!(matches!(
        accessor::set_decimal(&mut row, 0, &money, &widest),
        Err(Error::MoneyOverflow { .. })
    ));
}

#[test]
fn test_date_column_keeps_date_only() {
    let meta = ColumnMetadata::new("d", WireType::Date).unwrap();
    let mut row = row_of(&[meta.clone()]);
    let when = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_opt(13, 45, 0)
        .unwrap();

    accessor::set_datetime(&mut row, 0, &meta, when).unwrap();
    assert_eq!(
        accessor::get_value(&mut row, 0, &meta).unwrap(),
        SqlValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    );
}

#[test]
fn test_variant_carries_concrete_type() {
    let meta = ColumnMetadata::new("v", WireType::Variant).unwrap();
    let mut row = row_of(&[meta.clone()]);
    let options = MarshalOptions::default();

    accessor::set_value(&mut row, 0, &meta, &SqlValue::I32(5), &options).unwrap();
    assert_eq!(accessor::get_value(&mut row, 0, &meta).unwrap(), SqlValue::I32(5));

    accessor::set_value(&mut row, 0, &meta, &SqlValue::String("hi".to_string()), &options)
        .unwrap();
    assert_eq!(
        accessor::get_value(&mut row, 0, &meta).unwrap(),
        SqlValue::String("hi".to_string())
    );
}

#[test]
fn test_get_bytes_probe_and_tail() {
    let meta = ColumnMetadata::new_sized("blob", WireType::VarBinary, -1).unwrap();
    let mut row = row_of(&[meta.clone()]);
    let data: Vec<u8> = (0..10).collect();
    accessor::set_byte_array(&mut row, 0, &meta, &data).unwrap();

    let total = accessor::get_bytes(&mut row, 0, &meta, 0, None, 0, 0, true).unwrap();
    assert_eq!(total, 10);

    let mut buffer = [0u8; 4];
    let read =
        accessor::get_bytes(&mut row, 0, &meta, 8, Some(&mut buffer), 0, 4, true).unwrap();
    assert_eq!(read, 2);
    assert_eq!(&buffer[..2], &[8, 9]);

    let past_end =
        accessor::get_bytes(&mut row, 0, &meta, 12, Some(&mut buffer), 0, 4, true).unwrap();
    assert_eq!(past_end, 0);

    let err =
        accessor::get_bytes(&mut row, 0, &meta, -1, Some(&mut buffer), 0, 4, true).unwrap_err();
    assert!(err.is_invalid_length());
}

#[test]
fn test_get_bytes_caps_each_call_at_wire_chunk() {
    let meta = ColumnMetadata::new_sized("blob", WireType::VarBinary, -1).unwrap();
    let mut row = row_of(&[meta.clone()]);
    let data: Vec<u8> = (0..20_000).map(|i| (i % 251) as u8).collect();
    accessor::set_byte_array(&mut row, 0, &meta, &data).unwrap();

    let mut buffer = vec![0u8; 20_000];
    let mut offset = 0i64;
    let mut calls = 0;
    loop {
        let remaining = buffer.len() as i64 - offset;
        let read = accessor::get_bytes(
            &mut row,
            0,
            &meta,
            offset,
            Some(&mut buffer),
            offset,
            remaining,
            true,
        )
        .unwrap();
        if read == 0 {
            break;
        }
        assert!(read <= 8000);
        offset += read;
        calls += 1;
    }
    assert_eq!(calls, 3);
    assert_eq!(buffer, data);
}

#[test]
fn test_get_chars_caps_each_call_at_wire_chunk() {
    let meta = ColumnMetadata::new_sized("text", WireType::NVarChar, -1).unwrap();
    let mut row = row_of(&[meta.clone()]);
    accessor::set_string(&mut row, 0, &meta, &"x".repeat(5000)).unwrap();

    let mut buffer = vec![0u16; 5000];
    let read =
        accessor::get_chars(&mut row, 0, &meta, 0, Some(&mut buffer), 0, 5000, true).unwrap();
    assert_eq!(read, 4000);
}

#[test]
fn test_get_bytes_on_bounded_string_is_rejected() {
    let meta = ColumnMetadata::new_sized("s", WireType::NVarChar, 10).unwrap();
    let mut row = row_of(&[meta.clone()]);
    accessor::set_string(&mut row, 0, &meta, "abc").unwrap();

    match accessor::get_bytes(&mut row, 0, &meta, 0, None, 0, 0, true) {
        Err(Error::NonBlobColumn { wire_type }) => assert_eq!(wire_type, WireType::NVarChar),
        _ => panic!("Expected NonBlobColumn error"),
    }
}

#[test]
fn test_zero_length_write_is_empty_value() {
    let meta = ColumnMetadata::new_sized("b", WireType::VarBinary, 20).unwrap();
    let mut row = row_of(&[meta.clone()]);

    let written = accessor::set_bytes(&mut row, 0, &meta, 5, &[1, 2, 3], 2, 0).unwrap();
    assert_eq!(written, 0);
    accessor::set_bytes_length(&mut row, 0, &meta, 0).unwrap();
    assert_eq!(accessor::get_byte_array(&mut row, 0, &meta).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_streams_through_blob_and_char_readers() {
    let blob = ColumnMetadata::new_sized("blob", WireType::VarBinary, -1).unwrap();
    let text = ColumnMetadata::new_sized("text", WireType::NVarChar, -1).unwrap();
    let mut row = row_of(&[blob.clone(), text.clone()]);
    let options = MarshalOptions::default()
        .with_byte_chunk_size(7)
        .with_char_chunk_size(3);

    let payload: Vec<u8> = (0..100u8).collect();
    let written =
        lob::set_bytes_from_reader(&mut row, 0, &blob, &mut payload.as_slice(), &options).unwrap();
    assert_eq!(written, 100);

    let message = "streamed through small chunks";
    let mut units = message.encode_utf16();
    lob::set_chars_from_reader(&mut row, 1, &text, &mut units, &options).unwrap();

    let mut reader = BlobReader::open(&mut row, 0, &blob, &options).unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, payload);

    let mut chars = CharReader::open(&mut row, 1, &text, &options).unwrap();
    assert_eq!(chars.read_to_string().unwrap(), message);
}
