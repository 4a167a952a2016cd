//! Integration tests for table-valued transfers and UDT keys.

use std::sync::Arc;

use smi_marshal::protocol::accessor;
use smi_marshal::protocol::normalize::{FieldDescriptor, FieldKind, FieldValue};
use smi_marshal::{
    ColumnInfo, ColumnMetadata, DataRecord, DataTable, Error, MarshalOptions, RecordBuffer,
    SqlValue, UdtNormalizer, WireType,
};

fn table_fields() -> Vec<ColumnMetadata> {
    vec![
        ColumnMetadata::new("id", WireType::Int).unwrap(),
        ColumnMetadata::new_sized("payload", WireType::VarBinary, -1).unwrap(),
        ColumnMetadata::new("tag", WireType::Variant).unwrap(),
    ]
}

fn parameter_row() -> (ColumnMetadata, RecordBuffer) {
    let meta = ColumnMetadata::new_structured("rows", "dbo.RowList", table_fields()).unwrap();
    let row = RecordBuffer::new(vec![meta.clone()]);
    (meta, row)
}

fn record(id: i32, payload: Vec<u8>, tag: SqlValue) -> DataRecord {
    let info = Arc::new(ColumnInfo::new(table_fields()).unwrap());
    DataRecord::new(vec![SqlValue::I32(id), SqlValue::Bytes(payload), tag], info).unwrap()
}

#[test]
fn test_data_table_into_structured_column() {
    let (meta, mut row) = parameter_row();
    let mut table = DataTable::new(vec!["id".into(), "payload".into(), "tag".into()]);
    table
        .add_row(vec![SqlValue::I32(1), SqlValue::Bytes(vec![1; 20]), SqlValue::I64(10)])
        .unwrap();
    table
        .add_row(vec![SqlValue::I32(2), SqlValue::Null, SqlValue::Null])
        .unwrap();

    let options = MarshalOptions::default().with_byte_chunk_size(8);
    accessor::set_data_table(&mut row, 0, &meta, &table, &options).unwrap();

    let rows = row.table(0).unwrap();
    assert!(rows.is_finished());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.rows()[0].value(1), Some(&SqlValue::Bytes(vec![1; 20])));
    assert_eq!(rows.rows()[1].value(1), Some(&SqlValue::Null));

    let mut first = rows.rows()[0].clone();
    assert_eq!(
        accessor::get_value(&mut first, 2, &table_fields()[2]).unwrap(),
        SqlValue::I64(10)
    );

    // A column's kind is fixed by its first non-null cell
    table
        .add_row(vec![SqlValue::I32(3), SqlValue::Null, SqlValue::String("x".into())])
        .unwrap();
    let result = accessor::set_data_table(&mut row, 0, &meta, &table, &options);
    assert!(matches!(result, Err(Error::InvalidCast { .. })));
}

#[test]
fn test_data_reader_into_structured_column() {
    let (meta, mut row) = parameter_row();
    let mut table = DataTable::new(vec!["id".into(), "payload".into(), "tag".into()]);
    for id in 0..3 {
        table
            .add_row(vec![SqlValue::I32(id), SqlValue::Bytes(vec![id as u8; 3]), SqlValue::Null])
            .unwrap();
    }

    let mut reader = table.reader();
    accessor::set_data_reader(&mut row, 0, &meta, &mut reader, &MarshalOptions::default()).unwrap();

    let rows = row.table(0).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.rows()[2].value(0), Some(&SqlValue::I32(2)));
    assert_eq!(rows.rows()[2].value(1), Some(&SqlValue::Bytes(vec![2, 2, 2])));
}

#[test]
fn test_record_sequence_shape_change() {
    let (meta, mut row) = parameter_row();
    let short_info = Arc::new(ColumnInfo::new(table_fields()[..2].to_vec()).unwrap());
    let short = DataRecord::new(vec![SqlValue::I32(3), SqlValue::Null], short_info).unwrap();
    let records = vec![
        record(1, vec![1], SqlValue::Null),
        record(2, vec![2], SqlValue::Bool(true)),
        short,
        record(4, vec![4], SqlValue::Null),
        record(5, vec![5], SqlValue::Null),
    ];

    let err = accessor::set_records(&mut row, 0, &meta, records, &MarshalOptions::default())
        .unwrap_err();
    assert!(err.is_shape_mismatch());
    match err {
        Error::FieldCountChanged { row, .. } => assert_eq!(row, 3),
        _ => panic!("Expected FieldCountChanged error"),
    }
}

#[test]
fn test_records_require_table_column() {
    let meta = ColumnMetadata::new("id", WireType::Int).unwrap();
    let mut row = RecordBuffer::new(vec![meta.clone()]);
    let result = accessor::set_records(
        &mut row,
        0,
        &meta,
        Vec::<DataRecord>::new(),
        &MarshalOptions::default(),
    );
    assert!(matches!(result, Err(Error::InvalidCast { .. })));
}

#[test]
fn test_normalized_keys_sort_like_values() {
    let normalizer = UdtNormalizer::new(vec![
        FieldDescriptor::new(0, FieldKind::I16),
        FieldDescriptor::new(2, FieldKind::F32),
    ])
    .unwrap();
    let values = [(-5i16, 1.5f32), (-5, 2.0), (0, -0.0), (0, 0.5), (7, f32::NEG_INFINITY)];
    let keys: Vec<_> = values
        .iter()
        .map(|(a, b)| {
            normalizer
                .normalize(&[FieldValue::I16(*a), FieldValue::F32(*b)])
                .unwrap()
        })
        .collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}
