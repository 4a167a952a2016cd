//! Structured (table-valued) transfers.
//!
//! Rows come from one of three sources: a forward-only [`RowReader`], an
//! in-memory [`DataTable`], or a sequence of [`DataRecord`]s. Each row is
//! announced with `new_element`, its fields are written through the
//! accessor setters, and `end_elements` closes the value once the source
//! is exhausted.

use tracing::debug;

use crate::error::{Error, Result};
use crate::options::MarshalOptions;
use crate::protocol::accessor;
use crate::protocol::getter_setter::ValueSetters;
use crate::protocol::lob;
use crate::protocol::types::{ColumnMetadata, DataRecord, SqlValue, ValueKind, WireType};

/// A forward-only cursor over rows.
///
/// `get_bytes` and `get_chars` default to slicing the materialized value;
/// readers backed by a stream should override them.
pub trait RowReader {
    /// Number of fields in every row.
    fn field_count(&self) -> usize;

    /// Advance to the next row, returning false once exhausted.
    fn read(&mut self) -> Result<bool>;

    fn is_null(&mut self, ordinal: usize) -> Result<bool>;

    fn get_value(&mut self, ordinal: usize) -> Result<SqlValue>;

    fn get_bytes(&mut self, ordinal: usize, field_offset: i64, buffer: &mut [u8]) -> Result<usize> {
        let value = self.get_value(ordinal)?;
        let bytes = value.as_bytes().ok_or_else(|| {
            Error::invalid_cast(format!("{} field is not binary", value.kind().name()))
        })?;
        Ok(copy_slice(bytes, field_offset, buffer))
    }

    fn get_chars(
        &mut self,
        ordinal: usize,
        field_offset: i64,
        buffer: &mut [u16],
    ) -> Result<usize> {
        let units: Vec<u16> = match self.get_value(ordinal)? {
            SqlValue::String(s) | SqlValue::Xml(s) => s.encode_utf16().collect(),
            SqlValue::Chars(c) => c,
            SqlValue::Char(c) => vec![c],
            other => {
                return Err(Error::invalid_cast(format!(
                    "{} field is not character data",
                    other.kind().name()
                )))
            }
        };
        Ok(copy_slice(&units, field_offset, buffer))
    }
}

fn copy_slice<T: Copy>(source: &[T], offset: i64, buffer: &mut [T]) -> usize {
    let start = (offset.max(0) as usize).min(source.len());
    let count = buffer.len().min(source.len() - start);
    buffer[..count].copy_from_slice(&source[start..start + count]);
    count
}

/// An in-memory table of untyped rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its length must match the column count.
    pub fn add_row(&mut self, values: Vec<SqlValue>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::invalid_argument(
                "values",
                format!(
                    "{} values supplied for {} columns",
                    values.len(),
                    self.columns.len()
                ),
            ));
        }
        self.rows.push(values);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Forward-only reader over the rows.
    pub fn reader(&self) -> DataTableReader<'_> {
        DataTableReader {
            table: self,
            position: None,
        }
    }
}

/// [`RowReader`] over a [`DataTable`].
#[derive(Debug)]
pub struct DataTableReader<'a> {
    table: &'a DataTable,
    position: Option<usize>,
}

impl DataTableReader<'_> {
    fn current(&self, ordinal: usize) -> Result<&SqlValue> {
        let row = self
            .position
            .and_then(|p| self.table.rows.get(p))
            .ok_or_else(|| Error::invalid_argument("reader", "no current row"))?;
        row.get(ordinal).ok_or_else(|| {
            Error::invalid_argument("ordinal", format!("{} is out of range", ordinal))
        })
    }
}

impl RowReader for DataTableReader<'_> {
    fn field_count(&self) -> usize {
        self.table.columns.len()
    }

    fn read(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.table.rows.len()));
        Ok(next < self.table.rows.len())
    }

    fn is_null(&mut self, ordinal: usize) -> Result<bool> {
        Ok(self.current(ordinal)?.is_null())
    }

    fn get_value(&mut self, ordinal: usize) -> Result<SqlValue> {
        self.current(ordinal).cloned()
    }
}

fn check_field_count(source: &'static str, actual: usize, fields: &[ColumnMetadata]) -> Result<()> {
    if actual != fields.len() {
        return Err(Error::invalid_argument(
            source,
            format!("{} fields supplied for a table type of {}", actual, fields.len()),
        ));
    }
    Ok(())
}

// Xml columns take document text; readers usually surface it as a plain string.
fn value_for_field(field: &ColumnMetadata, value: SqlValue) -> SqlValue {
    match value {
        SqlValue::String(s) if field.wire_type() == WireType::Xml => SqlValue::Xml(s),
        other => other,
    }
}

/// Copy every remaining row of `reader` into structured setters.
pub fn fill_from_reader<S, R>(
    setters: &mut S,
    fields: &[ColumnMetadata],
    reader: &mut R,
    options: &MarshalOptions,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
    R: RowReader + ?Sized,
{
    check_field_count("reader", reader.field_count(), fields)?;
    debug!(fields = fields.len(), "structured transfer from reader started");
    let mut rows = 0u64;
    while reader.read()? {
        setters.new_element()?;
        for (i, field) in fields.iter().enumerate() {
            if reader.is_null(i)? {
                setters.set_null(i)?;
                continue;
            }
            let wire_type = field.wire_type();
            if wire_type.is_binary() {
                lob::copy_bytes_from_row(setters, i, field, reader, i, options)?;
            } else if wire_type.is_character() {
                lob::copy_chars_from_row(setters, i, field, reader, i, options)?;
            } else {
                let value = value_for_field(field, reader.get_value(i)?);
                accessor::set_value(setters, i, field, &value, options)?;
            }
        }
        rows += 1;
    }
    setters.end_elements()?;
    debug!(rows, "structured transfer from reader finished");
    Ok(())
}

/// Copy every row of `table` into structured setters.
///
/// The kind of each column is fixed by its first non-null cell; a later
/// cell of another kind fails with `InvalidCast`.
pub fn fill_from_table<S>(
    setters: &mut S,
    fields: &[ColumnMetadata],
    table: &DataTable,
    options: &MarshalOptions,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
{
    check_field_count("table", table.columns().len(), fields)?;
    debug!(rows = table.len(), "structured transfer from table started");
    let mut cell_kinds: Vec<Option<ValueKind>> = vec![None; fields.len()];
    for (row_index, row) in table.rows().iter().enumerate() {
        setters.new_element()?;
        for (i, (field, cell)) in fields.iter().zip(row).enumerate() {
            if cell.is_null() {
                setters.set_null(i)?;
                continue;
            }
            let kind = cell.kind();
            match cell_kinds[i] {
                None => cell_kinds[i] = Some(kind),
                Some(cached) if cached != kind => {
                    return Err(Error::invalid_cast(format!(
                        "row {} column '{}' holds a {} value but earlier rows hold {}",
                        row_index + 1,
                        field.name(),
                        kind.name(),
                        cached.name()
                    )));
                }
                Some(_) => {}
            }
            let value = value_for_field(field, cell.clone());
            accessor::set_value(setters, i, field, &value, options)?;
        }
    }
    setters.end_elements()?;
    debug!(rows = table.len(), "structured transfer from table finished");
    Ok(())
}

/// Copy a sequence of records into structured setters.
///
/// Every record must carry the declared field count and field metadata
/// compatible with the declared fields. Rows are numbered from 1 in the
/// reported errors. Fields marked `use_server_default` are left unset.
pub fn fill_from_records<S, I>(
    setters: &mut S,
    fields: &[ColumnMetadata],
    records: I,
    options: &MarshalOptions,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
    I: IntoIterator<Item = DataRecord>,
{
    debug!(fields = fields.len(), "structured transfer from records started");
    let mut row = 0u64;
    for record in records {
        row += 1;
        if record.len() != fields.len() {
            return Err(Error::FieldCountChanged {
                row,
                expected: fields.len(),
                actual: record.len(),
            });
        }
        if let Some(changed) = fields
            .iter()
            .zip(record.metadata())
            .find(|(declared, actual)| !declared.is_compatible(actual))
        {
            return Err(Error::FieldMetadataChanged {
                row,
                field: changed.1.name().to_string(),
            });
        }

        setters.new_element()?;
        for (i, (field, value)) in fields.iter().zip(record.values()).enumerate() {
            if field.use_server_default() {
                continue;
            }
            accessor::set_value(setters, i, field, value, options)?;
        }
    }
    setters.end_elements()?;
    debug!(rows = row, "structured transfer from records finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::record_buffer::TableBuffer;
    use crate::protocol::types::ColumnInfo;

    fn fields() -> Vec<ColumnMetadata> {
        vec![
            ColumnMetadata::new("id", WireType::Int).unwrap(),
            ColumnMetadata::new_sized("name", WireType::NVarChar, 5).unwrap(),
        ]
    }

    fn record(id: i32, name: &str) -> DataRecord {
        let info = Arc::new(ColumnInfo::new(fields()).unwrap());
        DataRecord::new(vec![SqlValue::I32(id), SqlValue::String(name.to_string())], info).unwrap()
    }

    #[test]
    fn test_fill_from_table() {
        let mut table = DataTable::new(vec!["id".to_string(), "name".to_string()]);
        table
            .add_row(vec![SqlValue::I32(1), SqlValue::String("alpha".to_string())])
            .unwrap();
        table.add_row(vec![SqlValue::Null, SqlValue::String("longer name".to_string())]).unwrap();

        let mut rows = TableBuffer::new(fields());
        fill_from_table(&mut rows, &fields(), &table, &MarshalOptions::default()).unwrap();

        assert!(rows.is_finished());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows()[0].value(0), Some(&SqlValue::I32(1)));
        assert_eq!(rows.rows()[1].value(0), Some(&SqlValue::Null));
        assert_eq!(
            rows.rows()[1].value(1),
            Some(&SqlValue::String("longe".to_string()))
        );
    }

    #[test]
    fn test_table_column_kind_fixed_by_first_cell() {
        let mut table = DataTable::new(vec!["id".to_string(), "name".to_string()]);
        table.add_row(vec![SqlValue::I32(1), SqlValue::Null]).unwrap();
        table.add_row(vec![SqlValue::I64(2), SqlValue::Null]).unwrap();

        let mut rows = TableBuffer::new(fields());
        let result = fill_from_table(&mut rows, &fields(), &table, &MarshalOptions::default());
        assert!(matches!(result, Err(Error::InvalidCast { .. })));
    }

    #[test]
    fn test_fill_from_reader_copies_chars_in_chunks() {
        let mut table = DataTable::new(vec!["id".to_string(), "name".to_string()]);
        table
            .add_row(vec![SqlValue::I32(7), SqlValue::String("abcdefgh".to_string())])
            .unwrap();
        let options = MarshalOptions::default().with_char_chunk_size(2);

        let mut rows = TableBuffer::new(fields());
        fill_from_reader(&mut rows, &fields(), &mut table.reader(), &options).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows.rows()[0].value(1),
            Some(&SqlValue::Chars("abcde".encode_utf16().collect()))
        );
    }

    #[test]
    fn test_reader_field_count_must_match() {
        let table = DataTable::new(vec!["id".to_string()]);
        let mut rows = TableBuffer::new(fields());
        let options = MarshalOptions::default();
        let result = fill_from_reader(&mut rows, &fields(), &mut table.reader(), &options);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[test]
    fn test_records_field_count_change_names_row() {
        let short_info = Arc::new(ColumnInfo::new(vec![fields()[0].clone()]).unwrap());
        let short = DataRecord::new(vec![SqlValue::I32(3)], short_info).unwrap();
        let records = vec![record(1, "a"), record(2, "b"), short, record(4, "d"), record(5, "e")];

        let mut rows = TableBuffer::new(fields());
        match fill_from_records(&mut rows, &fields(), records, &MarshalOptions::default()) {
            Err(Error::FieldCountChanged {
                row,
                expected,
                actual,
            }) => {
                assert_eq!(row, 3);
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            _ => panic!("Expected FieldCountChanged error"),
        }
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_records_metadata_change_names_field() {
        let wide = vec![
            ColumnMetadata::new("id", WireType::BigInt).unwrap(),
            ColumnMetadata::new_sized("name", WireType::NVarChar, 5).unwrap(),
        ];
        let info = Arc::new(ColumnInfo::new(wide).unwrap());
        let values = vec![SqlValue::I64(2), SqlValue::String("b".to_string())];
        let changed = DataRecord::new(values, info).unwrap();

        let mut rows = TableBuffer::new(fields());
        let records = vec![record(1, "a"), changed];
        match fill_from_records(&mut rows, &fields(), records, &MarshalOptions::default()) {
            Err(Error::FieldMetadataChanged { row, field }) => {
                assert_eq!(row, 2);
                assert_eq!(field, "id");
            }
            _ => panic!("Expected FieldMetadataChanged error"),
        }
    }

    #[test]
    fn test_records_skip_server_default_fields() {
        let declared = vec![
            fields()[0].clone().with_server_default(true),
            fields()[1].clone(),
        ];
        let mut rows = TableBuffer::new(declared.clone());
        fill_from_records(&mut rows, &declared, vec![record(1, "a")], &MarshalOptions::default())
            .unwrap();
        assert_eq!(rows.rows()[0].value(0), Some(&SqlValue::Null));
        assert_eq!(rows.rows()[0].value(1), Some(&SqlValue::String("a".to_string())));
    }
}
