//! In-memory row storage implementing the positional primitives.
//!
//! [`RecordBuffer`] stages one row: a cell per column, sized from the
//! column metadata at construction and overwritten in place. It answers
//! the same getters and setters as a transport, so every accessor works
//! against it unchanged. A structured column owns a [`TableBuffer`] that
//! collects rows between `new_element` and `end_elements`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::getter_setter::{ValueGetters, ValueSetters};
use crate::protocol::types::{ColumnMetadata, SqlDecimal, SqlValue};

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Value(SqlValue),
    Table(TableBuffer),
}

/// A single staged row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBuffer {
    metadata: Vec<ColumnMetadata>,
    cells: Vec<Cell>,
    variant_types: Vec<Option<ColumnMetadata>>,
}

fn utf16_le_bytes(units: impl Iterator<Item = u16>) -> Vec<u8> {
    units.flat_map(|u| u.to_le_bytes()).collect()
}

fn write_at<T: Copy + Default>(data: &mut Vec<T>, offset: i64, buffer: &[T]) -> Result<usize> {
    let start = usize::try_from(offset)
        .map_err(|_| Error::NegativeParameter { parameter: "fieldOffset" })?;
    if start > data.len() {
        return Err(Error::invalid_argument(
            "field_offset",
            format!("{} is past the current length {}", start, data.len()),
        ));
    }
    let end = start + buffer.len();
    if end > data.len() {
        data.resize(end, T::default());
    }
    data[start..end].copy_from_slice(buffer);
    Ok(buffer.len())
}

fn read_at<T: Copy>(data: &[T], offset: i64, buffer: &mut [T]) -> usize {
    let start = (offset.max(0) as usize).min(data.len());
    let count = buffer.len().min(data.len() - start);
    buffer[..count].copy_from_slice(&data[start..start + count]);
    count
}

impl RecordBuffer {
    /// Create an all-null row shaped by `metadata`.
    pub fn new(metadata: Vec<ColumnMetadata>) -> Self {
        let count = metadata.len();
        Self {
            metadata,
            cells: vec![Cell::Null; count],
            variant_types: vec![None; count],
        }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn metadata(&self) -> &[ColumnMetadata] {
        &self.metadata
    }

    /// Stored scalar value, `Some(SqlValue::Null)` for a null cell and
    /// `None` for a structured cell or an ordinal out of range.
    pub fn value(&self, ordinal: usize) -> Option<&SqlValue> {
        const NULL: &SqlValue = &SqlValue::Null;
        match self.cells.get(ordinal)? {
            Cell::Null => Some(NULL),
            Cell::Value(v) => Some(v),
            Cell::Table(_) => None,
        }
    }

    /// Rows staged in a structured cell.
    pub fn table(&self, ordinal: usize) -> Option<&TableBuffer> {
        match self.cells.get(ordinal)? {
            Cell::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Reset every cell to null.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = Cell::Null);
        self.variant_types.iter_mut().for_each(|v| *v = None);
    }

    fn check_ordinal(&self, ordinal: usize) -> Result<()> {
        if ordinal < self.cells.len() {
            Ok(())
        } else {
            Err(Error::invalid_argument(
                "ordinal",
                format!("{} is out of range for {} columns", ordinal, self.cells.len()),
            ))
        }
    }

    fn stored(&self, ordinal: usize) -> Result<&SqlValue> {
        self.check_ordinal(ordinal)?;
        match &self.cells[ordinal] {
            Cell::Value(v) => Ok(v),
            Cell::Null => Err(Error::NullValue { ordinal }),
            Cell::Table(_) => Err(Error::invalid_cast(format!(
                "ordinal {} holds a table value",
                ordinal
            ))),
        }
    }

    fn mismatch(&self, ordinal: usize, wanted: &str) -> Error {
        let held = self
            .value(ordinal)
            .map(|v| v.kind().name())
            .unwrap_or("table");
        Error::invariant(format!(
            "ordinal {} holds a {} value, not {}",
            ordinal, held, wanted
        ))
    }

    fn put(&mut self, ordinal: usize, value: SqlValue) -> Result<()> {
        self.check_ordinal(ordinal)?;
        self.cells[ordinal] = Cell::Value(value);
        Ok(())
    }

    fn bytes_mut(&mut self, ordinal: usize, reset: bool) -> Result<&mut Vec<u8>> {
        self.check_ordinal(ordinal)?;
        let cell = &mut self.cells[ordinal];
        if reset || !matches!(cell, Cell::Value(SqlValue::Bytes(_))) {
            *cell = Cell::Value(SqlValue::Bytes(Vec::new()));
        }
        match cell {
            Cell::Value(SqlValue::Bytes(b)) => Ok(b),
            _ => Err(Error::invariant("binary cell was not initialized")),
        }
    }

    fn chars_mut(&mut self, ordinal: usize, reset: bool) -> Result<&mut Vec<u16>> {
        self.check_ordinal(ordinal)?;
        let cell = &mut self.cells[ordinal];
        if reset || !matches!(cell, Cell::Value(SqlValue::Chars(_))) {
            *cell = Cell::Value(SqlValue::Chars(Vec::new()));
        }
        match cell {
            Cell::Value(SqlValue::Chars(c)) => Ok(c),
            _ => Err(Error::invariant("character cell was not initialized")),
        }
    }
}

impl ValueGetters for RecordBuffer {
    fn is_null(&mut self, ordinal: usize) -> Result<bool> {
        self.check_ordinal(ordinal)?;
        Ok(matches!(self.cells[ordinal], Cell::Null))
    }

    fn get_variant_type(&mut self, ordinal: usize) -> Result<ColumnMetadata> {
        self.check_ordinal(ordinal)?;
        self.variant_types[ordinal]
            .clone()
            .ok_or_else(|| Error::invariant(format!("ordinal {} has no variant type", ordinal)))
    }

    fn get_bool(&mut self, ordinal: usize) -> Result<bool> {
        match self.stored(ordinal)? {
            SqlValue::Bool(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "bool")),
        }
    }

    fn get_u8(&mut self, ordinal: usize) -> Result<u8> {
        match self.stored(ordinal)? {
            SqlValue::U8(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "u8")),
        }
    }

    fn get_i16(&mut self, ordinal: usize) -> Result<i16> {
        match self.stored(ordinal)? {
            SqlValue::I16(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "i16")),
        }
    }

    fn get_i32(&mut self, ordinal: usize) -> Result<i32> {
        match self.stored(ordinal)? {
            SqlValue::I32(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "i32")),
        }
    }

    fn get_i64(&mut self, ordinal: usize) -> Result<i64> {
        match self.stored(ordinal)? {
            SqlValue::I64(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "i64")),
        }
    }

    fn get_f32(&mut self, ordinal: usize) -> Result<f32> {
        match self.stored(ordinal)? {
            SqlValue::F32(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "f32")),
        }
    }

    fn get_f64(&mut self, ordinal: usize) -> Result<f64> {
        match self.stored(ordinal)? {
            SqlValue::F64(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "f64")),
        }
    }

    fn get_decimal(&mut self, ordinal: usize) -> Result<SqlDecimal> {
        match self.stored(ordinal)? {
            SqlValue::Decimal(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "decimal")),
        }
    }

    fn get_datetime(&mut self, ordinal: usize) -> Result<NaiveDateTime> {
        match self.stored(ordinal)? {
            SqlValue::DateTime(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "datetime")),
        }
    }

    fn get_datetime_offset(&mut self, ordinal: usize) -> Result<DateTime<FixedOffset>> {
        match self.stored(ordinal)? {
            SqlValue::DateTimeOffset(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "datetimeoffset")),
        }
    }

    fn get_time_span(&mut self, ordinal: usize) -> Result<TimeDelta> {
        match self.stored(ordinal)? {
            SqlValue::TimeSpan(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "time span")),
        }
    }

    fn get_guid(&mut self, ordinal: usize) -> Result<Uuid> {
        match self.stored(ordinal)? {
            SqlValue::Guid(v) => Ok(*v),
            _ => Err(self.mismatch(ordinal, "guid")),
        }
    }

    fn get_string(&mut self, ordinal: usize) -> Result<String> {
        match self.stored(ordinal)? {
            SqlValue::String(s) | SqlValue::Xml(s) => Ok(s.clone()),
            SqlValue::Chars(c) => Ok(String::from_utf16_lossy(c)),
            _ => Err(self.mismatch(ordinal, "string")),
        }
    }

    fn get_bytes_length(&mut self, ordinal: usize) -> Result<i64> {
        match self.stored(ordinal)? {
            SqlValue::Bytes(b) | SqlValue::Udt(b) => Ok(b.len() as i64),
            SqlValue::String(s) | SqlValue::Xml(s) => Ok(s.encode_utf16().count() as i64 * 2),
            SqlValue::Chars(c) => Ok(c.len() as i64 * 2),
            _ => Err(self.mismatch(ordinal, "binary")),
        }
    }

    fn get_bytes(&mut self, ordinal: usize, field_offset: i64, buffer: &mut [u8]) -> Result<usize> {
        match self.stored(ordinal)? {
            SqlValue::Bytes(b) | SqlValue::Udt(b) => Ok(read_at(b, field_offset, buffer)),
            SqlValue::String(s) | SqlValue::Xml(s) => {
                Ok(read_at(&utf16_le_bytes(s.encode_utf16()), field_offset, buffer))
            }
            SqlValue::Chars(c) => {
                Ok(read_at(&utf16_le_bytes(c.iter().copied()), field_offset, buffer))
            }
            _ => Err(self.mismatch(ordinal, "binary")),
        }
    }

    fn get_chars_length(&mut self, ordinal: usize) -> Result<i64> {
        match self.stored(ordinal)? {
            SqlValue::String(s) | SqlValue::Xml(s) => Ok(s.encode_utf16().count() as i64),
            SqlValue::Chars(c) => Ok(c.len() as i64),
            _ => Err(self.mismatch(ordinal, "character")),
        }
    }

    fn get_chars(
        &mut self,
        ordinal: usize,
        field_offset: i64,
        buffer: &mut [u16],
    ) -> Result<usize> {
        match self.stored(ordinal)? {
            SqlValue::String(s) | SqlValue::Xml(s) => {
                let units: Vec<u16> = s.encode_utf16().collect();
                Ok(read_at(&units, field_offset, buffer))
            }
            SqlValue::Chars(c) => Ok(read_at(c, field_offset, buffer)),
            _ => Err(self.mismatch(ordinal, "character")),
        }
    }
}

impl ValueSetters for RecordBuffer {
    fn set_null(&mut self, ordinal: usize) -> Result<()> {
        self.check_ordinal(ordinal)?;
        self.cells[ordinal] = Cell::Null;
        Ok(())
    }

    fn set_variant_type(&mut self, ordinal: usize, meta: &ColumnMetadata) -> Result<()> {
        self.check_ordinal(ordinal)?;
        self.variant_types[ordinal] = Some(meta.clone());
        Ok(())
    }

    fn set_bool(&mut self, ordinal: usize, value: bool) -> Result<()> {
        self.put(ordinal, SqlValue::Bool(value))
    }

    fn set_u8(&mut self, ordinal: usize, value: u8) -> Result<()> {
        self.put(ordinal, SqlValue::U8(value))
    }

    fn set_i16(&mut self, ordinal: usize, value: i16) -> Result<()> {
        self.put(ordinal, SqlValue::I16(value))
    }

    fn set_i32(&mut self, ordinal: usize, value: i32) -> Result<()> {
        self.put(ordinal, SqlValue::I32(value))
    }

    fn set_i64(&mut self, ordinal: usize, value: i64) -> Result<()> {
        self.put(ordinal, SqlValue::I64(value))
    }

    fn set_f32(&mut self, ordinal: usize, value: f32) -> Result<()> {
        self.put(ordinal, SqlValue::F32(value))
    }

    fn set_f64(&mut self, ordinal: usize, value: f64) -> Result<()> {
        self.put(ordinal, SqlValue::F64(value))
    }

    fn set_decimal(&mut self, ordinal: usize, value: &SqlDecimal) -> Result<()> {
        self.put(ordinal, SqlValue::Decimal(*value))
    }

    fn set_datetime(&mut self, ordinal: usize, value: NaiveDateTime) -> Result<()> {
        self.put(ordinal, SqlValue::DateTime(value))
    }

    fn set_datetime_offset(&mut self, ordinal: usize, value: DateTime<FixedOffset>) -> Result<()> {
        self.put(ordinal, SqlValue::DateTimeOffset(value))
    }

    fn set_time_span(&mut self, ordinal: usize, value: TimeDelta) -> Result<()> {
        self.put(ordinal, SqlValue::TimeSpan(value))
    }

    fn set_guid(&mut self, ordinal: usize, value: Uuid) -> Result<()> {
        self.put(ordinal, SqlValue::Guid(value))
    }

    fn set_string(&mut self, ordinal: usize, value: &str) -> Result<()> {
        self.put(ordinal, SqlValue::String(value.to_string()))
    }

    // A non-empty write at offset 0 starts a new value.
    fn set_bytes(&mut self, ordinal: usize, field_offset: i64, buffer: &[u8]) -> Result<usize> {
        let data = self.bytes_mut(ordinal, field_offset == 0 && !buffer.is_empty())?;
        write_at(data, field_offset, buffer)
    }

    fn set_bytes_length(&mut self, ordinal: usize, length: i64) -> Result<()> {
        let data = self.bytes_mut(ordinal, false)?;
        data.truncate(length.max(0) as usize);
        Ok(())
    }

    fn set_chars(&mut self, ordinal: usize, field_offset: i64, buffer: &[u16]) -> Result<usize> {
        let data = self.chars_mut(ordinal, field_offset == 0 && !buffer.is_empty())?;
        write_at(data, field_offset, buffer)
    }

    fn set_chars_length(&mut self, ordinal: usize, length: i64) -> Result<()> {
        let data = self.chars_mut(ordinal, false)?;
        data.truncate(length.max(0) as usize);
        Ok(())
    }

    fn structured_setters(&mut self, ordinal: usize) -> Result<&mut dyn ValueSetters> {
        self.check_ordinal(ordinal)?;
        let meta = &self.metadata[ordinal];
        if !meta.is_multi_valued() {
            return Err(Error::invalid_cast(format!(
                "column '{}' of type {} is not a table type",
                meta.name(),
                meta.wire_type()
            )));
        }
        let fields = meta.fields().to_vec();
        let cell = &mut self.cells[ordinal];
        *cell = Cell::Table(TableBuffer::new(fields));
        match cell {
            Cell::Table(table) => Ok(table as &mut dyn ValueSetters),
            _ => Err(Error::invariant("table cell was not initialized")),
        }
    }
}

/// Rows of a structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBuffer {
    fields: Vec<ColumnMetadata>,
    rows: Vec<RecordBuffer>,
    finished: bool,
}

impl TableBuffer {
    pub fn new(fields: Vec<ColumnMetadata>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
            finished: false,
        }
    }

    pub fn fields(&self) -> &[ColumnMetadata] {
        &self.fields
    }

    pub fn rows(&self) -> &[RecordBuffer] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `end_elements` has been called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn current(&mut self) -> Result<&mut RecordBuffer> {
        if self.finished {
            return Err(Error::invariant("table value already ended"));
        }
        self.rows
            .last_mut()
            .ok_or_else(|| Error::invariant("no current row; new_element was not called"))
    }
}

impl ValueSetters for TableBuffer {
    fn set_null(&mut self, ordinal: usize) -> Result<()> {
        self.current()?.set_null(ordinal)
    }

    fn set_variant_type(&mut self, ordinal: usize, meta: &ColumnMetadata) -> Result<()> {
        self.current()?.set_variant_type(ordinal, meta)
    }

    fn set_bool(&mut self, ordinal: usize, value: bool) -> Result<()> {
        self.current()?.set_bool(ordinal, value)
    }

    fn set_u8(&mut self, ordinal: usize, value: u8) -> Result<()> {
        self.current()?.set_u8(ordinal, value)
    }

    fn set_i16(&mut self, ordinal: usize, value: i16) -> Result<()> {
        self.current()?.set_i16(ordinal, value)
    }

    fn set_i32(&mut self, ordinal: usize, value: i32) -> Result<()> {
        self.current()?.set_i32(ordinal, value)
    }

    fn set_i64(&mut self, ordinal: usize, value: i64) -> Result<()> {
        self.current()?.set_i64(ordinal, value)
    }

    fn set_f32(&mut self, ordinal: usize, value: f32) -> Result<()> {
        self.current()?.set_f32(ordinal, value)
    }

    fn set_f64(&mut self, ordinal: usize, value: f64) -> Result<()> {
        self.current()?.set_f64(ordinal, value)
    }

    fn set_decimal(&mut self, ordinal: usize, value: &SqlDecimal) -> Result<()> {
        self.current()?.set_decimal(ordinal, value)
    }

    fn set_datetime(&mut self, ordinal: usize, value: NaiveDateTime) -> Result<()> {
        self.current()?.set_datetime(ordinal, value)
    }

    fn set_datetime_offset(&mut self, ordinal: usize, value: DateTime<FixedOffset>) -> Result<()> {
        self.current()?.set_datetime_offset(ordinal, value)
    }

    fn set_time_span(&mut self, ordinal: usize, value: TimeDelta) -> Result<()> {
        self.current()?.set_time_span(ordinal, value)
    }

    fn set_guid(&mut self, ordinal: usize, value: Uuid) -> Result<()> {
        self.current()?.set_guid(ordinal, value)
    }

    fn set_string(&mut self, ordinal: usize, value: &str) -> Result<()> {
        self.current()?.set_string(ordinal, value)
    }

    fn set_bytes(&mut self, ordinal: usize, field_offset: i64, buffer: &[u8]) -> Result<usize> {
        self.current()?.set_bytes(ordinal, field_offset, buffer)
    }

    fn set_bytes_length(&mut self, ordinal: usize, length: i64) -> Result<()> {
        self.current()?.set_bytes_length(ordinal, length)
    }

    fn set_chars(&mut self, ordinal: usize, field_offset: i64, buffer: &[u16]) -> Result<usize> {
        self.current()?.set_chars(ordinal, field_offset, buffer)
    }

    fn set_chars_length(&mut self, ordinal: usize, length: i64) -> Result<()> {
        self.current()?.set_chars_length(ordinal, length)
    }

    fn new_element(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::invariant("new_element after end_elements"));
        }
        self.rows.push(RecordBuffer::new(self.fields.clone()));
        Ok(())
    }

    fn end_elements(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::WireType;

    fn int_meta(name: &str) -> ColumnMetadata {
        ColumnMetadata::new(name, WireType::Int).unwrap()
    }

    #[test]
    fn test_new_row_is_all_null() {
        let mut row = RecordBuffer::new(vec![int_meta("a"), int_meta("b")]);
        assert_eq!(row.len(), 2);
        assert!(row.is_null(0).unwrap());
        assert!(row.is_null(1).unwrap());
        assert_eq!(row.value(1), Some(&SqlValue::Null));
        assert!(matches!(row.get_i32(0), Err(Error::NullValue { ordinal: 0 })));
    }

    #[test]
    fn test_ordinal_out_of_range() {
        let mut row = RecordBuffer::new(vec![int_meta("a")]);
        match row.set_i32(3, 1) {
            Err(Error::InvalidArgument { argument, .. }) => assert_eq!(argument, "ordinal"),
            _ => panic!("Expected InvalidArgument error"),
        }
    }

    #[test]
    fn test_wrong_primitive_is_invariant() {
        let mut row = RecordBuffer::new(vec![int_meta("a")]);
        row.set_i32(0, 5).unwrap();
        assert!(matches!(row.get_i64(0), Err(Error::InternalInvariant { .. })));
    }

    #[test]
    fn test_bytes_grow_and_trim() {
        let mut row = RecordBuffer::new(vec![int_meta("a")]);
        assert_eq!(row.set_bytes(0, 0, &[1, 2]).unwrap(), 2);
        assert_eq!(row.set_bytes(0, 2, &[3, 4]).unwrap(), 2);
        assert_eq!(row.get_bytes_length(0).unwrap(), 4);
        assert!(row.set_bytes(0, 9, &[5]).is_err());

        row.set_bytes_length(0, 3).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(row.get_bytes(0, 1, &mut out).unwrap(), 2);
        assert_eq!(&out[..2], &[2, 3]);

        row.set_bytes(0, 0, &[9]).unwrap();
        assert_eq!(row.value(0), Some(&SqlValue::Bytes(vec![9])));
    }

    #[test]
    fn test_string_cells_read_as_chars_and_bytes() {
        let mut row = RecordBuffer::new(vec![int_meta("a")]);
        row.set_string(0, "ab").unwrap();
        assert_eq!(row.get_chars_length(0).unwrap(), 2);
        assert_eq!(row.get_bytes_length(0).unwrap(), 4);
        let mut out = [0u8; 4];
        row.get_bytes(0, 0, &mut out).unwrap();
        assert_eq!(out, [b'a', 0, b'b', 0]);
    }

    #[test]
    fn test_table_buffer_collects_rows() {
        let table_meta =
            ColumnMetadata::new_structured("t", "dbo.Ids", vec![int_meta("id")]).unwrap();
        let mut row = RecordBuffer::new(vec![table_meta]);
        {
            let rows = row.structured_setters(0).unwrap();
            assert!(rows.set_i32(0, 1).is_err());
            rows.new_element().unwrap();
            rows.set_i32(0, 1).unwrap();
            rows.new_element().unwrap();
            rows.set_null(0).unwrap();
            rows.end_elements().unwrap();
            assert!(rows.new_element().is_err());
        }
        let table = row.table(0).unwrap();
        assert!(table.is_finished());
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].value(0), Some(&SqlValue::I32(1)));
        assert_eq!(table.rows()[1].value(0), Some(&SqlValue::Null));
    }

    #[test]
    fn test_structured_setters_need_table_column() {
        let mut row = RecordBuffer::new(vec![int_meta("a")]);
        assert!(matches!(row.structured_setters(0), Err(Error::InvalidCast { .. })));
    }
}
