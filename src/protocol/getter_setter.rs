//! Positional value primitives.
//!
//! A transport (or an in-memory [`RecordBuffer`](crate::RecordBuffer))
//! exposes its current row through these traits. Every method is keyed by
//! a zero-based ordinal and performs no type checking of its own; the
//! accessor functions in [`accessor`](crate::protocol::accessor) decide
//! which primitive is valid for a column before calling it.
//!
//! All methods default to [`Error::Unsupported`] so a transport only
//! implements the primitives its wire format carries.
//!
//! Money and small money travel through `get_i64`/`set_i64` as
//! ten-thousandths. Date columns travel as a date-time at midnight.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::types::{ColumnMetadata, SqlDecimal};

fn unsupported<T>(operation: &'static str) -> Result<T> {
    Err(Error::Unsupported { operation })
}

/// Read side of the positional primitive.
///
/// Access is sequential: a chunked read on one ordinal must be finished
/// before the next ordinal is touched, hence `&mut self` throughout.
pub trait ValueGetters {
    fn is_null(&mut self, ordinal: usize) -> Result<bool>;

    /// Concrete metadata of the value stored in a variant column.
    fn get_variant_type(&mut self, _ordinal: usize) -> Result<ColumnMetadata> {
        unsupported("get_variant_type")
    }

    fn get_bool(&mut self, _ordinal: usize) -> Result<bool> {
        unsupported("get_bool")
    }

    fn get_u8(&mut self, _ordinal: usize) -> Result<u8> {
        unsupported("get_u8")
    }

    fn get_i16(&mut self, _ordinal: usize) -> Result<i16> {
        unsupported("get_i16")
    }

    fn get_i32(&mut self, _ordinal: usize) -> Result<i32> {
        unsupported("get_i32")
    }

    fn get_i64(&mut self, _ordinal: usize) -> Result<i64> {
        unsupported("get_i64")
    }

    fn get_f32(&mut self, _ordinal: usize) -> Result<f32> {
        unsupported("get_f32")
    }

    fn get_f64(&mut self, _ordinal: usize) -> Result<f64> {
        unsupported("get_f64")
    }

    fn get_decimal(&mut self, _ordinal: usize) -> Result<SqlDecimal> {
        unsupported("get_decimal")
    }

    fn get_datetime(&mut self, _ordinal: usize) -> Result<NaiveDateTime> {
        unsupported("get_datetime")
    }

    fn get_datetime_offset(&mut self, _ordinal: usize) -> Result<DateTime<FixedOffset>> {
        unsupported("get_datetime_offset")
    }

    fn get_time_span(&mut self, _ordinal: usize) -> Result<TimeDelta> {
        unsupported("get_time_span")
    }

    fn get_guid(&mut self, _ordinal: usize) -> Result<Uuid> {
        unsupported("get_guid")
    }

    fn get_string(&mut self, _ordinal: usize) -> Result<String> {
        unsupported("get_string")
    }

    /// Total length in bytes of the value, or -1 if unknown.
    fn get_bytes_length(&mut self, _ordinal: usize) -> Result<i64> {
        unsupported("get_bytes_length")
    }

    /// Copy bytes starting at `field_offset` into `buffer`, returning the
    /// number copied.
    fn get_bytes(
        &mut self,
        _ordinal: usize,
        _field_offset: i64,
        _buffer: &mut [u8],
    ) -> Result<usize> {
        unsupported("get_bytes")
    }

    /// Total length in UTF-16 units of the value, or -1 if unknown.
    fn get_chars_length(&mut self, _ordinal: usize) -> Result<i64> {
        unsupported("get_chars_length")
    }

    fn get_chars(
        &mut self,
        _ordinal: usize,
        _field_offset: i64,
        _buffer: &mut [u16],
    ) -> Result<usize> {
        unsupported("get_chars")
    }
}

/// Write side of the positional primitive.
pub trait ValueSetters {
    fn set_null(&mut self, ordinal: usize) -> Result<()>;

    /// Declare the concrete metadata of the next value written to a
    /// variant column.
    fn set_variant_type(&mut self, _ordinal: usize, _meta: &ColumnMetadata) -> Result<()> {
        unsupported("set_variant_type")
    }

    fn set_bool(&mut self, _ordinal: usize, _value: bool) -> Result<()> {
        unsupported("set_bool")
    }

    fn set_u8(&mut self, _ordinal: usize, _value: u8) -> Result<()> {
        unsupported("set_u8")
    }

    fn set_i16(&mut self, _ordinal: usize, _value: i16) -> Result<()> {
        unsupported("set_i16")
    }

    fn set_i32(&mut self, _ordinal: usize, _value: i32) -> Result<()> {
        unsupported("set_i32")
    }

    fn set_i64(&mut self, _ordinal: usize, _value: i64) -> Result<()> {
        unsupported("set_i64")
    }

    fn set_f32(&mut self, _ordinal: usize, _value: f32) -> Result<()> {
        unsupported("set_f32")
    }

    fn set_f64(&mut self, _ordinal: usize, _value: f64) -> Result<()> {
        unsupported("set_f64")
    }

    fn set_decimal(&mut self, _ordinal: usize, _value: &SqlDecimal) -> Result<()> {
        unsupported("set_decimal")
    }

    fn set_datetime(&mut self, _ordinal: usize, _value: NaiveDateTime) -> Result<()> {
        unsupported("set_datetime")
    }

    fn set_datetime_offset(
        &mut self,
        _ordinal: usize,
        _value: DateTime<FixedOffset>,
    ) -> Result<()> {
        unsupported("set_datetime_offset")
    }

    fn set_time_span(&mut self, _ordinal: usize, _value: TimeDelta) -> Result<()> {
        unsupported("set_time_span")
    }

    fn set_guid(&mut self, _ordinal: usize, _value: Uuid) -> Result<()> {
        unsupported("set_guid")
    }

    fn set_string(&mut self, _ordinal: usize, _value: &str) -> Result<()> {
        unsupported("set_string")
    }

    /// Write `buffer` at `field_offset`, returning the number of bytes
    /// written.
    fn set_bytes(&mut self, _ordinal: usize, _field_offset: i64, _buffer: &[u8]) -> Result<usize> {
        unsupported("set_bytes")
    }

    /// Trim the value to at most `length` bytes.
    fn set_bytes_length(&mut self, _ordinal: usize, _length: i64) -> Result<()> {
        unsupported("set_bytes_length")
    }

    fn set_chars(&mut self, _ordinal: usize, _field_offset: i64, _buffer: &[u16]) -> Result<usize> {
        unsupported("set_chars")
    }

    fn set_chars_length(&mut self, _ordinal: usize, _length: i64) -> Result<()> {
        unsupported("set_chars_length")
    }

    /// Setters for the rows of a structured (table-valued) column.
    fn structured_setters(&mut self, _ordinal: usize) -> Result<&mut dyn ValueSetters> {
        unsupported("structured_setters")
    }

    /// Start a new row. Only valid on structured setters.
    fn new_element(&mut self) -> Result<()> {
        unsupported("new_element")
    }

    /// Mark the end of the rows. Only valid on structured setters.
    fn end_elements(&mut self) -> Result<()> {
        unsupported("end_elements")
    }
}

/// A row that can be both read and written.
pub trait TypedGetterSetter: ValueGetters + ValueSetters {}

impl<T: ValueGetters + ValueSetters + ?Sized> TypedGetterSetter for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullOnly;

    impl ValueGetters for NullOnly {
        fn is_null(&mut self, _ordinal: usize) -> Result<bool> {
            Ok(true)
        }
    }

    impl ValueSetters for NullOnly {
        fn set_null(&mut self, _ordinal: usize) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_defaults_are_unsupported() {
        let mut row = NullOnly;
        assert!(row.is_null(0).unwrap());
        match row.get_i32(0) {
            Err(Error::Unsupported { operation }) => assert_eq!(operation, "get_i32"),
            _ => panic!("Expected Unsupported error"),
        }
        assert!(matches!(
            row.new_element(),
            Err(Error::Unsupported { operation: "new_element" })
        ));
        assert!(row.structured_setters(0).is_err());
    }

    #[test]
    fn test_typed_getter_setter_blanket() {
        fn takes_row(row: &mut dyn TypedGetterSetter) -> Result<bool> {
            row.set_null(0)?;
            row.is_null(0)
        }
        assert!(takes_row(&mut NullOnly).unwrap());
    }
}
