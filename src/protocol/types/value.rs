//! Runtime values and value kinds.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use uuid::Uuid;

use super::decimal::{SqlDecimal, SqlMoney};

/// A single runtime value moving between the application and the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Single UTF-16 code unit.
    Char(u16),
    String(String),
    /// UTF-16 character buffer.
    Chars(Vec<u16>),
    Bytes(Vec<u8>),
    Decimal(SqlDecimal),
    Money(SqlMoney),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    /// Elapsed time, as carried by the `time` wire type.
    TimeSpan(TimeDelta),
    TimeOfDay(NaiveTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Guid(Uuid),
    /// XML document text.
    Xml(String),
    /// Serialized user-defined type value.
    Udt(Vec<u8>),
}

impl SqlValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Kind of this value.
    pub fn kind(&self) -> ValueKind {
        ValueKind::of(self)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::String(s) | SqlValue::Xml(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Bytes(b) | SqlValue::Udt(b) => Some(b),
            _ => None,
        }
    }

    /// Try to widen an integer value to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            SqlValue::U8(v) => Some(*v as i64),
            SqlValue::I16(v) => Some(*v as i64),
            SqlValue::I32(v) => Some(*v as i64),
            SqlValue::I64(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{}", v),
            SqlValue::U8(v) => write!(f, "{}", v),
            SqlValue::I8(v) => write!(f, "{}", v),
            SqlValue::I16(v) => write!(f, "{}", v),
            SqlValue::U16(v) => write!(f, "{}", v),
            SqlValue::I32(v) => write!(f, "{}", v),
            SqlValue::U32(v) => write!(f, "{}", v),
            SqlValue::I64(v) => write!(f, "{}", v),
            SqlValue::U64(v) => write!(f, "{}", v),
            SqlValue::F32(v) => write!(f, "{}", v),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Char(c) => write!(f, "{}", String::from_utf16_lossy(&[*c])),
            SqlValue::String(s) | SqlValue::Xml(s) => write!(f, "{}", s),
            SqlValue::Chars(c) => write!(f, "{}", String::from_utf16_lossy(c)),
            SqlValue::Bytes(b) => write!(f, "<BINARY: {} bytes>", b.len()),
            SqlValue::Udt(b) => write!(f, "<UDT: {} bytes>", b.len()),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Money(m) => write!(f, "{}", m),
            SqlValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::TimeSpan(t) => write!(f, "{}", t),
            SqlValue::TimeOfDay(t) => write!(f, "{}", t),
            SqlValue::DateTimeOffset(dto) => write!(f, "{}", dto.to_rfc3339()),
            SqlValue::Guid(g) => write!(f, "{}", g),
        }
    }
}

/// Application-side value kind.
///
/// Rows of the compatibility matrices. Stream and structured kinds have
/// no `SqlValue` form; they are produced by the callers that hold such
/// sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Boolean = 0,
    Byte,
    Char,
    DateTime,
    DbNull,
    Decimal,
    Double,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    UInt16,
    UInt32,
    UInt64,
    /// Deserialized user-defined type instance.
    Object,
    ByteArray,
    CharArray,
    Guid,
    Money,
    Xml,
    DataTable,
    DataReader,
    RecordSequence,
    TimeSpan,
    DateTimeOffset,
    Date,
    TimeOfDay,
    ByteStream,
    TextStream,
    XmlStream,
}

impl ValueKind {
    /// Number of kinds.
    pub const COUNT: usize = 32;

    /// Classify a runtime value.
    pub fn of(value: &SqlValue) -> ValueKind {
        match value {
            SqlValue::Null => ValueKind::DbNull,
            SqlValue::Bool(_) => ValueKind::Boolean,
            SqlValue::U8(_) => ValueKind::Byte,
            SqlValue::I8(_) => ValueKind::SByte,
            SqlValue::I16(_) => ValueKind::Int16,
            SqlValue::U16(_) => ValueKind::UInt16,
            SqlValue::I32(_) => ValueKind::Int32,
            SqlValue::U32(_) => ValueKind::UInt32,
            SqlValue::I64(_) => ValueKind::Int64,
            SqlValue::U64(_) => ValueKind::UInt64,
            SqlValue::F32(_) => ValueKind::Single,
            SqlValue::F64(_) => ValueKind::Double,
            SqlValue::Char(_) => ValueKind::Char,
            SqlValue::String(_) => ValueKind::String,
            SqlValue::Chars(_) => ValueKind::CharArray,
            SqlValue::Bytes(_) => ValueKind::ByteArray,
            SqlValue::Decimal(_) => ValueKind::Decimal,
            SqlValue::Money(_) => ValueKind::Money,
            SqlValue::DateTime(_) => ValueKind::DateTime,
            SqlValue::Date(_) => ValueKind::Date,
            SqlValue::TimeSpan(_) => ValueKind::TimeSpan,
            SqlValue::TimeOfDay(_) => ValueKind::TimeOfDay,
            SqlValue::DateTimeOffset(_) => ValueKind::DateTimeOffset,
            SqlValue::Guid(_) => ValueKind::Guid,
            SqlValue::Xml(_) => ValueKind::Xml,
            SqlValue::Udt(_) => ValueKind::Object,
        }
    }

    /// Short name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Boolean => "bool",
            ValueKind::Byte => "u8",
            ValueKind::Char => "char",
            ValueKind::DateTime => "datetime",
            ValueKind::DbNull => "null",
            ValueKind::Decimal => "decimal",
            ValueKind::Double => "f64",
            ValueKind::Int16 => "i16",
            ValueKind::Int32 => "i32",
            ValueKind::Int64 => "i64",
            ValueKind::SByte => "i8",
            ValueKind::Single => "f32",
            ValueKind::String => "string",
            ValueKind::UInt16 => "u16",
            ValueKind::UInt32 => "u32",
            ValueKind::UInt64 => "u64",
            ValueKind::Object => "udt object",
            ValueKind::ByteArray => "byte array",
            ValueKind::CharArray => "char array",
            ValueKind::Guid => "guid",
            ValueKind::Money => "money",
            ValueKind::Xml => "xml",
            ValueKind::DataTable => "data table",
            ValueKind::DataReader => "data reader",
            ValueKind::RecordSequence => "record sequence",
            ValueKind::TimeSpan => "time span",
            ValueKind::DateTimeOffset => "datetimeoffset",
            ValueKind::Date => "date",
            ValueKind::TimeOfDay => "time of day",
            ValueKind::ByteStream => "byte stream",
            ValueKind::TextStream => "text stream",
            ValueKind::XmlStream => "xml stream",
        }
    }

    /// Table-shaped kinds, only meaningful against multi-valued columns.
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            ValueKind::DataTable | ValueKind::DataReader | ValueKind::RecordSequence
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_value_null() {
        let val = SqlValue::Null;
        assert!(val.is_null());
        assert_eq!(val.kind(), ValueKind::DbNull);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_sql_value_kinds() {
        assert_eq!(SqlValue::I32(1).kind(), ValueKind::Int32);
        assert_eq!(SqlValue::Bytes(vec![1]).kind(), ValueKind::ByteArray);
        assert_eq!(SqlValue::Udt(vec![1]).kind(), ValueKind::Object);
        assert_eq!(
            SqlValue::Money(SqlMoney::from_internal(10_000)).kind(),
            ValueKind::Money
        );
    }

    #[test]
    fn test_sql_value_accessors() {
        let val = SqlValue::String("hello".to_string());
        assert_eq!(val.as_str(), Some("hello"));
        assert_eq!(val.as_bytes(), None);
        assert_eq!(SqlValue::I16(-3).to_i64(), Some(-3));
        assert_eq!(SqlValue::F64(1.0).to_i64(), None);
    }

    #[test]
    fn test_structured_kinds() {
        assert!(ValueKind::DataTable.is_structured());
        assert!(ValueKind::RecordSequence.is_structured());
        assert!(!ValueKind::ByteArray.is_structured());
    }
}
