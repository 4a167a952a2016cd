//! Column and parameter metadata.
//!
//! A [`ColumnMetadata`] describes the declared shape of one column of a
//! structured value or one parameter: wire type, length, precision, scale,
//! collation hints and table-type column properties. All validation happens
//! at construction; a built descriptor is immutable.
//!
//! The same descriptor knows how to coerce a runtime value to exactly its
//! declared shape ([`ColumnMetadata::adjust`]) and how to derive the
//! smallest standard descriptor able to hold a value
//! ([`ColumnMetadata::infer_from_value`]).

use std::fmt;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike,
};

use crate::error::{Error, Result};
use crate::protocol::constants::{
    decimal_max_length, DECIMAL_MAX_PRECISION, DECIMAL_MAX_SCALE, MAX_BINARY_LENGTH,
    MAX_NAME_LENGTH, MAX_TIME_SCALE, MAX_UNICODE_CHARS, NANOS_PER_TICK, TICKS_PER_DAY,
    TICKS_PER_SECOND, UNIT_TICKS_FROM_SCALE, UNLIMITED_MAX_LENGTH, VAR_TIME_LEN_OFFSET_FROM_SCALE,
};

use super::decimal::{SqlDecimal, SqlMoney};
use super::value::{SqlValue, ValueKind};
use super::wire_type::{CompareOptions, WireType};

/// Sort order of a table-type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Unspecified,
    Ascending,
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Unspecified => write!(f, "UNSPECIFIED"),
            SortOrder::Ascending => write!(f, "ASC"),
            SortOrder::Descending => write!(f, "DESC"),
        }
    }
}

/// Sort ordinal meaning "not part of the sort key".
pub const DEFAULT_SORT_ORDINAL: i32 = -1;

/// XML schema collection bound to an xml column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlSchemaCollection {
    pub database: Option<String>,
    pub owning_schema: Option<String>,
    pub name: Option<String>,
}

/// Reference to a user-defined type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdtType {
    /// Fully qualified type name.
    pub name: String,
    /// Largest serialized size in bytes; -1 means unlimited.
    pub max_byte_size: i64,
}

impl UdtType {
    pub fn new(name: impl Into<String>, max_byte_size: i64) -> Self {
        Self {
            name: name.into(),
            max_byte_size,
        }
    }
}

/// Metadata for one column or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    name: String,
    wire_type: WireType,
    max_length: i64,
    precision: u8,
    scale: u8,
    locale_id: u32,
    compare_options: CompareOptions,
    partial_length: bool,
    xml_schema: Option<XmlSchemaCollection>,
    udt_type: Option<UdtType>,
    server_type_name: Option<String>,
    fields: Vec<ColumnMetadata>,
    use_server_default: bool,
    is_unique_key: bool,
    sort_order: SortOrder,
    sort_ordinal: i32,
}

impl ColumnMetadata {
    fn with_defaults(name: impl Into<String>, wire_type: WireType) -> Result<Self> {
        let name = name.into();
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::invalid_argument(
                "name",
                format!("longer than {} characters", MAX_NAME_LENGTH),
            ));
        }
        let info = wire_type.info();
        Ok(Self {
            name,
            wire_type,
            max_length: info.max_length,
            precision: info.precision,
            scale: info.scale,
            locale_id: 0,
            compare_options: info.compare_options,
            partial_length: info.is_partial_length,
            xml_schema: None,
            udt_type: None,
            server_type_name: None,
            fields: Vec::new(),
            use_server_default: false,
            is_unique_key: false,
            sort_order: SortOrder::Unspecified,
            sort_ordinal: DEFAULT_SORT_ORDINAL,
        })
    }

    /// Create metadata for a type whose shape is fully defined by the type.
    ///
    /// Decimal and the extended time family take their default precision
    /// and scale; use [`ColumnMetadata::new_precise`] to override them.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Result<Self> {
        match wire_type {
            WireType::BigInt
            | WireType::Bit
            | WireType::DateTime
            | WireType::Date
            | WireType::DateTime2
            | WireType::DateTimeOffset
            | WireType::Decimal
            | WireType::Float
            | WireType::Image
            | WireType::Int
            | WireType::Money
            | WireType::NText
            | WireType::Real
            | WireType::SmallDateTime
            | WireType::SmallInt
            | WireType::SmallMoney
            | WireType::Text
            | WireType::Time
            | WireType::Timestamp
            | WireType::TinyInt
            | WireType::UniqueIdentifier
            | WireType::Variant
            | WireType::Xml => Self::with_defaults(name, wire_type),
            _ => Err(Error::InvalidTypeForConstructor {
                wire_type,
                constructor: "scalar",
            }),
        }
    }

    /// Create metadata for a length-declared character or binary type.
    pub fn new_sized(
        name: impl Into<String>,
        wire_type: WireType,
        max_length: i64,
    ) -> Result<Self> {
        validate_max_length(wire_type, max_length, "sized")?;
        let mut meta = Self::with_defaults(name, wire_type)?;
        meta.max_length = max_length;
        Ok(meta)
    }

    /// Create metadata for a character type with explicit collation.
    pub fn new_string(
        name: impl Into<String>,
        wire_type: WireType,
        max_length: i64,
        locale_id: u32,
        compare_options: CompareOptions,
    ) -> Result<Self> {
        if !wire_type.is_character() {
            return Err(Error::InvalidTypeForConstructor {
                wire_type,
                constructor: "string",
            });
        }
        validate_max_length(wire_type, max_length, "string")?;
        if !compare_options.is_valid() {
            return Err(Error::invalid_argument(
                "compare_options",
                format!("invalid flag combination {:#x}", compare_options.bits()),
            ));
        }
        let mut meta = Self::with_defaults(name, wire_type)?;
        meta.max_length = max_length;
        meta.locale_id = locale_id;
        meta.compare_options = compare_options;
        Ok(meta)
    }

    /// Create metadata for decimal or the extended time family.
    pub fn new_precise(
        name: impl Into<String>,
        wire_type: WireType,
        precision: u8,
        scale: u8,
    ) -> Result<Self> {
        let max_length = match wire_type {
            WireType::Decimal => {
                if precision == 0 || precision > DECIMAL_MAX_PRECISION || scale > precision {
                    return Err(Error::invalid_argument(
                        "precision",
                        format!("decimal({}, {}) is out of range", precision, scale),
                    ));
                }
                if scale > DECIMAL_MAX_SCALE {
                    return Err(Error::invalid_argument(
                        "scale",
                        format!("{} exceeds {}", scale, DECIMAL_MAX_SCALE),
                    ));
                }
                decimal_max_length(precision)
            }
            WireType::Time | WireType::DateTime2 | WireType::DateTimeOffset => {
                if scale > MAX_TIME_SCALE {
                    return Err(Error::invalid_argument(
                        "scale",
                        format!("time scale {} exceeds {}", scale, MAX_TIME_SCALE),
                    ));
                }
                wire_type.info().max_length - VAR_TIME_LEN_OFFSET_FROM_SCALE[scale as usize]
            }
            _ => {
                return Err(Error::InvalidTypeForConstructor {
                    wire_type,
                    constructor: "precision/scale",
                })
            }
        };
        let mut meta = Self::with_defaults(name, wire_type)?;
        meta.precision = precision;
        meta.scale = scale;
        meta.max_length = max_length;
        Ok(meta)
    }

    /// Create metadata for a user-defined type.
    pub fn new_udt(
        name: impl Into<String>,
        udt_type: UdtType,
        server_type_name: Option<String>,
    ) -> Result<Self> {
        if udt_type.name.is_empty() {
            return Err(Error::invalid_argument("udt_type", "type name is required"));
        }
        let mut meta = Self::with_defaults(name, WireType::Udt)?;
        meta.max_length = udt_type.max_byte_size;
        meta.udt_type = Some(udt_type);
        meta.server_type_name = server_type_name;
        Ok(meta)
    }

    /// Create metadata for an xml column, optionally bound to a schema collection.
    pub fn new_xml(name: impl Into<String>, schema: Option<XmlSchemaCollection>) -> Result<Self> {
        if let Some(schema) = &schema {
            if (schema.database.is_some() || schema.owning_schema.is_some())
                && schema.name.is_none()
            {
                return Err(Error::invalid_argument(
                    "xml_schema",
                    "collection name is required when database or owning schema is given",
                ));
            }
        }
        let mut meta = Self::with_defaults(name, WireType::Xml)?;
        meta.xml_schema = schema;
        Ok(meta)
    }

    /// Create metadata for a structured (table-valued) column.
    pub fn new_structured(
        name: impl Into<String>,
        server_type_name: impl Into<String>,
        fields: Vec<ColumnMetadata>,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::invalid_argument("fields", "a table type needs at least one column"));
        }
        if let Some(nested) = fields.iter().find(|f| f.is_multi_valued()) {
            return Err(Error::invalid_argument(
                "fields",
                format!("column '{}' is itself a table type", nested.name),
            ));
        }
        let mut meta = Self::with_defaults(name, WireType::Structured)?;
        meta.server_type_name = Some(server_type_name.into());
        meta.fields = fields;
        Ok(meta)
    }

    /// Set the table-type sort key for this column.
    pub fn with_sort(mut self, sort_order: SortOrder, sort_ordinal: i32) -> Result<Self> {
        if sort_ordinal < DEFAULT_SORT_ORDINAL {
            return Err(Error::invalid_argument(
                "sort_ordinal",
                format!("{} is negative", sort_ordinal),
            ));
        }
        if (sort_order == SortOrder::Unspecified) != (sort_ordinal == DEFAULT_SORT_ORDINAL) {
            return Err(Error::invalid_argument(
                "sort_order",
                format!(
                    "sort order {} and ordinal {} must both be specified or both omitted",
                    sort_order, sort_ordinal
                ),
            ));
        }
        self.sort_order = sort_order;
        self.sort_ordinal = sort_ordinal;
        Ok(self)
    }

    /// Mark the column as taking the server default.
    pub fn with_server_default(mut self, use_server_default: bool) -> Self {
        self.use_server_default = use_server_default;
        self
    }

    /// Mark the column as part of the unique key.
    pub fn with_unique_key(mut self, is_unique_key: bool) -> Self {
        self.is_unique_key = is_unique_key;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    /// Declared max length; -1 means unlimited.
    pub fn max_length(&self) -> i64 {
        self.max_length
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn locale_id(&self) -> u32 {
        self.locale_id
    }

    pub fn compare_options(&self) -> CompareOptions {
        self.compare_options
    }

    pub fn is_partial_length(&self) -> bool {
        self.partial_length
    }

    pub fn xml_schema(&self) -> Option<&XmlSchemaCollection> {
        self.xml_schema.as_ref()
    }

    pub fn udt_type(&self) -> Option<&UdtType> {
        self.udt_type.as_ref()
    }

    pub fn server_type_name(&self) -> Option<&str> {
        self.server_type_name.as_deref()
    }

    /// Column metadata of a structured type.
    pub fn fields(&self) -> &[ColumnMetadata] {
        &self.fields
    }

    pub fn use_server_default(&self) -> bool {
        self.use_server_default
    }

    pub fn is_unique_key(&self) -> bool {
        self.is_unique_key
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn sort_ordinal(&self) -> i32 {
        self.sort_ordinal
    }

    /// Whether values are row sets rather than scalars.
    pub fn is_multi_valued(&self) -> bool {
        self.wire_type == WireType::Structured
    }

    /// Whether the declared max length is the unlimited sentinel.
    pub fn is_unlimited(&self) -> bool {
        self.max_length == UNLIMITED_MAX_LENGTH
    }

    /// Whether values must move in chunks.
    pub fn is_lob(&self) -> bool {
        self.wire_type.is_lob()
            || self.partial_length
            || (self.is_unlimited()
                && matches!(
                    self.wire_type,
                    WireType::VarChar | WireType::NVarChar | WireType::VarBinary | WireType::Udt
                ))
    }

    /// Max length in bytes, doubling character and xml lengths.
    pub fn max_byte_length(&self) -> i64 {
        if self.is_unlimited() {
            return UNLIMITED_MAX_LENGTH;
        }
        if self.wire_type.is_character() || self.wire_type == WireType::Xml {
            self.max_length.saturating_mul(2)
        } else {
            self.max_length
        }
    }

    /// Whether two descriptors describe the same value shape.
    ///
    /// Names and table-type column hints are not compared; nested
    /// structured types are never compatible.
    pub fn is_compatible(&self, other: &ColumnMetadata) -> bool {
        self.wire_type == other.wire_type
            && self.max_length == other.max_length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.compare_options == other.compare_options
            && self.locale_id == other.locale_id
            && self.udt_type.as_ref().map(|u| &u.name) == other.udt_type.as_ref().map(|u| &u.name)
            && !self.is_multi_valued()
    }

    fn type_mismatch(&self, kind: ValueKind) -> Error {
        Error::invalid_value(
            self.wire_type,
            format!("column '{}' cannot hold a {} value", self.name, kind),
        )
    }

    fn expect_type(&self, allowed: &[WireType], kind: ValueKind) -> Result<()> {
        if allowed.contains(&self.wire_type) {
            Ok(())
        } else {
            Err(self.type_mismatch(kind))
        }
    }

    /// Coerce a value to exactly this column's declared shape.
    ///
    /// Null passes through unchanged. Kinds with no wire representation
    /// fail with `InvalidDataType`; kinds the column cannot hold fail with
    /// `InvalidMetadataValue`.
    pub fn adjust(&self, value: SqlValue) -> Result<SqlValue> {
        let kind = value.kind();
        let adjusted = match value {
            SqlValue::Null => SqlValue::Null,
            SqlValue::Bool(v) => {
                self.expect_type(&[WireType::Bit], kind)?;
                SqlValue::Bool(v)
            }
            SqlValue::U8(v) => {
                self.expect_type(&[WireType::TinyInt], kind)?;
                SqlValue::U8(v)
            }
            SqlValue::I16(v) => {
                self.expect_type(&[WireType::SmallInt], kind)?;
                SqlValue::I16(v)
            }
            SqlValue::I32(v) => {
                self.expect_type(&[WireType::Int], kind)?;
                SqlValue::I32(v)
            }
            SqlValue::I64(v) => {
                self.expect_type(&[WireType::BigInt], kind)?;
                SqlValue::I64(v)
            }
            SqlValue::F32(v) => {
                self.expect_type(&[WireType::Real], kind)?;
                SqlValue::F32(v)
            }
            SqlValue::F64(v) => {
                self.expect_type(&[WireType::Float], kind)?;
                SqlValue::F64(v)
            }
            SqlValue::Guid(v) => {
                self.expect_type(&[WireType::UniqueIdentifier], kind)?;
                SqlValue::Guid(v)
            }
            SqlValue::I8(_) | SqlValue::U16(_) | SqlValue::U32(_) | SqlValue::U64(_) => {
                return Err(Error::InvalidDataType { kind: kind.name() })
            }
            SqlValue::Char(c) => SqlValue::Char(self.adjust_char(c)?),
            SqlValue::String(s) => SqlValue::String(self.adjust_string(&s)?),
            SqlValue::Chars(c) => SqlValue::Chars(self.adjust_chars(c)?),
            SqlValue::Bytes(b) => SqlValue::Bytes(self.adjust_bytes(b)?),
            SqlValue::Decimal(d) => SqlValue::Decimal(self.adjust_decimal(&d)?),
            SqlValue::Money(m) => SqlValue::Money(self.adjust_money(m)?),
            SqlValue::DateTime(dt) => SqlValue::DateTime(self.adjust_datetime(dt)?),
            SqlValue::Date(d) => {
                let midnight = d.and_time(NaiveTime::MIN);
                SqlValue::Date(self.adjust_datetime(midnight)?.date())
            }
            SqlValue::TimeSpan(t) => SqlValue::TimeSpan(self.adjust_time_span(t)?),
            SqlValue::TimeOfDay(t) => {
                self.expect_type(&[WireType::Time], kind)?;
                SqlValue::TimeOfDay(truncate_time(t, self.scale))
            }
            SqlValue::DateTimeOffset(dto) => {
                SqlValue::DateTimeOffset(self.adjust_datetime_offset(dto)?)
            }
            SqlValue::Xml(x) => {
                self.expect_type(&[WireType::Xml], kind)?;
                SqlValue::Xml(x)
            }
            SqlValue::Udt(b) => {
                self.expect_type(&[WireType::Udt], kind)?;
                if self.max_length >= 0 && b.len() as i64 > self.max_length {
                    return Err(Error::invalid_value(
                        WireType::Udt,
                        format!("{} bytes exceed max length {}", b.len(), self.max_length),
                    ));
                }
                SqlValue::Udt(b)
            }
        };
        Ok(adjusted)
    }

    /// Check a single character against the declared length.
    pub fn adjust_char(&self, value: u16) -> Result<u16> {
        if self.wire_type.is_fixed_character() {
            if self.max_length != 1 {
                return Err(self.type_mismatch(ValueKind::Char));
            }
        } else if !self.wire_type.is_character() || (self.max_length < 1 && !self.is_unlimited()) {
            return Err(self.type_mismatch(ValueKind::Char));
        }
        Ok(value)
    }

    /// Pad fixed character types with spaces and truncate past max length.
    ///
    /// Lengths are counted in UTF-16 code units.
    pub fn adjust_string(&self, value: &str) -> Result<String> {
        let units: Vec<u16> = value.encode_utf16().collect();
        let adjusted = self.adjust_chars(units)?;
        Ok(String::from_utf16_lossy(&adjusted))
    }

    /// Character-buffer form of [`ColumnMetadata::adjust_string`].
    pub fn adjust_chars(&self, mut value: Vec<u16>) -> Result<Vec<u16>> {
        if !self.wire_type.is_character() {
            return Err(self.type_mismatch(ValueKind::CharArray));
        }
        let original = value.len();
        if self.wire_type.is_fixed_character() && (value.len() as i64) < self.max_length {
            value.resize(self.max_length as usize, b' ' as u16);
        }
        if !self.is_unlimited() && value.len() as i64 > self.max_length {
            value.truncate(self.max_length as usize);
            tracing::warn!(
                column = %self.name,
                from = original,
                to = value.len(),
                "truncated character value to declared length"
            );
        }
        Ok(value)
    }

    /// Zero-pad fixed binary types and truncate past max length.
    pub fn adjust_bytes(&self, mut value: Vec<u8>) -> Result<Vec<u8>> {
        match self.wire_type {
            WireType::Binary | WireType::Timestamp => {
                if (value.len() as i64) < self.max_length {
                    value.resize(self.max_length as usize, 0);
                }
            }
            WireType::VarBinary | WireType::Image => {}
            _ => return Err(self.type_mismatch(ValueKind::ByteArray)),
        }
        if !self.is_unlimited() && value.len() as i64 > self.max_length {
            tracing::warn!(
                column = %self.name,
                from = value.len(),
                to = self.max_length,
                "truncated binary value to declared length"
            );
            value.truncate(self.max_length as usize);
        }
        Ok(value)
    }

    /// Rescale a decimal to the declared precision and scale, or range
    /// check it for money columns.
    pub fn adjust_decimal(&self, value: &SqlDecimal) -> Result<SqlDecimal> {
        match self.wire_type {
            WireType::Decimal => {
                if value.precision() == self.precision && value.scale() == self.scale {
                    return Ok(*value);
                }
                let rescaled = if value.scale() != self.scale {
                    value.adjust_scale(self.scale, false)?
                } else {
                    *value
                };
                rescaled.convert_to_prec_scale(self.precision, self.scale)
            }
            WireType::Money | WireType::SmallMoney => {
                self.adjust_money(SqlMoney::from_decimal(value)?)?;
                Ok(*value)
            }
            _ => Err(self.type_mismatch(ValueKind::Decimal)),
        }
    }

    /// Range check a money value.
    pub fn adjust_money(&self, value: SqlMoney) -> Result<SqlMoney> {
        match self.wire_type {
            WireType::Money => Ok(value),
            WireType::SmallMoney if value.fits_small_money() => Ok(value),
            WireType::SmallMoney => Err(Error::invalid_value(
                WireType::SmallMoney,
                format!("{} is outside the smallmoney range", value),
            )),
            _ => Err(self.type_mismatch(ValueKind::Money)),
        }
    }

    /// Range check legacy date/time types, truncate datetime2 ticks and
    /// drop the time of day for date.
    pub fn adjust_datetime(&self, value: NaiveDateTime) -> Result<NaiveDateTime> {
        match self.wire_type {
            WireType::DateTime | WireType::SmallDateTime => {
                verify_datetime_range(self.wire_type, value)?;
                Ok(value)
            }
            WireType::DateTime2 => {
                Ok(value.date().and_time(truncate_time(value.time(), self.scale)))
            }
            WireType::Date => Ok(value.date().and_time(NaiveTime::MIN)),
            _ => Err(self.type_mismatch(ValueKind::DateTime)),
        }
    }

    /// Range check a time value and truncate it to the declared scale.
    pub fn adjust_time_span(&self, value: TimeDelta) -> Result<TimeDelta> {
        if self.wire_type != WireType::Time {
            return Err(self.type_mismatch(ValueKind::TimeSpan));
        }
        let ticks = verify_time_range(self.wire_type, value)?;
        Ok(ticks_to_time_delta(truncate_ticks(ticks, self.scale)))
    }

    /// Truncate a datetimeoffset to the declared scale.
    pub fn adjust_datetime_offset(
        &self,
        value: DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>> {
        if self.wire_type != WireType::DateTimeOffset {
            return Err(self.type_mismatch(ValueKind::DateTimeOffset));
        }
        let nanos = truncate_nanos(value.nanosecond(), self.scale);
        value.with_nanosecond(nanos).ok_or_else(|| {
            Error::invalid_value(WireType::DateTimeOffset, "cannot truncate fractional seconds")
        })
    }

    /// Derive the smallest standard descriptor able to hold `value`.
    pub fn infer_from_value(value: &SqlValue, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        match value {
            SqlValue::Bool(_) => Self::new(name, WireType::Bit),
            SqlValue::U8(_) => Self::new(name, WireType::TinyInt),
            SqlValue::Char(_) => Self::new_sized(name, WireType::NVarChar, 1),
            SqlValue::DateTime(_) => Self::new(name, WireType::DateTime),
            SqlValue::Date(_) => Self::new(name, WireType::Date),
            SqlValue::Decimal(d) => {
                Self::new_precise(name, WireType::Decimal, d.precision(), d.scale())
            }
            SqlValue::Money(_) => Self::new(name, WireType::Money),
            SqlValue::F64(_) => Self::new(name, WireType::Float),
            SqlValue::I16(_) => Self::new(name, WireType::SmallInt),
            SqlValue::I32(_) => Self::new(name, WireType::Int),
            SqlValue::I64(_) => Self::new(name, WireType::BigInt),
            SqlValue::F32(_) => Self::new(name, WireType::Real),
            SqlValue::String(s) => {
                Self::new_sized(name, WireType::NVarChar, unicode_length(s.encode_utf16().count()))
            }
            SqlValue::Chars(c) => {
                Self::new_sized(name, WireType::NVarChar, unicode_length(c.len()))
            }
            SqlValue::Bytes(b) => {
                Self::new_sized(name, WireType::VarBinary, binary_length(b.len()))
            }
            SqlValue::Guid(_) => Self::new(name, WireType::UniqueIdentifier),
            SqlValue::Xml(_) => Self::new(name, WireType::Xml),
            SqlValue::TimeSpan(t) => {
                let ticks = time_delta_ticks(*t).unwrap_or(0);
                Self::new_precise(name, WireType::Time, 0, infer_scale_from_ticks(ticks))
            }
            SqlValue::TimeOfDay(t) => {
                let ticks = (t.nanosecond() as i64) / NANOS_PER_TICK;
                Self::new_precise(name, WireType::Time, 0, infer_scale_from_ticks(ticks))
            }
            SqlValue::DateTimeOffset(dto) => {
                let ticks = (dto.nanosecond() as i64) / NANOS_PER_TICK;
                Self::new_precise(name, WireType::DateTimeOffset, 0, infer_scale_from_ticks(ticks))
            }
            SqlValue::Null
            | SqlValue::I8(_)
            | SqlValue::U16(_)
            | SqlValue::U32(_)
            | SqlValue::U64(_)
            | SqlValue::Udt(_) => Err(Error::InvalidDataType {
                kind: value.kind().name(),
            }),
        }
    }
}

impl fmt::Display for ColumnMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.wire_type)?;
        match self.wire_type {
            WireType::Decimal => write!(f, "({}, {})", self.precision, self.scale),
            WireType::Time | WireType::DateTime2 | WireType::DateTimeOffset => {
                write!(f, "({})", self.scale)
            }
            WireType::Char
            | WireType::NChar
            | WireType::VarChar
            | WireType::NVarChar
            | WireType::Binary
            | WireType::VarBinary => {
                if self.is_unlimited() {
                    write!(f, "(max)")
                } else {
                    write!(f, "({})", self.max_length)
                }
            }
            _ => Ok(()),
        }
    }
}

fn validate_max_length(
    wire_type: WireType,
    max_length: i64,
    constructor: &'static str,
) -> Result<()> {
    let valid = match wire_type {
        WireType::Char | WireType::NChar | WireType::Binary => {
            wire_type
                .length_ceiling()
                .is_some_and(|ceiling| (0..=ceiling).contains(&max_length))
        }
        WireType::VarChar | WireType::NVarChar | WireType::VarBinary => {
            max_length == UNLIMITED_MAX_LENGTH
                || wire_type
                    .length_ceiling()
                    .is_some_and(|ceiling| (0..=ceiling).contains(&max_length))
        }
        WireType::Text | WireType::NText | WireType::Image => max_length == UNLIMITED_MAX_LENGTH,
        _ => {
            return Err(Error::InvalidTypeForConstructor {
                wire_type,
                constructor,
            })
        }
    };
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_argument(
            "max_length",
            format!("{} is not a valid length for {}", max_length, wire_type),
        ))
    }
}

fn unicode_length(len: usize) -> i64 {
    let len = (len as i64).max(1);
    if len > MAX_UNICODE_CHARS {
        UNLIMITED_MAX_LENGTH
    } else {
        len
    }
}

fn binary_length(len: usize) -> i64 {
    let len = (len as i64).max(1);
    if len > MAX_BINARY_LENGTH {
        UNLIMITED_MAX_LENGTH
    } else {
        len
    }
}

fn date_time(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|date| date.and_hms_milli_opt(h, mi, s, ms))
        .ok_or_else(|| Error::invariant("invalid date/time range constant"))
}

/// Range check the legacy date/time types.
pub(crate) fn verify_datetime_range(wire_type: WireType, value: NaiveDateTime) -> Result<()> {
    let (min, max) = match wire_type {
        WireType::SmallDateTime => (
            date_time(1899, 12, 31, 23, 59, 29, 999)?,
            date_time(2079, 6, 6, 23, 59, 29, 998)?,
        ),
        WireType::DateTime => (
            date_time(1753, 1, 1, 0, 0, 0, 0)?,
            date_time(9999, 12, 31, 23, 59, 59, 997)?,
        ),
        _ => return Ok(()),
    };
    if value < min || value > max {
        return Err(Error::invalid_value(
            wire_type,
            format!("{} is outside {} ..= {}", value, min, max),
        ));
    }
    Ok(())
}

/// Range check a time value, returning its ticks.
pub(crate) fn verify_time_range(wire_type: WireType, value: TimeDelta) -> Result<i64> {
    let ticks = time_delta_ticks(value)
        .ok_or_else(|| Error::invalid_value(wire_type, format!("{} is out of range", value)))?;
    if wire_type == WireType::Time && !(0..TICKS_PER_DAY).contains(&ticks) {
        return Err(Error::invalid_value(
            wire_type,
            format!("{} is outside one day", value),
        ));
    }
    Ok(ticks)
}

/// Ticks (100 ns units) in a time delta.
pub fn time_delta_ticks(value: TimeDelta) -> Option<i64> {
    value.num_nanoseconds().map(|n| n / NANOS_PER_TICK)
}

/// Time delta from ticks.
pub fn ticks_to_time_delta(ticks: i64) -> TimeDelta {
    TimeDelta::seconds(ticks / TICKS_PER_SECOND)
        + TimeDelta::nanoseconds((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK)
}

fn truncate_ticks(ticks: i64, scale: u8) -> i64 {
    let unit = UNIT_TICKS_FROM_SCALE[scale.min(MAX_TIME_SCALE) as usize];
    ticks / unit * unit
}

fn truncate_nanos(nanos: u32, scale: u8) -> u32 {
    let unit = (UNIT_TICKS_FROM_SCALE[scale.min(MAX_TIME_SCALE) as usize] * NANOS_PER_TICK) as u32;
    nanos / unit * unit
}

fn truncate_time(value: NaiveTime, scale: u8) -> NaiveTime {
    let nanos = truncate_nanos(value.nanosecond(), scale);
    value.with_nanosecond(nanos).unwrap_or(value)
}

/// Smallest fractional-second scale that represents `ticks` exactly.
pub fn infer_scale_from_ticks(ticks: i64) -> u8 {
    (0..MAX_TIME_SCALE)
        .find(|scale| truncate_ticks(ticks, *scale) == ticks)
        .unwrap_or(MAX_TIME_SCALE)
}
