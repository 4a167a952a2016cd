//! Typed get/set over the positional primitives.
//!
//! Every getter follows the same plan: a null fails with
//! [`Error::NullValue`]; a (kind, wire type) pair the getter matrix allows
//! is read straight from the primitive; anything else is materialized with
//! [`get_value`] and coerced, failing with [`Error::InvalidCast`] when no
//! coercion exists.
//!
//! Setters only accept pairs the setter matrix allows. Variant columns are
//! told the concrete metadata of each value before it is written.
//!
//! # Example
//!
//! ```
//! use smi_marshal::protocol::accessor;
//! use smi_marshal::{ColumnMetadata, RecordBuffer, WireType};
//!
//! let meta = ColumnMetadata::new_sized("name", WireType::NVarChar, 5).unwrap();
//! let mut row = RecordBuffer::new(vec![meta.clone()]);
//!
//! accessor::set_string(&mut row, 0, &meta, "truncated").unwrap();
//! assert_eq!(accessor::get_string(&mut row, 0, &meta).unwrap(), "trunc");
//! ```

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::options::MarshalOptions;
use crate::protocol::compat::{can_access_getter_directly, can_access_setter_directly};
use crate::protocol::constants::{MAX_BYTE_CHUNK_SIZE, MAX_CHAR_CHUNK_SIZE, NO_LENGTH_LIMIT};
use crate::protocol::getter_setter::{ValueGetters, ValueSetters};
use crate::protocol::lob;
use crate::protocol::structured::{self, DataTable, RowReader};
use crate::protocol::types::{
    verify_datetime_range, verify_time_range, ColumnMetadata, DataRecord, SqlDecimal, SqlMoney,
    SqlValue, ValueKind, WireType,
};
use crate::protocol::xet::check_xet_parameters;

// --- helpers ---

fn throw_if_null<G: ValueGetters + ?Sized>(getters: &mut G, ordinal: usize) -> Result<()> {
    if getters.is_null(ordinal)? {
        Err(Error::NullValue { ordinal })
    } else {
        Ok(())
    }
}

fn cast_error(meta: &ColumnMetadata, kind: ValueKind, reading: bool) -> Error {
    let direction = if reading { "read" } else { "write" };
    Error::invalid_cast(format!(
        "cannot {} a {} value {} column '{}' of type {}",
        direction,
        kind,
        if reading { "from" } else { "to" },
        meta.name(),
        meta.wire_type()
    ))
}

pub(crate) fn throw_if_invalid_setter_access(meta: &ColumnMetadata, kind: ValueKind) -> Result<()> {
    if can_access_setter_directly(meta, kind) {
        Ok(())
    } else {
        Err(cast_error(meta, kind, false))
    }
}

/// Declare the concrete metadata of a value about to be written to a
/// variant column. No-op for any other column.
fn prepare_variant<S, F>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    concrete: F,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
    F: FnOnce() -> Result<ColumnMetadata>,
{
    if meta.wire_type() != WireType::Variant {
        return Ok(());
    }
    let concrete = concrete()?;
    if concrete.wire_type() == WireType::Variant {
        return Err(Error::invariant(format!(
            "variant column '{}' cannot hold a nested variant",
            meta.name()
        )));
    }
    setters.set_variant_type(ordinal, &concrete)
}

fn scalar_meta(wire_type: WireType) -> impl FnOnce() -> Result<ColumnMetadata> {
    move || ColumnMetadata::new("", wire_type)
}

fn get_typed<G, T, D, C>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
    kind: ValueKind,
    direct: D,
    convert: C,
) -> Result<T>
where
    G: ValueGetters + ?Sized,
    D: FnOnce(&mut G) -> Result<T>,
    C: FnOnce(SqlValue) -> Option<T>,
{
    throw_if_null(getters, ordinal)?;
    if can_access_getter_directly(meta, kind) {
        return direct(getters);
    }
    let value = get_value(getters, ordinal, meta)?;
    convert(value).ok_or_else(|| cast_error(meta, kind, true))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn time_of_day(span: TimeDelta) -> Option<NaiveTime> {
    let (time, wrapped) = NaiveTime::MIN.overflowing_add_signed(span);
    (wrapped == 0 && span >= TimeDelta::zero()).then_some(time)
}

// --- getters ---

/// Check if the value at `ordinal` is null.
pub fn is_null<G: ValueGetters + ?Sized>(getters: &mut G, ordinal: usize) -> Result<bool> {
    getters.is_null(ordinal)
}

/// Read a typed value, returning `None` instead of failing on null.
///
/// ```
/// use smi_marshal::protocol::accessor;
/// use smi_marshal::{ColumnMetadata, RecordBuffer, WireType};
///
/// let meta = ColumnMetadata::new("n", WireType::Int).unwrap();
/// let mut row = RecordBuffer::new(vec![meta.clone()]);
/// let value = accessor::get_nullable(&mut row, 0, |r| accessor::get_i32(r, 0, &meta)).unwrap();
/// assert_eq!(value, None);
/// ```
pub fn get_nullable<G, T, F>(getters: &mut G, ordinal: usize, get: F) -> Result<Option<T>>
where
    G: ValueGetters + ?Sized,
    F: FnOnce(&mut G) -> Result<T>,
{
    if getters.is_null(ordinal)? {
        Ok(None)
    } else {
        get(getters).map(Some)
    }
}

pub fn get_bool<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<bool> {
    get_typed(getters, ordinal, meta, ValueKind::Boolean, |g| g.get_bool(ordinal), |v| match v {
        SqlValue::Bool(b) => Some(b),
        _ => None,
    })
}

pub fn get_u8<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<u8> {
    get_typed(getters, ordinal, meta, ValueKind::Byte, |g| g.get_u8(ordinal), |v| match v {
        SqlValue::U8(b) => Some(b),
        _ => None,
    })
}

pub fn get_i16<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<i16> {
    get_typed(getters, ordinal, meta, ValueKind::Int16, |g| g.get_i16(ordinal), |v| match v {
        SqlValue::I16(n) => Some(n),
        _ => None,
    })
}

pub fn get_i32<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<i32> {
    get_typed(getters, ordinal, meta, ValueKind::Int32, |g| g.get_i32(ordinal), |v| match v {
        SqlValue::I32(n) => Some(n),
        _ => None,
    })
}

pub fn get_i64<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<i64> {
    get_typed(getters, ordinal, meta, ValueKind::Int64, |g| g.get_i64(ordinal), |v| match v {
        SqlValue::I64(n) => Some(n),
        _ => None,
    })
}

pub fn get_f32<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<f32> {
    get_typed(getters, ordinal, meta, ValueKind::Single, |g| g.get_f32(ordinal), |v| match v {
        SqlValue::F32(n) => Some(n),
        _ => None,
    })
}

pub fn get_f64<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<f64> {
    get_typed(getters, ordinal, meta, ValueKind::Double, |g| g.get_f64(ordinal), |v| match v {
        SqlValue::F64(n) => Some(n),
        _ => None,
    })
}

/// Read a decimal; money columns are widened to decimal(19, 4).
pub fn get_decimal<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<SqlDecimal> {
    let is_money = matches!(meta.wire_type(), WireType::Money | WireType::SmallMoney);
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::Decimal,
        |g| {
            if is_money {
                Ok(SqlMoney::from_internal(g.get_i64(ordinal)?).to_decimal())
            } else {
                g.get_decimal(ordinal)
            }
        },
        |v| match v {
            SqlValue::Decimal(d) => Some(d),
            SqlValue::Money(m) => Some(m.to_decimal()),
            _ => None,
        },
    )
}

pub fn get_money<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<SqlMoney> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::Money,
        |g| g.get_i64(ordinal).map(SqlMoney::from_internal),
        |v| match v {
            SqlValue::Money(m) => Some(m),
            _ => None,
        },
    )
}

pub fn get_datetime<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<NaiveDateTime> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::DateTime,
        |g| g.get_datetime(ordinal),
        |v| match v {
            SqlValue::DateTime(dt) => Some(dt),
            SqlValue::Date(d) => Some(midnight(d)),
            _ => None,
        },
    )
}

pub fn get_date<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<NaiveDate> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::Date,
        |g| g.get_datetime(ordinal).map(|dt| dt.date()),
        |v| match v {
            SqlValue::Date(d) => Some(d),
            SqlValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        },
    )
}

pub fn get_time_span<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<TimeDelta> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::TimeSpan,
        |g| g.get_time_span(ordinal),
        |v| match v {
            SqlValue::TimeSpan(t) => Some(t),
            SqlValue::TimeOfDay(t) => Some(t - NaiveTime::MIN),
            _ => None,
        },
    )
}

pub fn get_time_of_day<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<NaiveTime> {
    let span = get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::TimeOfDay,
        |g| g.get_time_span(ordinal),
        |v| match v {
            SqlValue::TimeOfDay(t) => Some(t - NaiveTime::MIN),
            SqlValue::TimeSpan(t) => Some(t),
            _ => None,
        },
    )?;
    time_of_day(span).ok_or_else(|| {
        Error::invalid_value(meta.wire_type(), format!("{} is not a time of day", span))
    })
}

pub fn get_datetime_offset<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<DateTime<FixedOffset>> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::DateTimeOffset,
        |g| g.get_datetime_offset(ordinal),
        |v| match v {
            SqlValue::DateTimeOffset(dto) => Some(dto),
            _ => None,
        },
    )
}

pub fn get_guid<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<Uuid> {
    get_typed(getters, ordinal, meta, ValueKind::Guid, |g| g.get_guid(ordinal), |v| match v {
        SqlValue::Guid(g) => Some(g),
        _ => None,
    })
}

pub fn get_string<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<String> {
    get_typed(getters, ordinal, meta, ValueKind::String, |g| g.get_string(ordinal), |v| match v {
        SqlValue::String(s) | SqlValue::Xml(s) => Some(s),
        SqlValue::Chars(c) => Some(String::from_utf16_lossy(&c)),
        SqlValue::Char(c) => Some(String::from_utf16_lossy(&[c])),
        _ => None,
    })
}

pub fn get_xml<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<String> {
    get_typed(getters, ordinal, meta, ValueKind::Xml, |g| g.get_string(ordinal), |v| match v {
        SqlValue::Xml(s) => Some(s),
        _ => None,
    })
}

/// Read a whole binary value in chunks.
pub fn get_byte_array<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<Vec<u8>> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::ByteArray,
        |g| lob::drain_bytes(g, ordinal, &MarshalOptions::default()),
        |v| match v {
            SqlValue::Bytes(b) | SqlValue::Udt(b) => Some(b),
            _ => None,
        },
    )
}

/// Read a whole character value in chunks.
pub fn get_char_array<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<Vec<u16>> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::CharArray,
        |g| lob::drain_chars(g, ordinal, &MarshalOptions::default()),
        |v| match v {
            SqlValue::Chars(c) => Some(c),
            SqlValue::String(s) | SqlValue::Xml(s) => Some(s.encode_utf16().collect()),
            _ => None,
        },
    )
}

/// Read the serialized bytes of a user-defined type value.
pub fn get_udt<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<Vec<u8>> {
    get_typed(
        getters,
        ordinal,
        meta,
        ValueKind::Object,
        |g| lob::drain_bytes(g, ordinal, &MarshalOptions::default()),
        |v| match v {
            SqlValue::Udt(b) => Some(b),
            _ => None,
        },
    )
}

/// Materialize the value at `ordinal` in the canonical form of its wire type.
///
/// A variant column resolves its concrete metadata from the getters first.
pub fn get_value<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
) -> Result<SqlValue> {
    if getters.is_null(ordinal)? {
        return Ok(SqlValue::Null);
    }
    let options = MarshalOptions::default();
    let value = match meta.wire_type() {
        WireType::BigInt => SqlValue::I64(getters.get_i64(ordinal)?),
        WireType::Binary | WireType::VarBinary | WireType::Image | WireType::Timestamp => {
            SqlValue::Bytes(lob::drain_bytes(getters, ordinal, &options)?)
        }
        WireType::Bit => SqlValue::Bool(getters.get_bool(ordinal)?),
        WireType::Char
        | WireType::NChar
        | WireType::NText
        | WireType::NVarChar
        | WireType::Text
        | WireType::VarChar => SqlValue::String(getters.get_string(ordinal)?),
        WireType::DateTime | WireType::SmallDateTime | WireType::DateTime2 => {
            SqlValue::DateTime(getters.get_datetime(ordinal)?)
        }
        WireType::Date => SqlValue::Date(getters.get_datetime(ordinal)?.date()),
        WireType::Decimal => SqlValue::Decimal(getters.get_decimal(ordinal)?),
        WireType::Float => SqlValue::F64(getters.get_f64(ordinal)?),
        WireType::Int => SqlValue::I32(getters.get_i32(ordinal)?),
        WireType::Money | WireType::SmallMoney => {
            SqlValue::Money(SqlMoney::from_internal(getters.get_i64(ordinal)?))
        }
        WireType::Real => SqlValue::F32(getters.get_f32(ordinal)?),
        WireType::UniqueIdentifier => SqlValue::Guid(getters.get_guid(ordinal)?),
        WireType::SmallInt => SqlValue::I16(getters.get_i16(ordinal)?),
        WireType::TinyInt => SqlValue::U8(getters.get_u8(ordinal)?),
        WireType::Variant => {
            let concrete = getters.get_variant_type(ordinal)?;
            if concrete.wire_type() == WireType::Variant {
                return Err(Error::invariant(format!(
                    "variant at ordinal {} resolved to another variant",
                    ordinal
                )));
            }
            return get_value(getters, ordinal, &concrete);
        }
        WireType::Xml => SqlValue::Xml(getters.get_string(ordinal)?),
        WireType::Udt => SqlValue::Udt(lob::drain_bytes(getters, ordinal, &options)?),
        WireType::Structured => {
            return Err(Error::invalid_cast(format!(
                "structured column '{}' has no scalar value",
                meta.name()
            )))
        }
        WireType::Time => SqlValue::TimeSpan(getters.get_time_span(ordinal)?),
        WireType::DateTimeOffset => SqlValue::DateTimeOffset(getters.get_datetime_offset(ordinal)?),
    };
    Ok(value)
}

fn copy_out<T: Copy>(
    source: &[T],
    field_offset: i64,
    buffer: &mut [T],
    buffer_offset: i64,
    length: i64,
) -> i64 {
    if length <= 0 {
        return 0;
    }
    let start = field_offset as usize;
    let count = length as usize;
    let at = buffer_offset as usize;
    buffer[at..at + count].copy_from_slice(&source[start..start + count]);
    length
}

/// Read a chunk of a binary value.
///
/// With no `buffer`, returns the total length of the value. A `field_offset`
/// at or past the end reads nothing. A null fails unless `throw_on_null` is
/// false, in which case the arguments are still validated and 0 returned.
/// One call moves at most [`MAX_BYTE_CHUNK_SIZE`] bytes, so large values
/// take repeated calls.
#[allow(clippy::too_many_arguments)]
pub fn get_bytes<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
    field_offset: i64,
    buffer: Option<&mut [u8]>,
    buffer_offset: i64,
    length: i64,
    throw_on_null: bool,
) -> Result<i64> {
    let wire_type = meta.wire_type();
    let bounded_character = !meta.is_unlimited()
        && matches!(
            wire_type,
            WireType::VarChar | WireType::NVarChar | WireType::Char | WireType::NChar
        );
    if bounded_character || wire_type == WireType::Xml {
        return Err(Error::NonBlobColumn { wire_type });
    }

    let buffer_length = buffer.as_ref().map(|b| b.len() as i64);
    let max_length = meta.max_byte_length();

    if getters.is_null(ordinal)? {
        if throw_on_null {
            return Err(Error::NullValue { ordinal });
        }
        check_xet_parameters(
            wire_type,
            max_length,
            0,
            field_offset,
            buffer_length,
            buffer_offset,
            length,
        )?;
        return Ok(0);
    }

    if can_access_getter_directly(meta, ValueKind::ByteArray) {
        let actual = getters.get_bytes_length(ordinal)?;
        let Some(buffer) = buffer else {
            return Ok(actual);
        };
        let length = check_xet_parameters(
            wire_type,
            max_length,
            actual,
            field_offset,
            buffer_length,
            buffer_offset,
            length,
        )?
        .min(MAX_BYTE_CHUNK_SIZE as i64);
        if length == 0 {
            return Ok(0);
        }
        let at = buffer_offset as usize;
        let read = getters.get_bytes(ordinal, field_offset, &mut buffer[at..at + length as usize])?;
        return Ok(read as i64);
    }

    let bytes = match get_value(getters, ordinal, meta)? {
        SqlValue::Bytes(b) | SqlValue::Udt(b) => b,
        _ => return Err(cast_error(meta, ValueKind::ByteArray, true)),
    };
    let Some(buffer) = buffer else {
        return Ok(bytes.len() as i64);
    };
    let length = check_xet_parameters(
        wire_type,
        max_length,
        bytes.len() as i64,
        field_offset,
        buffer_length,
        buffer_offset,
        length,
    )?
    .min(MAX_BYTE_CHUNK_SIZE as i64);
    Ok(copy_out(&bytes, field_offset, buffer, buffer_offset, length))
}

/// Read a chunk of a character value, in UTF-16 units.
///
/// One call moves at most [`MAX_CHAR_CHUNK_SIZE`] units.
#[allow(clippy::too_many_arguments)]
pub fn get_chars<G: ValueGetters + ?Sized>(
    getters: &mut G,
    ordinal: usize,
    meta: &ColumnMetadata,
    field_offset: i64,
    buffer: Option<&mut [u16]>,
    buffer_offset: i64,
    length: i64,
    throw_on_null: bool,
) -> Result<i64> {
    let wire_type = meta.wire_type();
    let buffer_length = buffer.as_ref().map(|b| b.len() as i64);
    let max_length = meta.max_length();

    if getters.is_null(ordinal)? {
        if throw_on_null {
            return Err(Error::NullValue { ordinal });
        }
        check_xet_parameters(
            wire_type,
            max_length,
            0,
            field_offset,
            buffer_length,
            buffer_offset,
            length,
        )?;
        return Ok(0);
    }

    if can_access_getter_directly(meta, ValueKind::CharArray) {
        let actual = getters.get_chars_length(ordinal)?;
        let Some(buffer) = buffer else {
            return Ok(actual);
        };
        let length = check_xet_parameters(
            wire_type,
            max_length,
            actual,
            field_offset,
            buffer_length,
            buffer_offset,
            length,
        )?
        .min(MAX_CHAR_CHUNK_SIZE as i64);
        if length == 0 {
            return Ok(0);
        }
        let at = buffer_offset as usize;
        let read = getters.get_chars(ordinal, field_offset, &mut buffer[at..at + length as usize])?;
        return Ok(read as i64);
    }

    let units: Vec<u16> = match get_value(getters, ordinal, meta)? {
        SqlValue::String(s) | SqlValue::Xml(s) => s.encode_utf16().collect(),
        SqlValue::Chars(c) => c,
        _ => return Err(cast_error(meta, ValueKind::CharArray, true)),
    };
    let Some(buffer) = buffer else {
        return Ok(units.len() as i64);
    };
    let length = check_xet_parameters(
        wire_type,
        max_length,
        units.len() as i64,
        field_offset,
        buffer_length,
        buffer_offset,
        length,
    )?
    .min(MAX_CHAR_CHUNK_SIZE as i64);
    Ok(copy_out(&units, field_offset, buffer, buffer_offset, length))
}

// --- setters ---

pub fn set_null<S: ValueSetters + ?Sized>(setters: &mut S, ordinal: usize) -> Result<()> {
    setters.set_null(ordinal)
}

pub fn set_bool<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: bool,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Boolean)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::Bit))?;
    setters.set_bool(ordinal, value)
}

pub fn set_u8<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: u8,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Byte)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::TinyInt))?;
    setters.set_u8(ordinal, value)
}

/// Write a signed byte. Only variant columns accept it, as a smallint.
pub fn set_i8<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: i8,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::SByte)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::SmallInt))?;
    setters.set_i16(ordinal, value as i16)
}

pub fn set_i16<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: i16,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Int16)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::SmallInt))?;
    setters.set_i16(ordinal, value)
}

pub fn set_i32<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: i32,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Int32)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::Int))?;
    setters.set_i32(ordinal, value)
}

pub fn set_i64<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: i64,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Int64)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::BigInt))?;
    setters.set_i64(ordinal, value)
}

pub fn set_f32<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: f32,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Single)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::Real))?;
    setters.set_f32(ordinal, value)
}

pub fn set_f64<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: f64,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Double)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::Float))?;
    setters.set_f64(ordinal, value)
}

fn set_money_unchecked<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: SqlMoney,
) -> Result<()> {
    if meta.wire_type() == WireType::SmallMoney && !value.fits_small_money() {
        return Err(Error::invalid_value(
            WireType::SmallMoney,
            format!("{} is outside the smallmoney range", value),
        ));
    }
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::Money))?;
    setters.set_i64(ordinal, value.internal())
}

/// Write a money value; small money columns reject values past their range.
pub fn set_money<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: SqlMoney,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Money)?;
    set_money_unchecked(setters, ordinal, meta, value)
}

/// Write a decimal, converting to money for the money family.
pub fn set_decimal<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &SqlDecimal,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Decimal)?;
    match meta.wire_type() {
        WireType::Money | WireType::SmallMoney => {
            set_money_unchecked(setters, ordinal, meta, SqlMoney::from_decimal(value)?)
        }
        _ => {
            prepare_variant(setters, ordinal, meta, || {
                ColumnMetadata::new_precise("", WireType::Decimal, value.precision(), value.scale())
            })?;
            setters.set_decimal(ordinal, value)
        }
    }
}

fn set_datetime_checked<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: NaiveDateTime,
    variant_type: WireType,
) -> Result<()> {
    verify_datetime_range(meta.wire_type(), value)?;
    let value = if meta.wire_type() == WireType::Date {
        midnight(value.date())
    } else {
        value
    };
    prepare_variant(setters, ordinal, meta, scalar_meta(variant_type))?;
    setters.set_datetime(ordinal, value)
}

/// Write a date-time. Small date-time values are range checked and date
/// columns keep only the date part.
pub fn set_datetime<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: NaiveDateTime,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::DateTime)?;
    set_datetime_checked(setters, ordinal, meta, value, WireType::DateTime)
}

pub fn set_date<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: NaiveDate,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Date)?;
    set_datetime_checked(setters, ordinal, meta, midnight(value), WireType::Date)
}

/// Write a time span; time columns accept only `0 <= value < 1 day`.
pub fn set_time_span<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: TimeDelta,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::TimeSpan)?;
    verify_time_range(meta.wire_type(), value)?;
    setters.set_time_span(ordinal, value)
}

pub fn set_time_of_day<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: NaiveTime,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::TimeOfDay)?;
    setters.set_time_span(ordinal, value - NaiveTime::MIN)
}

pub fn set_datetime_offset<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: DateTime<FixedOffset>,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::DateTimeOffset)?;
    setters.set_datetime_offset(ordinal, value)
}

pub fn set_guid<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: Uuid,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Guid)?;
    prepare_variant(setters, ordinal, meta, scalar_meta(WireType::UniqueIdentifier))?;
    setters.set_guid(ordinal, value)
}

fn set_string_length_checked<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &str,
) -> Result<()> {
    let units: Vec<u16> = value.encode_utf16().collect();
    let total = units.len() as i64;
    let length = check_xet_parameters(
        meta.wire_type(),
        meta.max_length(),
        NO_LENGTH_LIMIT,
        0,
        Some(total),
        0,
        total,
    )?;
    let truncated = if length < total {
        String::from_utf16_lossy(&units[..length as usize])
    } else {
        value.to_string()
    };
    prepare_variant(setters, ordinal, meta, || {
        ColumnMetadata::infer_from_value(&SqlValue::String(truncated.clone()), "")
    })?;
    setters.set_string(ordinal, &truncated)
}

/// Write a string, truncating it to the column's max length.
pub fn set_string<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &str,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::String)?;
    set_string_length_checked(setters, ordinal, meta, value)
}

/// Write a single UTF-16 unit as a one-character string.
pub fn set_char<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: u16,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Char)?;
    set_string_length_checked(setters, ordinal, meta, &String::from_utf16_lossy(&[value]))
}

pub fn set_xml<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &str,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Xml)?;
    setters.set_string(ordinal, value)
}

/// Write a chunk of a binary value at `field_offset`.
///
/// The length is clamped to the column's max length. A zero-length write
/// is still passed through, with both offsets reset to zero.
pub fn set_bytes<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    field_offset: i64,
    buffer: &[u8],
    buffer_offset: i64,
    length: i64,
) -> Result<i64> {
    throw_if_invalid_setter_access(meta, ValueKind::ByteArray)?;
    let length = check_xet_parameters(
        meta.wire_type(),
        meta.max_length(),
        NO_LENGTH_LIMIT,
        field_offset,
        Some(buffer.len() as i64),
        buffer_offset,
        length,
    )?;
    let (field_offset, buffer_offset) = if length == 0 {
        (0, 0)
    } else {
        (field_offset, buffer_offset)
    };
    prepare_variant(setters, ordinal, meta, || {
        ColumnMetadata::new_sized("", WireType::VarBinary, length.max(1))
    })?;
    let at = buffer_offset as usize;
    let written = setters.set_bytes(ordinal, field_offset, &buffer[at..at + length as usize])?;
    Ok(written as i64)
}

/// Trim a binary value to at most `length` bytes (and never past the max length).
pub fn set_bytes_length<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    length: i64,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::ByteArray)?;
    if length < 0 {
        return Err(Error::InvalidDataLength { length });
    }
    let length = if meta.max_length() >= 0 && meta.wire_type() != WireType::Udt {
        length.min(meta.max_length())
    } else {
        length
    };
    setters.set_bytes_length(ordinal, length)
}

/// Write a chunk of a character value at `field_offset`, in UTF-16 units.
pub fn set_chars<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    field_offset: i64,
    buffer: &[u16],
    buffer_offset: i64,
    length: i64,
) -> Result<i64> {
    throw_if_invalid_setter_access(meta, ValueKind::CharArray)?;
    let length = check_xet_parameters(
        meta.wire_type(),
        meta.max_length(),
        NO_LENGTH_LIMIT,
        field_offset,
        Some(buffer.len() as i64),
        buffer_offset,
        length,
    )?;
    let (field_offset, buffer_offset) = if length == 0 {
        (0, 0)
    } else {
        (field_offset, buffer_offset)
    };
    prepare_variant(setters, ordinal, meta, || {
        ColumnMetadata::new_sized("", WireType::NVarChar, length.max(1))
    })?;
    let at = buffer_offset as usize;
    let written = setters.set_chars(ordinal, field_offset, &buffer[at..at + length as usize])?;
    Ok(written as i64)
}

pub fn set_chars_length<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    length: i64,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::CharArray)?;
    if length < 0 {
        return Err(Error::InvalidDataLength { length });
    }
    let length = if meta.max_length() >= 0 {
        length.min(meta.max_length())
    } else {
        length
    };
    setters.set_chars_length(ordinal, length)
}

/// Write a whole binary value, truncated to the column's max length.
pub fn set_byte_array<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &[u8],
) -> Result<()> {
    let written = set_bytes(setters, ordinal, meta, 0, value, 0, value.len() as i64)?;
    set_bytes_length(setters, ordinal, meta, written)
}

/// Write a whole character value, truncated to the column's max length.
pub fn set_char_array<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &[u16],
) -> Result<()> {
    let written = set_chars(setters, ordinal, meta, 0, value, 0, value.len() as i64)?;
    set_chars_length(setters, ordinal, meta, written)
}

/// Write the serialized bytes of a user-defined type value.
pub fn set_udt<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &[u8],
    options: &MarshalOptions,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::Object)?;
    let mut source = value;
    lob::write_bytes_from_reader(setters, ordinal, meta, &mut source, options).map(|_| ())
}

/// Write any runtime value, dispatching on its kind.
///
/// Binary values bound for large-object columns move in chunks.
pub fn set_value<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    value: &SqlValue,
    options: &MarshalOptions,
) -> Result<()> {
    match value {
        SqlValue::Null => setters.set_null(ordinal),
        SqlValue::Bool(v) => set_bool(setters, ordinal, meta, *v),
        SqlValue::U8(v) => set_u8(setters, ordinal, meta, *v),
        SqlValue::I8(v) => set_i8(setters, ordinal, meta, *v),
        SqlValue::I16(v) => set_i16(setters, ordinal, meta, *v),
        SqlValue::I32(v) => set_i32(setters, ordinal, meta, *v),
        SqlValue::I64(v) => set_i64(setters, ordinal, meta, *v),
        SqlValue::F32(v) => set_f32(setters, ordinal, meta, *v),
        SqlValue::F64(v) => set_f64(setters, ordinal, meta, *v),
        SqlValue::U16(_) | SqlValue::U32(_) | SqlValue::U64(_) => {
            Err(cast_error(meta, value.kind(), false))
        }
        SqlValue::Char(c) => set_char(setters, ordinal, meta, *c),
        SqlValue::String(s) => set_string(setters, ordinal, meta, s),
        SqlValue::Chars(c) => set_char_array(setters, ordinal, meta, c),
        SqlValue::Bytes(b) if meta.is_lob() => {
            throw_if_invalid_setter_access(meta, ValueKind::ByteArray)?;
            let mut source = b.as_slice();
            lob::write_bytes_from_reader(setters, ordinal, meta, &mut source, options).map(|_| ())
        }
        SqlValue::Bytes(b) => set_byte_array(setters, ordinal, meta, b),
        SqlValue::Decimal(d) => set_decimal(setters, ordinal, meta, d),
        SqlValue::Money(m) => set_money(setters, ordinal, meta, *m),
        SqlValue::DateTime(dt) => set_datetime(setters, ordinal, meta, *dt),
        SqlValue::Date(d) => set_date(setters, ordinal, meta, *d),
        SqlValue::TimeSpan(t) => set_time_span(setters, ordinal, meta, *t),
        SqlValue::TimeOfDay(t) => set_time_of_day(setters, ordinal, meta, *t),
        SqlValue::DateTimeOffset(dto) => set_datetime_offset(setters, ordinal, meta, *dto),
        SqlValue::Guid(g) => set_guid(setters, ordinal, meta, *g),
        SqlValue::Xml(s) => set_xml(setters, ordinal, meta, s),
        SqlValue::Udt(b) => set_udt(setters, ordinal, meta, b, options),
    }
}

// --- structured ---

/// Write every row of an in-memory table into a structured column.
pub fn set_data_table<S: ValueSetters + ?Sized>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    table: &DataTable,
    options: &MarshalOptions,
) -> Result<()> {
    throw_if_invalid_setter_access(meta, ValueKind::DataTable)?;
    let rows = setters.structured_setters(ordinal)?;
    structured::fill_from_table(rows, meta.fields(), table, options)
}

/// Write every remaining row of a reader into a structured column.
pub fn set_data_reader<S, R>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    reader: &mut R,
    options: &MarshalOptions,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
    R: RowReader + ?Sized,
{
    throw_if_invalid_setter_access(meta, ValueKind::DataReader)?;
    let rows = setters.structured_setters(ordinal)?;
    structured::fill_from_reader(rows, meta.fields(), reader, options)
}

/// Write a sequence of prebuilt records into a structured column.
pub fn set_records<S, I>(
    setters: &mut S,
    ordinal: usize,
    meta: &ColumnMetadata,
    records: I,
    options: &MarshalOptions,
) -> Result<()>
where
    S: ValueSetters + ?Sized,
    I: IntoIterator<Item = DataRecord>,
{
    throw_if_invalid_setter_access(meta, ValueKind::RecordSequence)?;
    let rows = setters.structured_setters(ordinal)?;
    structured::fill_from_records(rows, meta.fields(), records, options)
}
