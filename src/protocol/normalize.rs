//! Order-preserving binary normalization of fixed-layout UDT values.
//!
//! A normalized key is the concatenation of every field, in ascending
//! layout offset, as a fixed-width big-endian value with its order bits
//! flipped so that unsigned byte comparison of two keys agrees with the
//! field-wise ordering of the values:
//!
//! - unsigned integers are stored unmodified;
//! - signed integers have the sign bit flipped;
//! - non-negative floats have the sign bit flipped, negative floats have
//!   every bit flipped (negative zero encodes like positive zero);
//! - booleans are one byte, 1 or 0;
//! - nested composites recurse.
//!
//! There is no padding and no length prefix. Layouts are declared
//! explicitly with [`FieldDescriptor`]s or through [`UdtLayout`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::types::{ColumnMetadata, WireType};

/// Primitive kind of a layout field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    /// Nested fixed-layout value.
    Composite(UdtNormalizer),
}

impl FieldKind {
    /// Encoded width in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldKind::Bool | FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => 4,
            FieldKind::U64 | FieldKind::I64 | FieldKind::F64 => 8,
            FieldKind::Composite(n) => n.size(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::U8 => "u8",
            FieldKind::I8 => "i8",
            FieldKind::U16 => "u16",
            FieldKind::I16 => "i16",
            FieldKind::U32 => "u32",
            FieldKind::I32 => "i32",
            FieldKind::U64 => "u64",
            FieldKind::I64 => "i64",
            FieldKind::F32 => "f32",
            FieldKind::F64 => "f64",
            FieldKind::Composite(_) => "composite",
        }
    }
}

/// A field at a byte offset of the value's layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub offset: usize,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(offset: usize, kind: FieldKind) -> Self {
        Self { offset, kind }
    }
}

/// A field value, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    F32(f32),
    F64(f64),
    Composite(Vec<FieldValue>),
}

/// A Rust type with a declared fixed layout.
pub trait UdtLayout: Sized {
    /// Field list in declaration order.
    fn fields() -> Vec<FieldDescriptor>;

    /// Field values in declaration order.
    fn to_fields(&self) -> Vec<FieldValue>;

    fn from_fields(values: Vec<FieldValue>) -> Result<Self>;
}

const F32_SIGN: u32 = 1 << 31;
const F64_SIGN: u64 = 1 << 63;

fn normalize_f32(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & F32_SIGN == 0 {
        bits ^ F32_SIGN
    } else if value < 0.0 {
        !bits
    } else {
        bits
    }
}

fn denormalize_f32(bits: u32) -> f32 {
    if bits & F32_SIGN != 0 {
        f32::from_bits(bits ^ F32_SIGN)
    } else {
        f32::from_bits(!bits)
    }
}

fn normalize_f64(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & F64_SIGN == 0 {
        bits ^ F64_SIGN
    } else if value < 0.0 {
        !bits
    } else {
        bits
    }
}

fn denormalize_f64(bits: u64) -> f64 {
    if bits & F64_SIGN != 0 {
        f64::from_bits(bits ^ F64_SIGN)
    } else {
        f64::from_bits(!bits)
    }
}

/// Cursor over a normalized key.
struct KeyReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> KeyReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(Error::BufferTooSmall {
                needed: N,
                available: self.remaining(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }
}

/// Normalizer for one fixed layout.
#[derive(Debug, Clone, PartialEq)]
pub struct UdtNormalizer {
    /// Fields sorted by offset.
    fields: Vec<FieldDescriptor>,
    /// Declaration index of each sorted field.
    order: Vec<usize>,
    size: usize,
}

impl UdtNormalizer {
    /// Build a normalizer from fields in declaration order.
    ///
    /// Fields are sorted by offset once; duplicate offsets and empty
    /// layouts are rejected.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::invalid_argument("fields", "a layout needs at least one field"));
        }
        let mut indexed: Vec<(usize, FieldDescriptor)> = fields.into_iter().enumerate().collect();
        indexed.sort_by_key(|(_, f)| f.offset);
        if let Some(pair) = indexed.windows(2).find(|w| w[0].1.offset == w[1].1.offset) {
            return Err(Error::invalid_argument(
                "fields",
                format!("two fields share offset {}", pair[0].1.offset),
            ));
        }
        let size = indexed.iter().map(|(_, f)| f.kind.size()).sum();
        let (order, fields): (Vec<usize>, Vec<FieldDescriptor>) = indexed.into_iter().unzip();
        Ok(Self {
            fields,
            order,
            size,
        })
    }

    /// Build a normalizer for a declared layout.
    pub fn for_layout<T: UdtLayout>() -> Result<Self> {
        Self::new(T::fields())
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Fields in encoding order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fail if the encoded size exceeds a UDT column's declared max length.
    pub fn check_fits(&self, meta: &ColumnMetadata) -> Result<()> {
        let max = meta.max_length();
        if max > 0 && self.size as i64 > max {
            return Err(Error::invalid_value(
                WireType::Udt,
                format!("normalized size {} exceeds max length {}", self.size, max),
            ));
        }
        Ok(())
    }

    /// Encode `values`, given in declaration order.
    pub fn normalize(&self, values: &[FieldValue]) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.size);
        self.write(values, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode the first `size()` bytes of `data` into values in
    /// declaration order.
    pub fn denormalize(&self, data: &[u8]) -> Result<Vec<FieldValue>> {
        if data.len() < self.size {
            return Err(Error::BufferTooSmall {
                needed: self.size,
                available: data.len(),
            });
        }
        self.read(&mut KeyReader::new(data))
    }

    pub fn normalize_value<T: UdtLayout>(&self, value: &T) -> Result<Bytes> {
        self.normalize(&value.to_fields())
    }

    pub fn denormalize_value<T: UdtLayout>(&self, data: &[u8]) -> Result<T> {
        T::from_fields(self.denormalize(data)?)
    }

    fn write(&self, values: &[FieldValue], buf: &mut BytesMut) -> Result<()> {
        if values.len() != self.fields.len() {
            return Err(Error::invalid_argument(
                "values",
                format!("{} values for {} fields", values.len(), self.fields.len()),
            ));
        }
        for (field, &index) in self.fields.iter().zip(&self.order) {
            match (&field.kind, &values[index]) {
                (FieldKind::Bool, FieldValue::Bool(v)) => buf.put_u8(u8::from(*v)),
                (FieldKind::U8, FieldValue::U8(v)) => buf.put_u8(*v),
                (FieldKind::I8, FieldValue::I8(v)) => buf.put_u8((*v as u8) ^ 0x80),
                (FieldKind::U16, FieldValue::U16(v)) => buf.put_u16(*v),
                (FieldKind::I16, FieldValue::I16(v)) => buf.put_u16((*v as u16) ^ 0x8000),
                (FieldKind::U32, FieldValue::U32(v)) => buf.put_u32(*v),
                (FieldKind::I32, FieldValue::I32(v)) => buf.put_u32((*v as u32) ^ (1 << 31)),
                (FieldKind::U64, FieldValue::U64(v)) => buf.put_u64(*v),
                (FieldKind::I64, FieldValue::I64(v)) => buf.put_u64((*v as u64) ^ (1 << 63)),
                (FieldKind::F32, FieldValue::F32(v)) => buf.put_u32(normalize_f32(*v)),
                (FieldKind::F64, FieldValue::F64(v)) => buf.put_u64(normalize_f64(*v)),
                (FieldKind::Composite(nested), FieldValue::Composite(v)) => nested.write(v, buf)?,
                (kind, value) => {
                    return Err(Error::invalid_argument(
                        "values",
                        format!(
                            "field at offset {} is {} but got {:?}",
                            field.offset,
                            kind.name(),
                            value
                        ),
                    ))
                }
            }
        }
        Ok(())
    }

    fn read(&self, reader: &mut KeyReader<'_>) -> Result<Vec<FieldValue>> {
        let mut slots: Vec<Option<FieldValue>> = vec![None; self.fields.len()];
        for (field, &index) in self.fields.iter().zip(&self.order) {
            let value = match &field.kind {
                FieldKind::Bool => FieldValue::Bool(reader.read_array::<1>()?[0] == 1),
                FieldKind::U8 => FieldValue::U8(reader.read_array::<1>()?[0]),
                FieldKind::I8 => FieldValue::I8((reader.read_array::<1>()?[0] ^ 0x80) as i8),
                FieldKind::U16 => FieldValue::U16(u16::from_be_bytes(reader.read_array()?)),
                FieldKind::I16 => {
                    FieldValue::I16((u16::from_be_bytes(reader.read_array()?) ^ 0x8000) as i16)
                }
                FieldKind::U32 => FieldValue::U32(u32::from_be_bytes(reader.read_array()?)),
                FieldKind::I32 => {
                    FieldValue::I32((u32::from_be_bytes(reader.read_array()?) ^ (1 << 31)) as i32)
                }
                FieldKind::U64 => FieldValue::U64(u64::from_be_bytes(reader.read_array()?)),
                FieldKind::I64 => {
                    FieldValue::I64((u64::from_be_bytes(reader.read_array()?) ^ (1 << 63)) as i64)
                }
                FieldKind::F32 => {
                    FieldValue::F32(denormalize_f32(u32::from_be_bytes(reader.read_array()?)))
                }
                FieldKind::F64 => {
                    FieldValue::F64(denormalize_f64(u64::from_be_bytes(reader.read_array()?)))
                }
                FieldKind::Composite(nested) => FieldValue::Composite(nested.read(reader)?),
            };
            slots[index] = Some(value);
        }
        slots
            .into_iter()
            .map(|v| v.ok_or_else(|| Error::invariant("normalized field was not decoded")))
            .collect()
    }
}
