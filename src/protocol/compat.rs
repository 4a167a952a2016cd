//! Type compatibility matrices.
//!
//! Two fixed tables indexed by [`ValueKind`] × [`WireType`] answer whether a
//! value of that kind is bit-for-bit what the wire type expects, so the
//! accessor may call the positional primitive directly. A `false` entry
//! sends the value through the generic materialize-and-coerce path (for
//! reads) or rejects it (for writes).
//!
//! Both tables are computed at compile time and never written afterwards.

use crate::protocol::types::{ColumnMetadata, ValueKind, WireType};

const WIRE_TYPE_COUNT: usize = WireType::ALL.len();

type Row = [bool; WIRE_TYPE_COUNT];
type Table = [Row; ValueKind::COUNT];

const fn column(t: WireType) -> usize {
    match t {
        WireType::BigInt => 0,
        WireType::Binary => 1,
        WireType::Bit => 2,
        WireType::Char => 3,
        WireType::DateTime => 4,
        WireType::Decimal => 5,
        WireType::Float => 6,
        WireType::Image => 7,
        WireType::Int => 8,
        WireType::Money => 9,
        WireType::NChar => 10,
        WireType::NText => 11,
        WireType::NVarChar => 12,
        WireType::Real => 13,
        WireType::UniqueIdentifier => 14,
        WireType::SmallDateTime => 15,
        WireType::SmallInt => 16,
        WireType::SmallMoney => 17,
        WireType::Text => 18,
        WireType::Timestamp => 19,
        WireType::TinyInt => 20,
        WireType::VarBinary => 21,
        WireType::VarChar => 22,
        WireType::Variant => 23,
        WireType::Xml => 24,
        WireType::Udt => 25,
        WireType::Structured => 26,
        WireType::Date => 27,
        WireType::Time => 28,
        WireType::DateTime2 => 29,
        WireType::DateTimeOffset => 30,
    }
}

const fn row(types: &[WireType]) -> Row {
    let mut r = [false; WIRE_TYPE_COUNT];
    let mut i = 0;
    while i < types.len() {
        r[column(types[i])] = true;
        i += 1;
    }
    r
}

use WireType::*;

const NONE: &[WireType] = &[];
const CHARACTER: &[WireType] = &[Char, NChar, NText, NVarChar, Text, VarChar];
const CHARACTER_OR_VARIANT: &[WireType] = &[Char, NChar, NText, NVarChar, Text, VarChar, Variant];
const DATE_TIME: &[WireType] = &[DateTime, SmallDateTime, Date, DateTime2];
const DATE_TIME_OR_VARIANT: &[WireType] = &[DateTime, SmallDateTime, Date, DateTime2, Variant];
const STRUCTURED: &[WireType] = &[Structured];

const fn build(rows: [&[WireType]; ValueKind::COUNT]) -> Table {
    let mut table = [[false; WIRE_TYPE_COUNT]; ValueKind::COUNT];
    let mut i = 0;
    while i < ValueKind::COUNT {
        table[i] = row(rows[i]);
        i += 1;
    }
    table
}

// Row order follows the ValueKind discriminants.
static GETTER_TABLE: Table = build([
    /* Boolean */ &[Bit],
    /* Byte */ &[TinyInt],
    /* Char */ CHARACTER,
    /* DateTime */ DATE_TIME,
    /* DbNull */ NONE,
    /* Decimal */ &[Decimal, Money, SmallMoney],
    /* Double */ &[Float],
    /* Int16 */ &[SmallInt],
    /* Int32 */ &[Int],
    /* Int64 */ &[BigInt],
    /* SByte */ NONE,
    /* Single */ &[Real],
    /* String */ CHARACTER,
    /* UInt16 */ NONE,
    /* UInt32 */ NONE,
    /* UInt64 */ NONE,
    /* Object */ &[Udt],
    /* ByteArray */
    &[Binary, Char, Image, NChar, NText, NVarChar, Text, Timestamp, VarBinary, VarChar, Xml, Udt],
    /* CharArray */ CHARACTER,
    /* Guid */ &[UniqueIdentifier],
    /* Money */ &[Money, SmallMoney],
    /* Xml */ &[Xml],
    /* DataTable */ STRUCTURED,
    /* DataReader */ STRUCTURED,
    /* RecordSequence */ STRUCTURED,
    /* TimeSpan */ &[Time],
    /* DateTimeOffset */ &[DateTimeOffset],
    /* Date */ DATE_TIME,
    /* TimeOfDay */ &[Time],
    /* ByteStream */ &[Binary, Image, VarBinary, Udt],
    /* TextStream */ CHARACTER,
    /* XmlStream */ NONE,
]);

static SETTER_TABLE: Table = build([
    /* Boolean */ &[Bit, Variant],
    /* Byte */ &[TinyInt, Variant],
    /* Char */ CHARACTER_OR_VARIANT,
    /* DateTime */ DATE_TIME_OR_VARIANT,
    /* DbNull */ NONE,
    /* Decimal */ &[Decimal, Money, SmallMoney, Variant],
    /* Double */ &[Float, Variant],
    /* Int16 */ &[SmallInt, Variant],
    /* Int32 */ &[Int, Variant],
    /* Int64 */ &[BigInt, Variant],
    /* SByte */ &[Variant],
    /* Single */ &[Real, Variant],
    /* String */ &[Char, NChar, NText, NVarChar, Text, VarChar, Variant, Xml],
    /* UInt16 */ NONE,
    /* UInt32 */ NONE,
    /* UInt64 */ NONE,
    /* Object */ &[Udt],
    /* ByteArray */ &[Binary, Image, Timestamp, VarBinary, Variant, Xml, Udt],
    /* CharArray */ CHARACTER_OR_VARIANT,
    /* Guid */ &[UniqueIdentifier, Variant],
    /* Money */ &[Money, SmallMoney, Variant],
    /* Xml */ &[Xml],
    /* DataTable */ STRUCTURED,
    /* DataReader */ STRUCTURED,
    /* RecordSequence */ STRUCTURED,
    /* TimeSpan */ &[Time],
    /* DateTimeOffset */ &[DateTimeOffset],
    /* Date */ DATE_TIME_OR_VARIANT,
    /* TimeOfDay */ &[Time],
    /* ByteStream */ NONE,
    /* TextStream */ NONE,
    /* XmlStream */ NONE,
]);

fn lookup(table: &Table, meta: &ColumnMetadata, kind: ValueKind) -> bool {
    let direct = table[kind as usize][column(meta.wire_type())];
    // Table-shaped kinds only apply to table-typed columns.
    direct && (!kind.is_structured() || meta.is_multi_valued())
}

/// Whether a value of `kind` can be read from a `meta` column directly.
pub fn can_access_getter_directly(meta: &ColumnMetadata, kind: ValueKind) -> bool {
    lookup(&GETTER_TABLE, meta, kind)
}

/// Whether a value of `kind` can be written to a `meta` column directly.
pub fn can_access_setter_directly(meta: &ColumnMetadata, kind: ValueKind) -> bool {
    lookup(&SETTER_TABLE, meta, kind)
}

/// Kind to use when writing `value` to `meta` directly, if any.
pub fn setter_kind_for(
    meta: &ColumnMetadata,
    value: &crate::protocol::types::SqlValue,
) -> Option<ValueKind> {
    let kind = value.kind();
    if can_access_setter_directly(meta, kind) {
        Some(kind)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::SqlValue;

    fn meta(t: WireType) -> ColumnMetadata {
        match t {
            WireType::Char
            | WireType::NChar
            | WireType::VarChar
            | WireType::NVarChar
            | WireType::Binary
            | WireType::VarBinary => ColumnMetadata::new_sized("c", t, 10).unwrap(),
            WireType::Udt => ColumnMetadata::new_udt(
                "c",
                crate::protocol::types::UdtType::new("T", 8),
                None,
            )
            .unwrap(),
            WireType::Structured => ColumnMetadata::new_structured(
                "c",
                "dbo.T",
                vec![ColumnMetadata::new("id", WireType::Int).unwrap()],
            )
            .unwrap(),
            _ => ColumnMetadata::new("c", t).unwrap(),
        }
    }

    #[test]
    fn test_column_index_matches_catalog_order() {
        for (i, t) in WireType::ALL.iter().enumerate() {
            assert_eq!(column(*t), i);
        }
    }

    #[test]
    fn test_getter_matrix_entries() {
        assert!(can_access_getter_directly(&meta(WireType::Int), ValueKind::Int32));
        assert!(!can_access_getter_directly(&meta(WireType::Int), ValueKind::Int64));
        assert!(can_access_getter_directly(&meta(WireType::Money), ValueKind::Decimal));
        assert!(can_access_getter_directly(&meta(WireType::NVarChar), ValueKind::ByteArray));
        assert!(!can_access_getter_directly(&meta(WireType::Variant), ValueKind::Int32));
        assert!(!can_access_getter_directly(&meta(WireType::TinyInt), ValueKind::SByte));
    }

    #[test]
    fn test_setter_matrix_entries() {
        assert!(can_access_setter_directly(&meta(WireType::Variant), ValueKind::Int32));
        assert!(can_access_setter_directly(&meta(WireType::Variant), ValueKind::SByte));
        assert!(can_access_setter_directly(&meta(WireType::Xml), ValueKind::String));
        assert!(!can_access_setter_directly(&meta(WireType::NVarChar), ValueKind::ByteArray));
        assert!(!can_access_setter_directly(&meta(WireType::Variant), ValueKind::TimeSpan));
        assert!(!can_access_setter_directly(&meta(WireType::VarBinary), ValueKind::ByteStream));
    }

    #[test]
    fn test_unsigned_kinds_never_direct() {
        for t in WireType::ALL {
            let m = meta(t);
            for kind in [
                ValueKind::UInt16,
                ValueKind::UInt32,
                ValueKind::UInt64,
                ValueKind::DbNull,
            ] {
                assert!(!can_access_getter_directly(&m, kind));
                assert!(!can_access_setter_directly(&m, kind));
            }
        }
    }

    #[test]
    fn test_structured_kinds_need_multi_valued() {
        let table = meta(WireType::Structured);
        assert!(table.is_multi_valued());
        assert!(can_access_setter_directly(&table, ValueKind::DataTable));
        assert!(can_access_getter_directly(&table, ValueKind::RecordSequence));
        assert!(!can_access_setter_directly(&meta(WireType::Int), ValueKind::DataReader));
    }

    #[test]
    fn test_setter_kind_for() {
        assert_eq!(
            setter_kind_for(&meta(WireType::BigInt), &SqlValue::I64(1)),
            Some(ValueKind::Int64)
        );
        assert_eq!(setter_kind_for(&meta(WireType::BigInt), &SqlValue::I32(1)), None);
        assert_eq!(
            setter_kind_for(&meta(WireType::Variant), &SqlValue::String("x".into())),
            Some(ValueKind::String)
        );
    }
}
