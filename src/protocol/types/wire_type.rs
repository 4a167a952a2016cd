//! Wire type catalog.
//!
//! The closed set of server-side types a value can be marshaled to, and the
//! default metadata the server assumes for each of them when a column or
//! parameter does not override it.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use crate::error::{Error, Result};
use crate::protocol::constants::{
    MAX_ANSI_CHARS, MAX_BINARY_LENGTH, MAX_UNICODE_CHARS, UNLIMITED_MAX_LENGTH,
};

/// Server wire type.
///
/// Discriminants are the catalog indices used on the wire; gaps are
/// indices the server reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    BigInt = 0,
    Binary = 1,
    Bit = 2,
    Char = 3,
    DateTime = 4,
    Decimal = 5,
    Float = 6,
    Image = 7,
    Int = 8,
    Money = 9,
    NChar = 10,
    NText = 11,
    NVarChar = 12,
    Real = 13,
    UniqueIdentifier = 14,
    SmallDateTime = 15,
    SmallInt = 16,
    SmallMoney = 17,
    Text = 18,
    Timestamp = 19,
    TinyInt = 20,
    VarBinary = 21,
    VarChar = 22,
    Variant = 23,
    Xml = 25,
    Udt = 29,
    Structured = 30,
    Date = 31,
    Time = 32,
    DateTime2 = 33,
    DateTimeOffset = 34,
}

impl WireType {
    /// Every wire type, in catalog order.
    pub const ALL: [WireType; 31] = [
        WireType::BigInt,
        WireType::Binary,
        WireType::Bit,
        WireType::Char,
        WireType::DateTime,
        WireType::Decimal,
        WireType::Float,
        WireType::Image,
        WireType::Int,
        WireType::Money,
        WireType::NChar,
        WireType::NText,
        WireType::NVarChar,
        WireType::Real,
        WireType::UniqueIdentifier,
        WireType::SmallDateTime,
        WireType::SmallInt,
        WireType::SmallMoney,
        WireType::Text,
        WireType::Timestamp,
        WireType::TinyInt,
        WireType::VarBinary,
        WireType::VarChar,
        WireType::Variant,
        WireType::Xml,
        WireType::Udt,
        WireType::Structured,
        WireType::Date,
        WireType::Time,
        WireType::DateTime2,
        WireType::DateTimeOffset,
    ];

    /// Look up a wire type by catalog index.
    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| *t as u8 == value)
            .ok_or_else(|| Error::invalid_argument("wire_type", format!("unknown index {}", value)))
    }

    /// Default metadata for this type.
    pub fn info(self) -> &'static WireTypeInfo {
        match self {
            WireType::BigInt => &BIGINT,
            WireType::Binary => &BINARY,
            WireType::Bit => &BIT,
            WireType::Char => &CHAR,
            WireType::DateTime => &DATETIME,
            WireType::Decimal => &DECIMAL,
            WireType::Float => &FLOAT,
            WireType::Image => &IMAGE,
            WireType::Int => &INT,
            WireType::Money => &MONEY,
            WireType::NChar => &NCHAR,
            WireType::NText => &NTEXT,
            WireType::NVarChar => &NVARCHAR,
            WireType::Real => &REAL,
            WireType::UniqueIdentifier => &UNIQUEIDENTIFIER,
            WireType::SmallDateTime => &SMALLDATETIME,
            WireType::SmallInt => &SMALLINT,
            WireType::SmallMoney => &SMALLMONEY,
            WireType::Text => &TEXT,
            WireType::Timestamp => &TIMESTAMP,
            WireType::TinyInt => &TINYINT,
            WireType::VarBinary => &VARBINARY,
            WireType::VarChar => &VARCHAR,
            WireType::Variant => &VARIANT,
            WireType::Xml => &XML,
            WireType::Udt => &UDT,
            WireType::Structured => &STRUCTURED,
            WireType::Date => &DATE,
            WireType::Time => &TIME,
            WireType::DateTime2 => &DATETIME2,
            WireType::DateTimeOffset => &DATETIMEOFFSET,
        }
    }

    /// Server type name.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    /// Character types, narrow or unicode.
    pub fn is_character(self) -> bool {
        matches!(
            self,
            WireType::Char
                | WireType::NChar
                | WireType::NText
                | WireType::NVarChar
                | WireType::Text
                | WireType::VarChar
        )
    }

    /// Unicode (two bytes per unit) character types.
    pub fn is_unicode(self) -> bool {
        matches!(self, WireType::NChar | WireType::NText | WireType::NVarChar)
    }

    /// Binary types.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            WireType::Binary | WireType::Image | WireType::Timestamp | WireType::VarBinary
        )
    }

    /// Extended time family carrying a fractional-second scale.
    pub fn is_scaled_time(self) -> bool {
        matches!(
            self,
            WireType::Time | WireType::DateTime2 | WireType::DateTimeOffset
        )
    }

    /// Character types whose length never varies.
    pub fn is_fixed_character(self) -> bool {
        matches!(self, WireType::Char | WireType::NChar)
    }

    /// Whether the type is always transferred as a large object.
    pub fn is_lob(self) -> bool {
        self.info().max_length == UNLIMITED_MAX_LENGTH
    }

    /// Largest bounded max length the type accepts, if it is length-declared.
    pub fn length_ceiling(self) -> Option<i64> {
        match self {
            WireType::NChar | WireType::NVarChar => Some(MAX_UNICODE_CHARS),
            WireType::Char | WireType::VarChar => Some(MAX_ANSI_CHARS),
            WireType::Binary | WireType::VarBinary => Some(MAX_BINARY_LENGTH),
            _ => None,
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// String comparison flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompareOptions(u32);

impl CompareOptions {
    pub const NONE: CompareOptions = CompareOptions(0);
    pub const IGNORE_CASE: CompareOptions = CompareOptions(0x01);
    pub const IGNORE_NON_SPACE: CompareOptions = CompareOptions(0x02);
    pub const IGNORE_KANA_TYPE: CompareOptions = CompareOptions(0x08);
    pub const IGNORE_WIDTH: CompareOptions = CompareOptions(0x10);
    pub const BINARY_SORT: CompareOptions = CompareOptions(0x8000);
    pub const BINARY_SORT2: CompareOptions = CompareOptions(0x4000);

    /// Default for character columns.
    pub const DEFAULT_STRING: CompareOptions = CompareOptions(0x01 | 0x08 | 0x10);

    const IGNORE_ALL: u32 = 0x01 | 0x02 | 0x08 | 0x10;

    /// Raw flag bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits.
    pub fn from_bits(bits: u32) -> Self {
        CompareOptions(bits)
    }

    /// Check whether all flags in `other` are set.
    pub fn contains(self, other: CompareOptions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Binary sorts stand alone; otherwise only ignore flags are allowed.
    pub fn is_valid(self) -> bool {
        if self == Self::BINARY_SORT || self == Self::BINARY_SORT2 {
            return true;
        }
        self.0 & !Self::IGNORE_ALL == 0
    }
}

impl BitOr for CompareOptions {
    type Output = CompareOptions;

    fn bitor(self, rhs: CompareOptions) -> CompareOptions {
        CompareOptions(self.0 | rhs.0)
    }
}

impl BitAnd for CompareOptions {
    type Output = CompareOptions;

    fn bitand(self, rhs: CompareOptions) -> CompareOptions {
        CompareOptions(self.0 & rhs.0)
    }
}

/// Default metadata for one wire type.
#[derive(Debug, Clone, PartialEq)]
pub struct WireTypeInfo {
    /// Server type name.
    pub name: &'static str,
    /// Default max length in bytes or characters; -1 means unlimited.
    pub max_length: i64,
    /// Default precision.
    pub precision: u8,
    /// Default scale.
    pub scale: u8,
    /// Default compare options.
    pub compare_options: CompareOptions,
    /// Whether values have a fixed on-wire width.
    pub is_fixed_length: bool,
    /// Whether the value may be sent with a partial length prefix.
    pub is_partial_length: bool,
}

const fn info(
    name: &'static str,
    max_length: i64,
    precision: u8,
    scale: u8,
    is_fixed_length: bool,
) -> WireTypeInfo {
    WireTypeInfo {
        name,
        max_length,
        precision,
        scale,
        compare_options: CompareOptions::NONE,
        is_fixed_length,
        is_partial_length: false,
    }
}

const fn string_info(name: &'static str, max_length: i64, is_fixed_length: bool) -> WireTypeInfo {
    WireTypeInfo {
        name,
        max_length,
        precision: 0,
        scale: 0,
        compare_options: CompareOptions::DEFAULT_STRING,
        is_fixed_length,
        is_partial_length: false,
    }
}

static BIGINT: WireTypeInfo = info("bigint", 8, 19, 0, true);
static BINARY: WireTypeInfo = info("binary", 1, 0, 0, true);
static BIT: WireTypeInfo = info("bit", 1, 1, 0, true);
static CHAR: WireTypeInfo = string_info("char", 1, true);
static DATETIME: WireTypeInfo = info("datetime", 8, 23, 3, true);
static DECIMAL: WireTypeInfo = info("decimal", 9, 18, 0, true);
static FLOAT: WireTypeInfo = info("float", 8, 53, 0, true);
static IMAGE: WireTypeInfo = info("image", UNLIMITED_MAX_LENGTH, 0, 0, false);
static INT: WireTypeInfo = info("int", 4, 10, 0, true);
static MONEY: WireTypeInfo = info("money", 8, 19, 4, true);
static NCHAR: WireTypeInfo = string_info("nchar", 1, true);
static NTEXT: WireTypeInfo = string_info("ntext", UNLIMITED_MAX_LENGTH, false);
static NVARCHAR: WireTypeInfo = string_info("nvarchar", MAX_UNICODE_CHARS, false);
static REAL: WireTypeInfo = info("real", 4, 24, 0, true);
static UNIQUEIDENTIFIER: WireTypeInfo = info("uniqueidentifier", 16, 0, 0, true);
static SMALLDATETIME: WireTypeInfo = info("smalldatetime", 4, 16, 0, true);
static SMALLINT: WireTypeInfo = info("smallint", 2, 5, 0, true);
static SMALLMONEY: WireTypeInfo = info("smallmoney", 4, 10, 4, true);
static TEXT: WireTypeInfo = string_info("text", UNLIMITED_MAX_LENGTH, false);
static TIMESTAMP: WireTypeInfo = info("timestamp", 8, 0, 0, true);
static TINYINT: WireTypeInfo = info("tinyint", 1, 3, 0, true);
static VARBINARY: WireTypeInfo = info("varbinary", MAX_BINARY_LENGTH, 0, 0, false);
static VARCHAR: WireTypeInfo = string_info("varchar", MAX_ANSI_CHARS, false);
static VARIANT: WireTypeInfo = info("sql_variant", 8016, 0, 0, false);
static XML: WireTypeInfo = WireTypeInfo {
    name: "xml",
    max_length: UNLIMITED_MAX_LENGTH,
    precision: 0,
    scale: 0,
    compare_options: CompareOptions::DEFAULT_STRING,
    is_fixed_length: false,
    is_partial_length: true,
};
static UDT: WireTypeInfo = info("udt", 0, 0, 0, false);
static STRUCTURED: WireTypeInfo = info("table", 0, 0, 0, false);
static DATE: WireTypeInfo = info("date", 3, 10, 0, true);
static TIME: WireTypeInfo = info("time", 5, 0, 7, true);
static DATETIME2: WireTypeInfo = info("datetime2", 8, 0, 7, true);
static DATETIMEOFFSET: WireTypeInfo = info("datetimeoffset", 10, 0, 7, true);
