//! Wire protocol limits and lookup tables.
//!
//! Values mirror the TDS limits a SQL Server accepts for parameter and
//! column metadata.

// Length sentinels
/// Max length marker meaning "unlimited, negotiated at transfer time".
pub const UNLIMITED_MAX_LENGTH: i64 = -1;
/// Actual-length marker meaning "length not known".
pub const NO_LENGTH_LIMIT: i64 = -1;

// Length ceilings
pub const MAX_UNICODE_CHARS: i64 = 4000;
pub const MAX_ANSI_CHARS: i64 = 8000;
pub const MAX_BINARY_LENGTH: i64 = 8000;
/// Largest value a variant column may carry.
pub const VARIANT_SIZE_LIMIT: i64 = 8000;
pub const MAX_NAME_LENGTH: usize = 128;

// Chunking
/// Largest binary chunk moved in one wire transfer.
pub const MAX_BYTE_CHUNK_SIZE: usize = 8000;
/// Largest character chunk moved in one wire transfer (UTF-16 units).
pub const MAX_CHAR_CHUNK_SIZE: usize = MAX_BYTE_CHUNK_SIZE / 2;

// Numeric limits
pub const DECIMAL_MAX_PRECISION: u8 = 38;
pub const DECIMAL_MAX_SCALE: u8 = 38;
pub const MAX_TIME_SCALE: u8 = 7;
pub const MONEY_SCALE: u8 = 4;
pub const MONEY_UNITS_PER_WHOLE: i64 = 10_000;

/// Small money bounds, in ten-thousandths.
pub const SMALL_MONEY_MIN: i64 = i32::MIN as i64;
pub const SMALL_MONEY_MAX: i64 = i32::MAX as i64;

// Time
pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const TICKS_PER_DAY: i64 = TICKS_PER_SECOND * 86_400;
pub const NANOS_PER_TICK: i64 = 100;

/// Ticks in one unit of the given fractional-second scale.
pub const UNIT_TICKS_FROM_SCALE: [i64; 8] = [
    10_000_000, 1_000_000, 100_000, 10_000, 1_000, 100, 10, 1,
];

/// Bytes saved by a time-family value of the given scale, relative to scale 7.
pub const VAR_TIME_LEN_OFFSET_FROM_SCALE: [i64; 8] = [2, 2, 2, 1, 1, 0, 0, 0];

/// Decimal storage size from precision.
pub fn decimal_max_length(precision: u8) -> i64 {
    match precision {
        0..=9 => 5,
        10..=19 => 9,
        20..=28 => 13,
        _ => 17,
    }
}
