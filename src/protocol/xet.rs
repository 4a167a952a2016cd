//! Offset and length arithmetic for chunked get/set ("xet") operations.

use crate::error::{Error, Result};
use crate::protocol::constants::VARIANT_SIZE_LIMIT;
use crate::protocol::types::WireType;

/// Minimum of two lengths where a negative value means "no limit".
///
/// Returns -1 only when both are unlimited.
pub fn positive_min(first: i64, second: i64) -> i64 {
    match (first < 0, second < 0) {
        (true, true) => -1,
        (true, false) => second,
        (false, true) => first,
        (false, false) => first.min(second),
    }
}

/// Validate the arguments of a chunked read or write and return the
/// number of elements to move.
///
/// `max_length` and `actual_length` may be negative to mean unlimited and
/// unknown. A `buffer_length` of `None` is a length probe: no bounds are
/// checked and the best known total length is returned (-1 if unknown).
/// A `field_offset` at or past the actual length yields 0, not an error.
pub fn check_xet_parameters(
    wire_type: WireType,
    max_length: i64,
    actual_length: i64,
    field_offset: i64,
    buffer_length: Option<i64>,
    buffer_offset: i64,
    length: i64,
) -> Result<i64> {
    if field_offset < 0 {
        return Err(Error::NegativeParameter {
            parameter: "fieldOffset",
        });
    }
    if buffer_offset < 0 {
        return Err(Error::InvalidDestinationBufferIndex {
            index: buffer_offset,
            buffer_length: buffer_length.unwrap_or(-1),
        });
    }

    let Some(buffer_length) = buffer_length else {
        let probed = positive_min(length, positive_min(max_length, actual_length));
        return Ok(probed.max(-1));
    };

    if buffer_offset > buffer_length {
        return Err(Error::InvalidDestinationBufferIndex {
            index: buffer_offset,
            buffer_length,
        });
    }
    if length.saturating_add(buffer_offset) > buffer_length {
        return Err(Error::InvalidBufferSizeOrIndex {
            length,
            buffer_offset,
            buffer_length,
        });
    }
    if length < 0 {
        return Err(Error::InvalidDataLength { length });
    }
    if actual_length >= 0 && actual_length <= field_offset {
        return Ok(0);
    }

    let mut length = length.min(buffer_length - buffer_offset);
    if wire_type == WireType::Variant {
        length = length.min(VARIANT_SIZE_LIMIT);
    }
    if actual_length >= 0 {
        length = length.min(actual_length - field_offset);
    } else if wire_type != WireType::Udt && max_length >= 0 {
        length = length.min(max_length - field_offset);
    }

    Ok(length.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(
        actual: i64,
        field_offset: i64,
        buffer_len: i64,
        buffer_offset: i64,
        length: i64,
    ) -> Result<i64> {
        check_xet_parameters(
            WireType::VarBinary,
            100,
            actual,
            field_offset,
            Some(buffer_len),
            buffer_offset,
            length,
        )
    }

    #[test]
    fn test_positive_min() {
        assert_eq!(positive_min(-1, -5), -1);
        assert_eq!(positive_min(-1, 7), 7);
        assert_eq!(positive_min(3, -1), 3);
        assert_eq!(positive_min(3, 7), 3);
    }

    #[test]
    fn test_negative_field_offset_fails() {
        match check(10, -1, 10, 0, 5) {
            Err(Error::NegativeParameter { parameter }) => assert_eq!(parameter, "fieldOffset"),
            _ => panic!("Expected NegativeParameter error"),
        }
    }

    #[test]
    fn test_buffer_offset_past_end_fails() {
        assert!(matches!(
            check(10, 0, 10, 11, 0),
            Err(Error::InvalidDestinationBufferIndex { index: 11, .. })
        ));
        assert!(matches!(
            check(10, 0, 10, -1, 0),
            Err(Error::InvalidDestinationBufferIndex { .. })
        ));
    }

    #[test]
    fn test_length_past_buffer_fails() {
        assert!(matches!(
            check(10, 0, 10, 4, 7),
            Err(Error::InvalidBufferSizeOrIndex { .. })
        ));
        assert!(matches!(
            check(10, 0, 10, 0, -2),
            Err(Error::InvalidDataLength { length: -2 })
        ));
    }

    #[test]
    fn test_offset_past_actual_length_is_empty() {
        assert_eq!(check(10, 10, 10, 0, 5).unwrap(), 0);
        assert_eq!(check(10, 50, 10, 0, 5).unwrap(), 0);
        assert_eq!(check(0, 0, 10, 0, 5).unwrap(), 0);
    }

    #[test]
    fn test_clamps_to_remaining_actual_length() {
        assert_eq!(check(10, 7, 20, 0, 20).unwrap(), 3);
        assert_eq!(check(10, 0, 20, 15, 5).unwrap(), 5);
        assert_eq!(check(-1, 90, 20, 0, 20).unwrap(), 10);
    }

    #[test]
    fn test_unlimited_max_skips_max_clamp() {
        let length = check_xet_parameters(WireType::VarBinary, -1, -1, 1_000_000, Some(50), 0, 50);
        assert_eq!(length.unwrap(), 50);
    }

    #[test]
    fn test_udt_skips_max_clamp() {
        let length = check_xet_parameters(WireType::Udt, 10, -1, 8, Some(50), 0, 50);
        assert_eq!(length.unwrap(), 50);
    }

    #[test]
    fn test_variant_capped() {
        let length =
            check_xet_parameters(WireType::Variant, -1, -1, 0, Some(10_000), 0, 10_000).unwrap();
        assert_eq!(length, VARIANT_SIZE_LIMIT);
    }

    #[test]
    fn test_length_probe() {
        let probe = |max, actual, length| {
            check_xet_parameters(WireType::VarBinary, max, actual, 0, None, 0, length).unwrap()
        };
        assert_eq!(probe(100, 40, 1000), 40);
        assert_eq!(probe(-1, -1, -1), -1);
        assert_eq!(probe(-1, 40, -1), 40);
        assert_eq!(probe(100, -1, -1), 100);
    }
}
