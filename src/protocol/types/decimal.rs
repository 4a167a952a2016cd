//! Fixed-point decimal and money values.
//!
//! Decimals are carried as an unscaled `i128` with a precision and scale,
//! the same shape the TDS `decimal` type puts on the wire. Money is a
//! 64-bit count of ten-thousandths.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::protocol::constants::{
    DECIMAL_MAX_PRECISION, MONEY_SCALE, MONEY_UNITS_PER_WHOLE, SMALL_MONEY_MAX, SMALL_MONEY_MIN,
};
use crate::protocol::types::WireType;

fn pow10(exp: u8) -> i128 {
    10i128.pow(exp as u32)
}

fn digit_count(value: i128) -> u8 {
    let mut v = value.unsigned_abs();
    let mut digits = 1u8;
    while v >= 10 {
        v /= 10;
        digits += 1;
    }
    digits
}

/// Decimal value with explicit precision and scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SqlDecimal {
    value: i128,
    precision: u8,
    scale: u8,
}

impl SqlDecimal {
    /// Create a decimal from an unscaled value.
    ///
    /// `value` is interpreted as `value * 10^-scale` and must fit in
    /// `precision` digits.
    pub fn new(value: i128, precision: u8, scale: u8) -> Result<Self> {
        if precision == 0 || precision > DECIMAL_MAX_PRECISION {
            return Err(Error::invalid_argument(
                "precision",
                format!("{} is outside 1..={}", precision, DECIMAL_MAX_PRECISION),
            ));
        }
        if scale > precision {
            return Err(Error::invalid_argument(
                "scale",
                format!("{} exceeds precision {}", scale, precision),
            ));
        }
        if value.unsigned_abs() >= pow10(precision).unsigned_abs() {
            return Err(Error::invalid_value(
                WireType::Decimal,
                format!("{} digits do not fit precision {}", digit_count(value), precision),
            ));
        }
        Ok(Self {
            value,
            precision,
            scale,
        })
    }

    /// Create a decimal using the smallest precision that holds the value.
    pub fn from_unscaled(value: i128, scale: u8) -> Result<Self> {
        let precision = digit_count(value).max(scale).max(1);
        Self::new(value, precision, scale)
    }

    /// Unscaled value.
    pub fn unscaled(&self) -> i128 {
        self.value
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0
    }

    /// Number of significant digits actually used.
    pub fn calculated_precision(&self) -> u8 {
        digit_count(self.value).max(self.scale)
    }

    /// Change the scale by `new_scale - scale` digits.
    ///
    /// Reducing the scale truncates toward zero unless `round` is set, in
    /// which case it rounds half away from zero. Precision moves with the
    /// scale, clamped to `1..=DECIMAL_MAX_PRECISION`. Scaling up fails only
    /// when the digits no longer fit.
    pub fn adjust_scale(&self, new_scale: u8, round: bool) -> Result<Self> {
        if new_scale == self.scale {
            return Ok(*self);
        }
        if new_scale > self.scale {
            let diff = new_scale - self.scale;
            let precision = self
                .precision
                .saturating_add(diff)
                .min(DECIMAL_MAX_PRECISION);
            let overflow = || {
                Error::invalid_value(
                    WireType::Decimal,
                    format!("{} does not fit scale {}", self, new_scale),
                )
            };
            if diff > DECIMAL_MAX_PRECISION {
                return Err(overflow());
            }
            let value = self.value.checked_mul(pow10(diff)).ok_or_else(overflow)?;
            return Self::new(value, precision, new_scale).map_err(|_| overflow());
        }

        let diff = self.scale - new_scale;
        let divisor = pow10(diff);
        let mut value = self.value / divisor;
        if round {
            let remainder = (self.value % divisor).abs();
            if remainder * 2 >= divisor {
                value += self.value.signum();
            }
        }
        let precision = self.precision.saturating_sub(diff).max(new_scale).max(1);
        let precision = precision.max(digit_count(value)).min(DECIMAL_MAX_PRECISION);
        Self::new(value, precision, new_scale)
    }

    /// Convert to exactly the given precision and scale, truncating extra
    /// fractional digits. Fails if the integral part does not fit.
    pub fn convert_to_prec_scale(&self, precision: u8, scale: u8) -> Result<Self> {
        let scaled = self.adjust_scale(scale, false)?;
        Self::new(scaled.value, precision, scale).map_err(|_| {
            Error::invalid_value(
                WireType::Decimal,
                format!("{} does not fit decimal({}, {})", self, precision, scale),
            )
        })
    }
}

impl fmt::Display for SqlDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.value.unsigned_abs().to_string();
        let sign = if self.value < 0 { "-" } else { "" };
        if self.scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl FromStr for SqlDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let valid = !(int_part.is_empty() && frac_part.is_empty())
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac_part.chars().all(|c| c.is_ascii_digit());
        if !valid {
            return Err(Error::invalid_argument(
                "decimal",
                format!("cannot parse '{}'", s),
            ));
        }
        if frac_part.len() > DECIMAL_MAX_PRECISION as usize {
            return Err(Error::invalid_argument("decimal", "too many fractional digits"));
        }
        let digits = format!("{}{}", int_part, frac_part);
        let digits = digits.trim_start_matches('0');
        if digits.len() > DECIMAL_MAX_PRECISION as usize {
            return Err(Error::invalid_argument("decimal", "too many digits"));
        }
        let magnitude: i128 = if digits.is_empty() {
            0
        } else {
            digits
                .parse()
                .map_err(|_| Error::invalid_argument("decimal", format!("cannot parse '{}'", s)))?
        };
        let value = if negative { -magnitude } else { magnitude };
        Self::from_unscaled(value, frac_part.len() as u8)
    }
}

/// Money value in ten-thousandths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SqlMoney(i64);

impl SqlMoney {
    /// Create from the internal ten-thousandths representation.
    pub fn from_internal(units: i64) -> Self {
        SqlMoney(units)
    }

    /// Internal ten-thousandths representation, as sent on the wire.
    pub fn internal(&self) -> i64 {
        self.0
    }

    /// Convert a decimal, truncating past four fractional digits.
    pub fn from_decimal(value: &SqlDecimal) -> Result<Self> {
        let overflow = || Error::MoneyOverflow {
            value: value.to_string(),
        };
        let scaled = if value.scale() > MONEY_SCALE {
            value.adjust_scale(MONEY_SCALE, false)?.unscaled()
        } else {
            value
                .unscaled()
                .checked_mul(pow10(MONEY_SCALE - value.scale()))
                .ok_or_else(overflow)?
        };
        i64::try_from(scaled).map(SqlMoney).map_err(|_| overflow())
    }

    /// Convert to a decimal(19, 4).
    pub fn to_decimal(&self) -> SqlDecimal {
        SqlDecimal {
            value: self.0 as i128,
            precision: 19,
            scale: MONEY_SCALE,
        }
    }

    /// Whether the value fits the small-money range.
    pub fn fits_small_money(&self) -> bool {
        (SMALL_MONEY_MIN..=SMALL_MONEY_MAX).contains(&self.0)
    }

    /// Whole units, truncated toward zero.
    pub fn whole_units(&self) -> i64 {
        self.0 / MONEY_UNITS_PER_WHOLE
    }
}

impl fmt::Display for SqlMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for SqlMoney {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SqlMoney::from_decimal(&s.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let d: SqlDecimal = "1.2399".parse().unwrap();
        assert_eq!(d.unscaled(), 12399);
        assert_eq!(d.scale(), 4);
        assert_eq!(d.precision(), 5);
        assert_eq!(d.to_string(), "1.2399");

        let d: SqlDecimal = "-0.05".parse().unwrap();
        assert_eq!(d.unscaled(), -5);
        assert_eq!(d.to_string(), "-0.05");

        assert!("1.2.3".parse::<SqlDecimal>().is_err());
        assert!("abc".parse::<SqlDecimal>().is_err());
    }

    #[test]
    fn test_adjust_scale_truncates() {
        let d: SqlDecimal = "1.2399".parse().unwrap();
        let adjusted = d.adjust_scale(2, false).unwrap();
        assert_eq!(adjusted.to_string(), "1.23");

        let negative: SqlDecimal = "-1.2399".parse().unwrap();
        assert_eq!(negative.adjust_scale(2, false).unwrap().to_string(), "-1.23");
    }

    #[test]
    fn test_adjust_scale_rounds_when_asked() {
        let d: SqlDecimal = "1.2350".parse().unwrap();
        assert_eq!(d.adjust_scale(2, true).unwrap().to_string(), "1.24");
    }

    #[test]
    fn test_adjust_scale_up() {
        let d: SqlDecimal = "12.5".parse().unwrap();
        let up = d.adjust_scale(3, false).unwrap();
        assert_eq!(up.unscaled(), 12500);
        assert_eq!(up.precision(), 5);
    }

    #[test]
    fn test_adjust_scale_up_clamps_precision() {
        let one = SqlDecimal::new(1, 38, 0).unwrap();
        let up = one.adjust_scale(4, false).unwrap();
        assert_eq!(up.precision(), 38);
        assert_eq!(up.to_string(), "1.0000");

        let five = SqlDecimal::new(5, 37, 0).unwrap();
        assert_eq!(five.convert_to_prec_scale(10, 2).unwrap().to_string(), "5.00");

        let wide = SqlDecimal::new(10i128.pow(36), 38, 0).unwrap();
        match wide.adjust_scale(2, false) {
            Err(Error::InvalidMetadataValue { wire_type, .. }) => {
                assert_eq!(wire_type, WireType::Decimal)
            }
            _ => panic!("Expected InvalidMetadataValue error"),
        }
    }

    #[test]
    fn test_convert_to_prec_scale_overflow() {
        let d: SqlDecimal = "12345.6".parse().unwrap();
        assert_eq!(d.convert_to_prec_scale(10, 2).unwrap().to_string(), "12345.60");
        match d.convert_to_prec_scale(4, 0) {
            Err(Error::InvalidMetadataValue { wire_type, .. }) => {
                assert_eq!(wire_type, WireType::Decimal)
            }
            _ => panic!("Expected InvalidMetadataValue error"),
        }
    }

    #[test]
    fn test_new_rejects_excess_digits() {
        assert!(SqlDecimal::new(1000, 3, 0).is_err());
        assert!(SqlDecimal::new(999, 3, 0).is_ok());
        assert!(SqlDecimal::new(1, 0, 0).is_err());
        assert!(SqlDecimal::new(1, 2, 3).is_err());
    }

    #[test]
    fn test_money_from_decimal() {
        let m: SqlMoney = "214748.3647".parse().unwrap();
        assert_eq!(m.internal(), 2_147_483_647);
        assert!(m.fits_small_money());

        let m: SqlMoney = "214748.3648".parse().unwrap();
        assert!(!m.fits_small_money());

        let m: SqlMoney = "1.23456".parse().unwrap();
        assert_eq!(m.internal(), 12345);
        assert_eq!(m.to_string(), "1.2345");
    }

    #[test]
    fn test_money_overflow() {
        let huge: SqlDecimal = "99999999999999999999".parse().unwrap();
        assert!(matches!(
            SqlMoney::from_decimal(&huge),
            Err(Error::MoneyOverflow { .. })
        ));

        let widest = SqlDecimal::new(10i128.pow(37), 38, 0).unwrap();
        assert!(matches!(
            SqlMoney::from_decimal(&widest),
            Err(Error::MoneyOverflow { .. })
        ));
        assert!(matches!(
            "9".repeat(38).parse::<SqlMoney>(),
            Err(Error::MoneyOverflow { .. })
        ));
    }
}
