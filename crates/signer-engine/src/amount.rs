//! Exact decimal-string <-> integer minor-unit conversion.
//!
//! All monetary amounts crossing the service boundary are decimal strings
//! with exactly 8 fractional digits; this module converts them to and
//! from integer minor units without any floating point.

use crate::EngineError;

/// Number of fractional digits in the wire format.
const FRACTION_DIGITS: usize = 8;

/// Convert a wire-format decimal string to integer minor units.
///
/// The input must contain exactly one decimal point with exactly 8
/// digits after it, and nothing but ASCII digits elsewhere. An empty
/// integer part (".00000001") is accepted as zero.
///
/// # Arguments
/// * `value` - The decimal string, e.g. "1.23000000".
///
/// # Returns
/// The value in minor units, or `MalformedAmount` / `AmountOverflow`.
pub fn to_minor_units(value: &str) -> Result<u64, EngineError> {
    let (int_part, frac_part) = value
        .split_once('.')
        .ok_or_else(|| EngineError::MalformedAmount(value.to_string()))?;

    if frac_part.len() != FRACTION_DIGITS
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(EngineError::MalformedAmount(value.to_string()));
    }

    let joined = format!("{}{}", int_part, frac_part);
    joined
        .parse::<u64>()
        .map_err(|_| EngineError::AmountOverflow(value.to_string()))
}

/// Convert integer minor units to the wire-format decimal string.
///
/// Zero-pads the digit string to at least 9 characters, splits the last
/// 8 as the fractional part, and strips leading zeros from the integer
/// part (defaulting to "0"). As a defensive self-check the result is
/// re-encoded and must round-trip to the same integer.
///
/// # Arguments
/// * `value` - The amount in minor units.
///
/// # Returns
/// The decimal string, or `RoundTripMismatch` if the self-check fails.
pub fn from_minor_units(value: u64) -> Result<String, EngineError> {
    let mut digits = value.to_string();
    while digits.len() < FRACTION_DIGITS + 1 {
        digits.insert(0, '0');
    }

    let split = digits.len() - FRACTION_DIGITS;
    let (int_part, frac_part) = digits.split_at(split);
    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    let encoded = format!("{}.{}", int_part, frac_part);
    if to_minor_units(&encoded)? != value {
        return Err(EngineError::RoundTripMismatch(value));
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;

    #[test]
    fn test_to_minor_units_vectors() {
        assert_eq!(to_minor_units("1.00000000").unwrap(), 100_000_000);
        assert_eq!(to_minor_units("0.00000001").unwrap(), 1);
        assert_eq!(to_minor_units("0.00000000").unwrap(), 0);
        assert_eq!(to_minor_units("1.12345678").unwrap(), 112_345_678);
        assert_eq!(to_minor_units("21000000.00000000").unwrap(), 2_100_000_000_000_000);
        // Empty integer part is treated as zero.
        assert_eq!(to_minor_units(".00000001").unwrap(), 1);
    }

    #[test]
    fn test_from_minor_units_vectors() {
        assert_eq!(from_minor_units(112_345_678).unwrap(), "1.12345678");
        assert_eq!(from_minor_units(1).unwrap(), "0.00000001");
        assert_eq!(from_minor_units(0).unwrap(), "0.00000000");
        assert_eq!(from_minor_units(100_000_000).unwrap(), "1.00000000");
        assert_eq!(
            from_minor_units(2_100_000_000_000_000).unwrap(),
            "21000000.00000000"
        );
    }

    #[test]
    fn test_malformed_amounts() {
        for bad in [
            "1",
            "1.0",
            "1.000000000",
            "1.0000000a",
            "1,00000000",
            "1.00000000.0",
            "-1.00000000",
            "1e8.00000000",
            "",
        ] {
            assert!(
                matches!(to_minor_units(bad), Err(EngineError::MalformedAmount(_))),
                "expected MalformedAmount for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_overflow() {
        // u64::MAX is 18446744073709551615; one more overflows.
        assert!(matches!(
            to_minor_units("184467440737.09551616"),
            Err(EngineError::AmountOverflow(_))
        ));
        assert_eq!(
            to_minor_units("184467440737.09551615").unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_roundtrip_both_ways() {
        for value in [0u64, 1, 99, 100_000_000, 123_456_789_012, u64::MAX] {
            let encoded = from_minor_units(value).unwrap();
            assert_eq!(to_minor_units(&encoded).unwrap(), value);
        }
        for s in ["0.00000000", "12.34567890", "0.10000000"] {
            let value = to_minor_units(s).unwrap();
            assert_eq!(from_minor_units(value).unwrap(), s);
        }
    }
}
