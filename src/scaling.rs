//! Decimal fixed-point scaling.
//!
//! The controller stores engineering values as integers with a fixed number of implied decimal
//! digits. E.g. a battery voltage of 13.45V is held as `1345` with a scale of 2 digits.

/// Values this close to an integer after scaling are treated as that integer when encoding.
///
/// Without it `0.29 * 100.0` would truncate to `28`.
const SNAP_TOLERANCE: f64 = 1e-6;

/// Largest magnitude accepted when encoding, well inside the range where `f64` holds integers
/// exactly.
const MAX_SCALED_MAGNITUDE: f64 = 1e15;

/// Number of implied decimal digits in a raw register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalScale(u8);

impl Default for DecimalScale {
    /// Default to no scaling.
    fn default() -> Self {
        Self::UNITS
    }
}

impl DecimalScale {
    /// Raw value is the engineering value.
    pub const UNITS: Self = Self(0);
    /// Raw value is in hundredths of the engineering unit.
    pub const HUNDREDTHS: Self = Self(2);

    /// Create a scale of `digits` implied decimal digits.
    ///
    /// Scales above 9 digits do not fit the `u32` factor and are clamped.
    pub const fn new(digits: u8) -> Self {
        if digits > 9 { Self(9) } else { Self(digits) }
    }

    /// Number of implied decimal digits.
    pub const fn digits(&self) -> u8 {
        self.0
    }

    /// Divisor between raw and engineering values, `10^digits`.
    pub const fn factor(&self) -> u32 {
        10u32.pow(self.0 as u32)
    }

    /// Convert a raw (already sign-interpreted) register value into engineering units.
    #[inline]
    pub fn raw_to_value(&self, raw: i64) -> f64 {
        raw as f64 / f64::from(self.factor())
    }

    /// Convert an engineering value into its raw integer, truncating toward zero.
    ///
    /// Returns `None` for non-finite or absurdly large values.
    pub fn value_to_raw(&self, value: f64) -> Option<i64> {
        let scaled = value * f64::from(self.factor());
        if !scaled.is_finite() || scaled > MAX_SCALED_MAGNITUDE || scaled < -MAX_SCALED_MAGNITUDE {
            return None;
        }

        let truncated = scaled as i64;
        let remainder = scaled - truncated as f64;
        let raw = if remainder > 1.0 - SNAP_TOLERANCE {
            truncated + 1
        } else if remainder < SNAP_TOLERANCE - 1.0 {
            truncated - 1
        } else {
            truncated
        };
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hundredths_scaling() {
        let scale = DecimalScale::HUNDREDTHS;

        // Raw 12345 at two digits = 123.45
        assert_eq!(scale.raw_to_value(12345), 123.45);
        // and back again
        assert_eq!(scale.value_to_raw(123.45), Some(12345));
    }

    #[test]
    fn test_units_scaling() {
        let scale = DecimalScale::UNITS;
        assert_eq!(scale.raw_to_value(87), 87.0);
        assert_eq!(scale.value_to_raw(87.0), Some(87));
    }

    #[test]
    fn test_truncation() {
        let scale = DecimalScale::HUNDREDTHS;
        assert_eq!(scale.value_to_raw(13.459), Some(1345));
        assert_eq!(scale.value_to_raw(-1.239), Some(-123));
    }

    #[test]
    fn test_scale_aligned_values_encode_exactly() {
        let scale = DecimalScale::HUNDREDTHS;
        // Binary floating point puts these just below the integer.
        assert_eq!(scale.value_to_raw(0.29), Some(29));
        assert_eq!(scale.value_to_raw(14.7), Some(1470));
        assert_eq!(scale.value_to_raw(-0.29), Some(-29));
        // Every voltage between 0.00 and 655.35 survives the trip.
        for raw in 0..=u16::MAX as i64 {
            let value = scale.raw_to_value(raw);
            assert_eq!(scale.value_to_raw(value), Some(raw));
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let scale = DecimalScale::HUNDREDTHS;
        assert_eq!(scale.value_to_raw(f64::NAN), None);
        assert_eq!(scale.value_to_raw(f64::INFINITY), None);
        assert_eq!(scale.value_to_raw(1e20), None);
    }

    #[test]
    fn test_factor() {
        assert_eq!(DecimalScale::UNITS.factor(), 1);
        assert_eq!(DecimalScale::HUNDREDTHS.factor(), 100);
        assert_eq!(DecimalScale::new(3).factor(), 1000);
        assert_eq!(DecimalScale::new(12).digits(), 9);
    }
}
