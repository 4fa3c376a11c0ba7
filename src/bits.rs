//! Bitfield extraction for bit-packed status registers.

/// Extract the field of `value` described by an unshifted `mask` starting at `start_bit`.
///
/// `mask` is the bit pattern of the field before shifting, so a two bit field is `0b11` whatever
/// its position in the register.
///
/// ```
/// use epever_modbus::bits::extract_bits;
///
/// // D3-2 of 0b1011
/// assert_eq!(extract_bits(11, 2, 0b11), 2);
/// ```
#[inline]
pub const fn extract_bits(value: u16, start_bit: u8, mask: u16) -> u16 {
    let shift = start_bit as u32;
    match mask.checked_shl(shift) {
        Some(shifted_mask) => (value & shifted_mask) >> shift,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_d3_2() {
        assert_eq!(extract_bits(11, 2, 0b11), 2);
    }

    #[test]
    fn extract_d1() {
        assert_eq!(extract_bits(11, 1, 0b1), 1);
    }

    #[test]
    fn matches_mask_and_shift_definition() {
        let masks = [0b1, 0b11, 0b111, 0b1111, 0xFF];
        for value in (0..=u16::MAX).step_by(251) {
            for start_bit in 0..16u8 {
                for mask in masks {
                    let expected = (value & (mask << start_bit)) >> start_bit;
                    assert_eq!(extract_bits(value, start_bit, mask), expected);
                }
            }
        }
    }

    #[test]
    fn high_bits_are_dropped_by_shifted_mask() {
        // 0b11 at bit 15 only keeps bit 15.
        assert_eq!(extract_bits(0xC000, 15, 0b11), 1);
        assert_eq!(extract_bits(0xFFFF, 14, 0b11), 0b11);
    }

    #[test]
    fn single_bits() {
        assert_eq!(extract_bits(0x8000, 15, 0b1), 1);
        assert_eq!(extract_bits(0x7FFF, 15, 0b1), 0);
        assert_eq!(extract_bits(0x0001, 0, 0b1), 1);
    }
}
