//! CRC16 over firmware regions and protocol frames.
//!
//! Polynomial 0x1021, MSB first, data bits shifted in without augmentation.
//! The accumulator is caller supplied so a checksum can be continued across
//! buffer boundaries: `crc16(b, crc16(a, init))` equals `crc16(a ++ b, init)`.

/// Canonical starting accumulator for a fresh packet or firmware region.
pub const CRC16_INIT: u16 = 0xFFFF;
/// Generator polynomial (x^16 + x^12 + x^5 + 1).
pub const CRC16_POLY: u16 = 0x1021;

pub fn crc16(data: &[u8], init: u16) -> u16 {
    data.iter().fold(init, |crc, &byte| update(crc, byte))
}

#[inline]
fn update(mut crc: u16, mut byte: u8) -> u16 {
    for _ in 0..8 {
        let carry = crc & 0x8000 != 0;
        crc <<= 1;
        if byte & 0x80 != 0 {
            crc |= 1;
        }
        if carry {
            crc ^= CRC16_POLY;
        }
        byte <<= 1;
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_crc16_empty_returns_init() {
        assert_eq!(crc16(&[], CRC16_INIT), CRC16_INIT);
        assert_eq!(crc16(&[], 0x0000), 0x0000);
        assert_eq!(crc16(&[], 0x1234), 0x1234);
    }

    #[test]
    fn test_crc16_deterministic() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(crc16(&data, CRC16_INIT), crc16(&data, CRC16_INIT));
    }

    #[test]
    fn test_crc16_sensitive_to_data_and_init() {
        assert_ne!(crc16(&[0x00], CRC16_INIT), crc16(&[0x01], CRC16_INIT));
        assert_ne!(crc16(&[0x41], 0x0000), crc16(&[0x41], 0xFFFF));
        assert_ne!(crc16(&[0xDE, 0xAD], CRC16_INIT), crc16(&[0xAD, 0xDE], CRC16_INIT));
    }

    #[test]
    fn test_crc16_zero_init_zero_data() {
        // shift-in without augmentation keeps an all-zero register at zero
        assert_eq!(crc16(&[0, 0, 0], 0), 0);
    }

    #[test]
    fn test_crc16_single_byte_long_hand() {
        assert_eq!(crc16(&[0x01], 0x0000), 0x0001);
        // carries on the 1st and 5th shift fold the polynomial in twice
        assert_eq!(crc16(&[0x00], 0x8000), 0x9188);
    }

    #[test]
    fn test_crc16_continues_across_buffers() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50];
        let whole = crc16(&data, CRC16_INIT);
        let split = crc16(&data[2..], crc16(&data[..2], CRC16_INIT));
        assert_eq!(whole, split);
    }

    proptest! {
        #[test]
        fn test_crc16_does_not_mutate_input(data in proptest::collection::vec(any::<u8>(), 0..64), init in any::<u16>()) {
            let copy = data.clone();
            let _ = crc16(&data, init);
            prop_assert_eq!(data, copy);
        }
    }
}
