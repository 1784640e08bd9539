//! ASCII hex digit ⇄ nibble conversion.
//!
//! The conversions never fail. Callers that need to reject bad input check
//! [`validate_nibble`] first; [`ascii_to_nibble`] folds anything it does not
//! recognize to zero.

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Map an ASCII hex digit (either case) to its value, or 0 if `c` is not one.
#[inline]
pub fn ascii_to_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'A'..=b'F' => c - b'A' + 10,
        b'a'..=b'f' => c - b'a' + 10,
        _ => 0,
    }
}

/// Map the low 4 bits of `n` to an uppercase ASCII hex digit.
#[inline]
pub fn nibble_to_ascii(n: u8) -> u8 {
    HEX_UPPER[(n & 0x0F) as usize]
}

/// True iff `c` is one of `0-9`, `A-F`, `a-f`.
#[inline]
pub fn validate_nibble(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

/// Combine two validated hex digits into one byte, high nibble first.
#[inline]
pub fn pair_to_byte(hi: u8, lo: u8) -> u8 {
    (ascii_to_nibble(hi) << 4) | ascii_to_nibble(lo)
}
