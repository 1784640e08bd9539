//! Protocol packet layout.
//!
//! | Offset | Field     | Width                |
//! |--------|-----------|----------------------|
//! | 0x00   | `LEN`     | 1                    |
//! | 0x01   | `MSGID`   | 1                    |
//! | 0x02   | `CTL`     | 1                    |
//! | 0x03   | `TYPE`    | 1                    |
//! | 0x04   | `SRC`     | 3 (24-bit BE)        |
//! | 0x07   | `DST`     | 3 (24-bit BE)        |
//! | 0x0A   | `PAYLOAD` | `LEN - 9`            |
//!
//! `LEN` counts every byte after itself, so a frame on the wire is `LEN + 1`
//! bytes long. The free functions work on any slice of at least [`PAYLOAD`]
//! bytes; [`Packet`] wraps a fixed buffer and keeps `LEN` consistent.

use thiserror::Error;

use crate::crc::{crc16, CRC16_INIT};

pub const LEN: usize = 0x00;
pub const MSGID: usize = 0x01;
pub const CTL: usize = 0x02;
pub const TYPE: usize = 0x03;
pub const SRC: usize = 0x04;
pub const DST: usize = 0x07;
pub const PAYLOAD: usize = 0x0A;

/// Header bytes counted by `LEN` (everything between `LEN` and `PAYLOAD`).
pub const LEN_OVERHEAD: u8 = (PAYLOAD - 1) as u8;
/// Largest frame `LEN` can describe.
pub const PACKET_CAPACITY: usize = u8::MAX as usize + 1;
pub const MAX_PAYLOAD: usize = PACKET_CAPACITY - PAYLOAD;
/// Largest value a 24-bit address field holds.
pub const ADDR_MAX: u32 = 0x00FF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("frame of {len} bytes is shorter than the 10-byte header")]
    ShortFrame { len: usize },
    #[error("LEN {declared} is below the header size 9")]
    InvalidLen { declared: u8 },
    #[error("LEN {declared} runs past the end of a {len}-byte frame")]
    Truncated { declared: u8, len: usize },
    #[error("payload of {len} bytes exceeds 246")]
    PayloadTooLarge { len: usize },
}

// ─── Slice accessors ────────────────────────────────────────────────────────

#[inline(always)]
fn addr24(buf: &[u8], at: usize) -> u32 {
    (buf[at] as u32) << 16 | (buf[at + 1] as u32) << 8 | buf[at + 2] as u32
}

#[inline(always)]
fn set_addr24(buf: &mut [u8], at: usize, v: u32) {
    buf[at] = (v >> 16) as u8;
    buf[at + 1] = (v >> 8) as u8;
    buf[at + 2] = v as u8;
}

/// Source address. Bits above 24 are not stored by [`set_src`].
#[inline(always)]
pub fn src(buf: &[u8]) -> u32 {
    addr24(buf, SRC)
}

#[inline(always)]
pub fn set_src(buf: &mut [u8], v: u32) {
    set_addr24(buf, SRC, v)
}

#[inline(always)]
pub fn dst(buf: &[u8]) -> u32 {
    addr24(buf, DST)
}

#[inline(always)]
pub fn set_dst(buf: &mut [u8], v: u32) {
    set_addr24(buf, DST, v)
}

/// `LEN - 9`; a `LEN` below the header size reads as an empty payload.
#[inline(always)]
pub fn payload_len(buf: &[u8]) -> u8 {
    buf[LEN].saturating_sub(LEN_OVERHEAD)
}

#[inline(always)]
pub fn set_len_from_payload_len(buf: &mut [u8], n: u8) {
    debug_assert!(n as usize <= MAX_PAYLOAD, "payload length {n} overflows LEN");
    buf[LEN] = n.wrapping_add(LEN_OVERHEAD);
}

// ─── Typed packet ───────────────────────────────────────────────────────────

/// A protocol frame in a fixed [`PACKET_CAPACITY`]-byte buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    buf: [u8; PACKET_CAPACITY],
}

impl Packet {
    /// Empty frame: zeroed header, no payload.
    pub fn new() -> Self {
        let mut buf = [0u8; PACKET_CAPACITY];
        buf[LEN] = LEN_OVERHEAD;
        Packet { buf }
    }

    /// Copy a received frame. Bytes after `LEN + 1` are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < PAYLOAD {
            return Err(PacketError::ShortFrame { len: bytes.len() });
        }
        let declared = bytes[LEN];
        if declared < LEN_OVERHEAD {
            return Err(PacketError::InvalidLen { declared });
        }
        let frame_len = declared as usize + 1;
        if bytes.len() < frame_len {
            return Err(PacketError::Truncated { declared, len: bytes.len() });
        }
        let mut buf = [0u8; PACKET_CAPACITY];
        buf[..frame_len].copy_from_slice(&bytes[..frame_len]);
        Ok(Packet { buf })
    }

    pub fn len_field(&self) -> u8 {
        self.buf[LEN]
    }

    pub fn msgid(&self) -> u8 {
        self.buf[MSGID]
    }

    pub fn set_msgid(&mut self, v: u8) {
        self.buf[MSGID] = v;
    }

    pub fn ctl(&self) -> u8 {
        self.buf[CTL]
    }

    pub fn set_ctl(&mut self, v: u8) {
        self.buf[CTL] = v;
    }

    pub fn msg_type(&self) -> u8 {
        self.buf[TYPE]
    }

    pub fn set_msg_type(&mut self, v: u8) {
        self.buf[TYPE] = v;
    }

    pub fn src(&self) -> u32 {
        src(&self.buf)
    }

    pub fn set_src(&mut self, v: u32) {
        set_src(&mut self.buf, v)
    }

    pub fn dst(&self) -> u32 {
        dst(&self.buf)
    }

    pub fn set_dst(&mut self, v: u32) {
        set_dst(&mut self.buf, v)
    }

    pub fn payload_len(&self) -> u8 {
        payload_len(&self.buf)
    }

    pub fn set_len_from_payload_len(&mut self, n: u8) -> Result<(), PacketError> {
        if n as usize > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge { len: n as usize });
        }
        set_len_from_payload_len(&mut self.buf, n);
        Ok(())
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf[PAYLOAD..PAYLOAD + self.payload_len() as usize]
    }

    /// Replace the payload and update `LEN` to match.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), PacketError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(PacketError::PayloadTooLarge { len: payload.len() });
        }
        self.buf[PAYLOAD..PAYLOAD + payload.len()].copy_from_slice(payload);
        set_len_from_payload_len(&mut self.buf, payload.len() as u8);
        Ok(())
    }

    /// The frame as sent: `LEN + 1` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..PAYLOAD + self.payload_len() as usize]
    }

    /// CRC16 of the frame from [`CRC16_INIT`].
    pub fn crc16(&self) -> u16 {
        crc16(self.as_bytes(), CRC16_INIT)
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.len_field())
            .field("msgid", &self.msgid())
            .field("ctl", &format_args!("{:#04x}", self.ctl()))
            .field("type", &format_args!("{:#04x}", self.msg_type()))
            .field("src", &format_args!("{:06X}", self.src()))
            .field("dst", &format_args!("{:06X}", self.dst()))
            .field("payload", &self.payload())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_field_offsets() {
        let mut buf = [0u8; 16];
        buf[LEN] = 0x15;
        buf[MSGID] = 0x42;
        buf[CTL] = 0xA4;
        buf[TYPE] = 0x11;
        assert_eq!(&buf[..4], &[0x15, 0x42, 0xA4, 0x11]);
        assert_eq!(PAYLOAD, 0x0A);
    }

    #[test]
    fn test_src_dst_big_endian() {
        let mut buf = [0u8; 16];
        set_src(&mut buf, 0x123456);
        set_dst(&mut buf, 0xABCDEF);
        assert_eq!(&buf[4..10], &[0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF]);
        assert_eq!(src(&buf), 0x123456);
        assert_eq!(dst(&buf), 0xABCDEF);
    }

    #[test]
    fn test_src_dst_zero_over_ones() {
        let mut buf = [0xFFu8; 16];
        set_src(&mut buf, 0);
        set_dst(&mut buf, 0);
        assert_eq!(src(&buf), 0);
        assert_eq!(dst(&buf), 0);
        assert_eq!(buf[TYPE], 0xFF);
        assert_eq!(buf[PAYLOAD], 0xFF);
    }

    #[test]
    fn test_src_dst_independent() {
        let mut buf = [0u8; 16];
        set_src(&mut buf, 0xAABBCC);
        set_dst(&mut buf, 0x112233);
        set_src(&mut buf, 0x000000);
        assert_eq!(dst(&buf), 0x112233);
        set_dst(&mut buf, ADDR_MAX);
        assert_eq!(src(&buf), 0);
    }

    #[test]
    fn test_payload_len_round_trip() {
        let mut buf = [0u8; 16];
        for (n, len) in [(0u8, 9u8), (10, 19), (37, 46)] {
            set_len_from_payload_len(&mut buf, n);
            assert_eq!(buf[LEN], len);
            assert_eq!(payload_len(&buf), n);
        }
    }

    #[test]
    fn test_payload_len_below_header() {
        let buf = [3u8; 16];
        assert_eq!(payload_len(&buf), 0);
    }

    #[test]
    fn test_packet_build() {
        let mut p = Packet::new();
        assert_eq!(p.as_bytes().len(), PAYLOAD);
        p.set_msgid(0x42);
        p.set_ctl(0xA0);
        p.set_msg_type(0x11);
        p.set_src(0x123456);
        p.set_dst(0xABCDEF);
        p.set_payload(&[0x02, 0x01]).unwrap();
        assert_eq!(
            p.as_bytes(),
            &[0x0B, 0x42, 0xA0, 0x11, 0x12, 0x34, 0x56, 0xAB, 0xCD, 0xEF, 0x02, 0x01]
        );
        assert_eq!(p.payload(), &[0x02, 0x01]);
        assert_eq!(p.crc16(), crc16(p.as_bytes(), CRC16_INIT));
    }

    #[test]
    fn test_packet_payload_limits() {
        let mut p = Packet::new();
        assert!(p.set_payload(&[0u8; MAX_PAYLOAD]).is_ok());
        assert_eq!(p.len_field(), u8::MAX);
        assert_eq!(p.as_bytes().len(), PACKET_CAPACITY);
        assert_eq!(
            p.set_payload(&[0u8; MAX_PAYLOAD + 1]),
            Err(PacketError::PayloadTooLarge { len: MAX_PAYLOAD + 1 })
        );
        assert_eq!(
            p.set_len_from_payload_len(247),
            Err(PacketError::PayloadTooLarge { len: 247 })
        );
        p.set_len_from_payload_len(37).unwrap();
        assert_eq!(p.len_field(), 46);
    }

    #[test]
    fn test_packet_from_bytes() {
        let frame = [0x0A, 0x01, 0x80, 0x02, 0, 0, 1, 0, 0, 2, 0x55, 0xEE];
        let p = Packet::from_bytes(&frame).unwrap();
        assert_eq!(p.payload(), &[0x55]);
        assert_eq!(p.src(), 1);
        assert_eq!(p.dst(), 2);
        assert_eq!(p.as_bytes(), &frame[..11]);

        assert_eq!(Packet::from_bytes(&frame[..5]), Err(PacketError::ShortFrame { len: 5 }));
        assert_eq!(
            Packet::from_bytes(&[0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(PacketError::InvalidLen { declared: 8 })
        );
        assert_eq!(
            Packet::from_bytes(&[0x0C, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]),
            Err(PacketError::Truncated { declared: 12, len: 11 })
        );
    }

    proptest! {
        #[test]
        fn test_src_dst_never_interfere(a in 0u32..=ADDR_MAX, b in 0u32..=ADDR_MAX, c in 0u32..=ADDR_MAX) {
            let mut buf = [0u8; PAYLOAD];
            set_src(&mut buf, a);
            set_dst(&mut buf, b);
            prop_assert_eq!(src(&buf), a);
            prop_assert_eq!(dst(&buf), b);
            set_src(&mut buf, c);
            prop_assert_eq!(dst(&buf), b);
            prop_assert_eq!(src(&buf), c);
        }
    }
}
