//! Intel HEX record parser.
//!
//! Parses one textual record (`:LLAAAATT[DD...]CC`) at a time. Every digit is
//! checked with [`validate_nibble`] before it is combined, and the byte sum of
//! length, address, type and data plus the recorded checksum must be zero
//! modulo 256.

use crate::error::{FirmwareError, Result};
use crate::nibble::{pair_to_byte, validate_nibble};

/// Bytes in a record besides its data: length, address (2), type, checksum.
const RECORD_OVERHEAD: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// 00: data bytes placed at the record address
    Data,
    /// 01: no further records are read
    EndOfFile,
    /// 02: base address = value << 4
    ExtendedSegmentAddress,
    /// 03: CS:IP entry point, irrelevant for flashing
    StartSegmentAddress,
    /// 04: base address = value << 16
    ExtendedLinearAddress,
    /// 05: EIP entry point, irrelevant for flashing
    StartLinearAddress,
    Other(u8),
}

impl From<u8> for RecordType {
    fn from(v: u8) -> Self {
        match v {
            0x00 => RecordType::Data,
            0x01 => RecordType::EndOfFile,
            0x02 => RecordType::ExtendedSegmentAddress,
            0x03 => RecordType::StartSegmentAddress,
            0x04 => RecordType::ExtendedLinearAddress,
            0x05 => RecordType::StartLinearAddress,
            other => RecordType::Other(other),
        }
    }
}

impl RecordType {
    pub fn code(self) -> u8 {
        match self {
            RecordType::Data => 0x00,
            RecordType::EndOfFile => 0x01,
            RecordType::ExtendedSegmentAddress => 0x02,
            RecordType::StartSegmentAddress => 0x03,
            RecordType::ExtendedLinearAddress => 0x04,
            RecordType::StartLinearAddress => 0x05,
            RecordType::Other(v) => v,
        }
    }
}

/// A single decoded record. Not retained past image assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexRecord {
    pub record_type: RecordType,
    pub address: u16,
    pub data: Vec<u8>,
    /// Checksum byte as written in the record.
    pub checksum: u8,
    pub checksum_ok: bool,
}

impl HexRecord {
    /// Parse one record. `line` is the 1-based line number used in errors.
    ///
    /// Structural problems (missing `:`, bad digit, odd digit count, length
    /// disagreeing with the data) are errors. A wrong checksum is not: it is
    /// reported through `checksum_ok` so the caller decides.
    pub fn parse(text: &str, line: usize) -> Result<Self> {
        let text = text.trim();
        let digits = text
            .strip_prefix(':')
            .ok_or(FirmwareError::MissingStartCode { line })?
            .as_bytes();

        if let Some(pos) = digits.iter().position(|&c| !validate_nibble(c)) {
            // everything before `pos` is ASCII, so it is a char boundary
            let found = text[1 + pos..].chars().next().unwrap_or(digits[pos] as char);
            return Err(FirmwareError::InvalidHexDigit { line, column: pos + 2, found });
        }
        if digits.len() % 2 != 0 {
            return Err(FirmwareError::ShortRecord { line, len: digits.len() / 2 });
        }

        let bytes: Vec<u8> = digits
            .chunks_exact(2)
            .map(|pair| pair_to_byte(pair[0], pair[1]))
            .collect();
        if bytes.len() < RECORD_OVERHEAD {
            return Err(FirmwareError::ShortRecord { line, len: bytes.len() });
        }

        let declared = bytes[0] as usize;
        let actual = bytes.len() - RECORD_OVERHEAD;
        if declared != actual {
            return Err(FirmwareError::LengthMismatch { line, declared, actual });
        }

        let (body, tail) = bytes.split_at(bytes.len() - 1);
        let checksum = tail[0];
        let computed = record_checksum(body);

        Ok(HexRecord {
            record_type: RecordType::from(body[3]),
            address: u16::from_be_bytes([body[1], body[2]]),
            data: body[4..].to_vec(),
            checksum,
            checksum_ok: computed == checksum,
        })
    }

    /// The checksum the record should carry, from its decoded fields.
    pub fn computed_checksum(&self) -> u8 {
        let [hi, lo] = self.address.to_be_bytes();
        let mut body = Vec::with_capacity(4 + self.data.len());
        body.extend_from_slice(&[self.data.len() as u8, hi, lo, self.record_type.code()]);
        body.extend_from_slice(&self.data);
        record_checksum(&body)
    }

    /// Base address carried by a type 02 or 04 record.
    pub fn base_address(&self, line: usize) -> Result<u32> {
        let value = match self.data[..] {
            [hi, lo] => u16::from_be_bytes([hi, lo]) as u32,
            _ => {
                return Err(FirmwareError::InvalidAddressRecord {
                    line,
                    record_type: self.record_type.code(),
                    len: self.data.len(),
                })
            }
        };
        match self.record_type {
            RecordType::ExtendedSegmentAddress => Ok(value << 4),
            RecordType::ExtendedLinearAddress => Ok(value << 16),
            other => Err(FirmwareError::UnsupportedRecordType { line, record_type: other.code() }),
        }
    }
}

/// Two's complement of the byte sum, so that sum + checksum == 0 (mod 256).
fn record_checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)).wrapping_neg()
}

/// Iterate the records of a HEX text, skipping blank lines.
///
/// Yields `(line_number, record)`; iteration continues past errors so the
/// caller chooses where to stop.
pub fn records(text: &str) -> impl Iterator<Item = (usize, Result<HexRecord>)> + '_ {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| (i + 1, HexRecord::parse(l, i + 1)))
}
