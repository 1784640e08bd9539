//! Error taxonomy for firmware decoding.
//!
//! Every variant is fatal for the decode that raised it: a corrupted image is
//! never partially accepted. The checksum and nibble helpers are infallible
//! and do not appear here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FirmwareError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: invalid hex digit {found:?} at column {column}")]
    InvalidHexDigit { line: usize, column: usize, found: char },

    #[error("line {line}: record does not start with ':'")]
    MissingStartCode { line: usize },

    #[error("line {line}: record too short ({len} bytes)")]
    ShortRecord { line: usize, len: usize },

    #[error("line {line}: record declares {declared} data bytes but carries {actual}")]
    LengthMismatch { line: usize, declared: usize, actual: usize },

    #[error("line {line}: checksum mismatch (recorded {recorded:#04x}, computed {computed:#04x})")]
    ChecksumMismatch { line: usize, recorded: u8, computed: u8 },

    #[error("line {line}: unsupported record type {record_type:#04x}")]
    UnsupportedRecordType { line: usize, record_type: u8 },

    #[error("line {line}: address record type {record_type:#04x} carries {len} bytes, expected 2")]
    InvalidAddressRecord { line: usize, record_type: u8, len: usize },

    #[error("line {line}: {len} bytes at {address:#06x} exceed image size {image_size:#x}")]
    OutOfRange { line: usize, address: u32, len: usize, image_size: usize },

    #[error("block at offset {offset}: declares {declared} bytes, only {remaining} remain")]
    TruncatedBlock { offset: usize, declared: usize, remaining: usize },

    #[error("block number {found} follows block {previous}")]
    BlockOrder { previous: u16, found: u16 },

    #[error("block payload of {len} bytes does not fit a 16-bit length field")]
    BlockTooLarge { len: usize },

    #[error("unknown device profile {name:?}")]
    InvalidProfile { name: String },

    #[error("bundle: {0}")]
    Bundle(String),
}

pub type Result<T, E = FirmwareError> = std::result::Result<T, E>;
