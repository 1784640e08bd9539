//! Bootloader transfer blocks.
//!
//! On the wire each block is framed as
//!
//! ```text
//! +------------------+------------------+-----------------+
//! | block number     | payload length   | payload         |
//! | u16 big-endian   | u16 big-endian   | length bytes    |
//! +------------------+------------------+-----------------+
//! ```
//!
//! A [`FirmwareImage`] is the ordered list of blocks from one decode. It is
//! returned by value and owns its blocks outright.

use serde::{Deserialize, Serialize};

use crate::crc::crc16;
use crate::error::{FirmwareError, Result};

/// Value of flash bytes that were never programmed.
pub const ERASED_BYTE: u8 = 0xFF;
/// Bytes preceding the payload in a serialized block.
pub const BLOCK_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    number: u16,
    payload: Vec<u8>,
}

impl Block {
    /// Fails if the payload length does not fit the 16-bit length field.
    pub fn new(number: u16, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > u16::MAX as usize {
            return Err(FirmwareError::BlockTooLarge { len: payload.len() });
        }
        Ok(Block { number, payload })
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> u16 {
        self.payload.len() as u16
    }

    /// Append the serialized block to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.reserve(BLOCK_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.number.to_be_bytes());
        out.extend_from_slice(&self.payload_len().to_be_bytes());
        out.extend_from_slice(&self.payload);
    }

    /// Serialized form: number, length, payload.
    pub fn frame(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

/// Decoded firmware: blocks in transfer order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareImage {
    blocks: Vec<Block>,
}

impl FirmwareImage {
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        FirmwareImage { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Sum of payload bytes over all blocks.
    pub fn total_payload(&self) -> usize {
        self.blocks.iter().map(|b| b.payload.len()).sum()
    }

    /// Serialized frame of every block, in order.
    pub fn iter_frames(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.blocks.iter().map(Block::frame)
    }

    /// All frames concatenated; for the pre-chunked format this reproduces
    /// the source file byte for byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_payload() + BLOCK_HEADER_LEN * self.len());
        for block in &self.blocks {
            block.write_to(&mut out);
        }
        out
    }

    /// CRC16 over the payloads in order, continuing from `init`.
    pub fn crc16(&self, init: u16) -> u16 {
        self.blocks.iter().fold(init, |crc, b| crc16(&b.payload, crc))
    }
}

impl IntoIterator for FirmwareImage {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

/// Split a flat image into `block_length`-byte blocks numbered from 0.
///
/// The final block is padded with [`ERASED_BYTE`]. `block_length` comes from
/// the static profile table and must be in `1..=u16::MAX`.
pub fn chunk(image: &[u8], block_length: usize) -> FirmwareImage {
    assert!(
        block_length > 0 && block_length <= u16::MAX as usize,
        "invalid block length {block_length} in device profile"
    );

    let blocks = image
        .chunks(block_length)
        .enumerate()
        .map(|(i, data)| {
            let mut payload = Vec::with_capacity(block_length);
            payload.extend_from_slice(data);
            payload.resize(block_length, ERASED_BYTE);
            Block { number: i as u16, payload }
        })
        .collect();

    FirmwareImage { blocks }
}
