//! Firmware file decoding.
//!
//! Two source formats are supported, selected by the device profile:
//!
//! - **Intel HEX** (any profile with a geometry): records are folded into a
//!   flat image of `image_size` bytes, pre-filled with `0xFF`, which is then
//!   cut into `block_length`-byte blocks.
//! - **Pre-chunked binary** ([`DeviceProfile::Unknown`]): the file is a plain
//!   concatenation of `number (u16 BE) ++ length (u16 BE) ++ data` records,
//!   each of which becomes one block unchanged.
//!
//! Any error aborts the whole decode; nothing partially built is returned.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::block::{chunk, Block, FirmwareImage, BLOCK_HEADER_LEN, ERASED_BYTE};
use crate::crc::{crc16, CRC16_INIT};
use crate::error::{FirmwareError, Result};
use crate::hex::{records, RecordType};
use crate::profile::{DeviceProfile, FlashGeometry};

/// What to do with HEX records that are neither data nor end-of-file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordPolicy {
    /// Reject the file.
    #[default]
    Strict,
    /// Log and skip the record.
    Permissive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub record_policy: RecordPolicy,
    /// Store the CRC16 of the image in its last two bytes (little-endian)
    /// before chunking.
    pub image_crc: bool,
}

/// Source data after format-specific parsing, before blocks are produced.
enum Format {
    PreChunked(Vec<Block>),
    FlatImage { image: Vec<u8>, block_length: usize },
}

impl Format {
    fn parse(data: &[u8], profile: DeviceProfile, options: &DecodeOptions) -> Result<Self> {
        match profile.geometry() {
            None => read_prechunked(data).map(Format::PreChunked),
            Some(geometry) => {
                let text = String::from_utf8_lossy(data);
                let mut image = build_flat_image(&text, geometry, options.record_policy)?;
                if options.image_crc {
                    store_image_crc(&mut image);
                }
                Ok(Format::FlatImage { image, block_length: geometry.block_length })
            }
        }
    }

    fn into_image(self) -> FirmwareImage {
        match self {
            Format::PreChunked(blocks) => FirmwareImage::from_blocks(blocks),
            Format::FlatImage { image, block_length } => chunk(&image, block_length),
        }
    }
}

/// Decode a firmware file from disk.
pub fn read_firmware(path: impl AsRef<Path>, profile: DeviceProfile, options: &DecodeOptions) -> Result<FirmwareImage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| FirmwareError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = data.len(), %profile, "read firmware file");
    decode(&data, profile, options)
}

/// Decode firmware file contents already in memory.
pub fn decode(data: &[u8], profile: DeviceProfile, options: &DecodeOptions) -> Result<FirmwareImage> {
    let fw = Format::parse(data, profile, options)?.into_image();
    info!(%profile, blocks = fw.len(), bytes = fw.total_payload(), "decoded firmware");
    Ok(fw)
}

/// Assemble the flat image described by a HEX text.
///
/// Bytes no record writes keep the erased value `0xFF`. Reading stops at the
/// first end-of-file record. Extended segment (02) and extended linear (04)
/// records move the base added to later data addresses; start address
/// records (03, 05) are ignored.
pub fn build_flat_image(text: &str, geometry: FlashGeometry, policy: RecordPolicy) -> Result<Vec<u8>> {
    let mut image = vec![ERASED_BYTE; geometry.image_size];
    let mut base: u32 = 0;

    for (line, record) in records(text) {
        let record = record?;
        if !record.checksum_ok {
            return Err(FirmwareError::ChecksumMismatch {
                line,
                recorded: record.checksum,
                computed: record.computed_checksum(),
            });
        }

        match record.record_type {
            RecordType::Data => {
                let address = base + record.address as u32;
                let start = address as usize;
                let end = start + record.data.len();
                if end > geometry.image_size {
                    return Err(FirmwareError::OutOfRange {
                        line,
                        address,
                        len: record.data.len(),
                        image_size: geometry.image_size,
                    });
                }
                image[start..end].copy_from_slice(&record.data);
                debug!(line, address = start, len = record.data.len(), "data record");
            }
            RecordType::ExtendedSegmentAddress | RecordType::ExtendedLinearAddress => {
                base = record.base_address(line)?;
                debug!(line, base, "base address");
            }
            RecordType::StartSegmentAddress | RecordType::StartLinearAddress => {
                debug!(line, "ignoring start address record");
            }
            RecordType::EndOfFile => {
                debug!(line, "end of file record");
                break;
            }
            RecordType::Other(record_type) => match policy {
                RecordPolicy::Strict => {
                    return Err(FirmwareError::UnsupportedRecordType { line, record_type });
                }
                RecordPolicy::Permissive => {
                    warn!(line, record_type, "skipping unsupported record");
                }
            },
        }
    }

    Ok(image)
}

/// Split a pre-chunked binary file into its blocks.
///
/// Block numbers must not decrease and every declared length must fit in
/// the remaining input.
pub fn read_prechunked(data: &[u8]) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    let mut previous: Option<u16> = None;

    while pos < data.len() {
        let remaining = data.len() - pos;
        if remaining < BLOCK_HEADER_LEN {
            return Err(FirmwareError::TruncatedBlock {
                offset: pos,
                declared: BLOCK_HEADER_LEN,
                remaining,
            });
        }

        let number = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let start = pos + BLOCK_HEADER_LEN;
        if len > data.len() - start {
            return Err(FirmwareError::TruncatedBlock {
                offset: pos,
                declared: len,
                remaining: data.len() - start,
            });
        }
        if let Some(prev) = previous {
            if number < prev {
                return Err(FirmwareError::BlockOrder { previous: prev, found: number });
            }
        }

        debug!(block = number, len, offset = pos, "pre-chunked block");
        blocks.push(Block::new(number, data[start..start + len].to_vec())?);
        previous = Some(number);
        pos = start + len;
    }

    Ok(blocks)
}

/// Overwrite the last two image bytes with the CRC16 of everything before.
fn store_image_crc(image: &mut [u8]) {
    let Some(body_len) = image.len().checked_sub(2) else {
        return;
    };
    let crc = crc16(&image[..body_len], CRC16_INIT);
    image[body_len..].copy_from_slice(&crc.to_le_bytes());
    debug!("stored image crc {crc:#06x}");
}
