//! # hmfw-core
//!
//! Firmware image decoding for HomeMatic USB configuration adapters and the
//! AVR bootloaders they drive.
//!
//! A firmware file is turned into an ordered list of bootloader transfer
//! blocks, each framed as `number (u16 BE) ++ length (u16 BE) ++ payload`.
//! Alongside the decoder the crate carries the CRC16 used for frame and image
//! integrity, and the fixed byte layout of the device's protocol packets.
//!
//! ## Architecture
//!
//! - [`nibble`] — ASCII hex digit ⇄ 4-bit value
//! - [`crc`] — CRC16 with a caller-supplied accumulator
//! - [`hex`] — Intel HEX record parser
//! - [`profile`] — [`DeviceProfile`] table (image size, block length)
//! - [`block`] — [`Block`], [`FirmwareImage`] and the flat-image chunker
//! - [`firmware`] — format selection and image assembly ([`read_firmware`])
//! - [`packet`] — protocol packet field layout ([`Packet`])
//! - [`bundle`] — decoded images persisted for a transport process
//!
//! ## Formats
//!
//! Profiles with a flash geometry read Intel HEX: records are written into a
//! `0xFF`-filled image of the profile's size, which is cut into equal blocks.
//! [`DeviceProfile::Unknown`] reads the pre-chunked binary format, where every
//! record in the file already is one block.
//!
//! Decoding is single-threaded and allocation-local; independent decodes can
//! run in parallel without coordination.

pub mod nibble;
pub mod crc;
pub mod hex;
pub mod profile;
pub mod block;
pub mod firmware;
pub mod packet;
pub mod bundle;
pub mod error;

pub use block::{Block, FirmwareImage, ERASED_BYTE};
pub use crc::{crc16, CRC16_INIT};
pub use error::{FirmwareError, Result};
pub use firmware::{decode, read_firmware, DecodeOptions, RecordPolicy};
pub use packet::{Packet, PacketError};
pub use profile::{DeviceProfile, FlashGeometry};
