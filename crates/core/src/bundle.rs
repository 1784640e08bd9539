//! Decoded firmware bundles.
//!
//! A bundle stores a decoded [`FirmwareImage`] together with the profile it
//! was decoded for, so the process that talks to the bootloader does not
//! need to parse the source file again.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "HMFW"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::FirmwareImage;
use crate::error::{FirmwareError, Result};
use crate::profile::DeviceProfile;

const MAGIC: &[u8; 4] = b"HMFW";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub profile: DeviceProfile,
    pub firmware: FirmwareImage,
}

impl Bundle {
    pub fn new(profile: DeviceProfile, firmware: FirmwareImage) -> Self {
        Bundle { profile, firmware }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)
            .map_err(|e| FirmwareError::Bundle(format!("serialize: {e}")))?;
        let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    /// Parse a bundle, checking magic, version and that it was decoded for
    /// `expected`.
    pub fn from_bytes(data: &[u8], expected: DeviceProfile) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(FirmwareError::Bundle("file too small".into()));
        }
        if &data[0..4] != MAGIC {
            return Err(FirmwareError::Bundle("bad magic".into()));
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != FORMAT_VERSION {
            return Err(FirmwareError::Bundle(format!(
                "unsupported version {version} (expected {FORMAT_VERSION})"
            )));
        }

        let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
            .map_err(|e| FirmwareError::Bundle(format!("decompress: {e:?}")))?;
        let bundle: Bundle = bincode::deserialize(&decompressed)
            .map_err(|e| FirmwareError::Bundle(format!("deserialize: {e}")))?;

        if bundle.profile != expected {
            return Err(FirmwareError::Bundle(format!(
                "profile mismatch: bundle={} current={}",
                bundle.profile, expected
            )));
        }
        Ok(bundle)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, &bytes).map_err(|source| FirmwareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), blocks = self.firmware.len(), "saved bundle");
        Ok(())
    }

    pub fn load_from_file(path: &Path, expected: DeviceProfile) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| FirmwareError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data, expected)
    }
}

/// `firmware.ihex` → `firmware.bundle`, next to the source file.
pub fn bundle_path(firmware_path: &Path) -> std::path::PathBuf {
    firmware_path.with_extension("bundle")
}
