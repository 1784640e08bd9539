//! Device profiles: per-microcontroller flash geometry.
//!
//! | Profile       | Image size | Block length |
//! |---------------|------------|--------------|
//! | `unknown`     | —          | —            |
//! | `atmega328p`  | 0x7000     | 128          |
//! | `atmega644p`  | 0xF000     | 256          |
//! | `atmega1284p` | 0x1F000    | 256          |
//!
//! The image size is the application area below the bootloader, not the
//! full flash. `unknown` carries no geometry and selects the pre-chunked
//! binary format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FirmwareError;

/// Flash layout used to assemble and chunk a flat image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashGeometry {
    /// Total addressable application bytes.
    pub image_size: usize,
    /// Bytes per bootloader transfer block.
    pub block_length: usize,
}

impl FlashGeometry {
    /// Number of blocks a flat image of this geometry splits into.
    pub fn block_count(&self) -> usize {
        self.image_size.div_ceil(self.block_length)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceProfile {
    /// No geometry; the file is already split into blocks.
    Unknown,
    /// ATmega328P (32 KB flash, 4 KB boot section)
    Atmega328p,
    /// ATmega644P (64 KB flash, 4 KB boot section)
    Atmega644p,
    /// ATmega1284P (128 KB flash, 4 KB boot section)
    Atmega1284p,
}

impl DeviceProfile {
    pub const ALL: [DeviceProfile; 4] = [
        DeviceProfile::Unknown,
        DeviceProfile::Atmega328p,
        DeviceProfile::Atmega644p,
        DeviceProfile::Atmega1284p,
    ];

    pub fn geometry(self) -> Option<FlashGeometry> {
        match self {
            DeviceProfile::Unknown => None,
            DeviceProfile::Atmega328p => Some(FlashGeometry { image_size: 0x7000, block_length: 128 }),
            DeviceProfile::Atmega644p => Some(FlashGeometry { image_size: 0xF000, block_length: 256 }),
            DeviceProfile::Atmega1284p => Some(FlashGeometry { image_size: 0x1F000, block_length: 256 }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceProfile::Unknown => "unknown",
            DeviceProfile::Atmega328p => "atmega328p",
            DeviceProfile::Atmega644p => "atmega644p",
            DeviceProfile::Atmega1284p => "atmega1284p",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceProfile {
    type Err = FirmwareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::by_name(s).ok_or_else(|| FirmwareError::InvalidProfile { name: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atmega328p_geometry() {
        let g = DeviceProfile::Atmega328p.geometry().unwrap();
        assert_eq!(g.image_size, 0x7000);
        assert_eq!(g.block_length, 128);
        assert_eq!(g.block_count(), 224);
    }

    #[test]
    fn test_atmega1284p_geometry() {
        let g = DeviceProfile::Atmega1284p.geometry().unwrap();
        assert_eq!(g.image_size, 0x1F000);
        assert_eq!(g.block_count(), 496);
    }

    #[test]
    fn test_unknown_has_no_geometry() {
        assert!(DeviceProfile::Unknown.geometry().is_none());
    }

    #[test]
    fn test_table_block_lengths_are_valid() {
        for profile in DeviceProfile::ALL {
            if let Some(g) = profile.geometry() {
                assert!(g.block_length > 0, "{profile}");
                assert!(g.block_length <= u16::MAX as usize, "{profile}");
                assert!(g.image_size > 0, "{profile}");
                assert!(g.block_count() <= u16::MAX as usize + 1, "{profile}");
            }
        }
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(DeviceProfile::by_name("ATmega328P"), Some(DeviceProfile::Atmega328p));
        assert_eq!(DeviceProfile::by_name("atmega1284p"), Some(DeviceProfile::Atmega1284p));
        assert_eq!("unknown".parse::<DeviceProfile>().unwrap(), DeviceProfile::Unknown);
        assert!(matches!(
            "atmega2560".parse::<DeviceProfile>(),
            Err(FirmwareError::InvalidProfile { .. })
        ));
    }
}
