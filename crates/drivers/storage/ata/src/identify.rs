//! IDENTIFY DEVICE / IDENTIFY PACKET DEVICE parsing

use alloc::string::String;
use alloc::vec::Vec;

/// Bytes per sector on ATA disks
pub const ATA_SECTOR_SIZE: u16 = 512;
/// Bytes per sector on ATAPI optical media
pub const ATAPI_SECTOR_SIZE: u16 = 2048;

/// Words in an IDENTIFY response
pub const IDENTIFY_WORDS: usize = 256;

/// Position of a unit on the cable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceIndex {
    Master = 0,
    Slave = 1,
}

impl DeviceIndex {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(DeviceIndex::Master),
            1 => Some(DeviceIndex::Slave),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Addressing capability, fixed when the unit is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Hard disk
    Ata {
        /// Words 60-61; zero when the unit has no 28-bit addressing
        lba28_sectors: u32,
        /// Words 100-103, present when word 83 bit 10 is set
        lba48_sectors: Option<u64>,
    },
    /// Packet device (optical drive)
    Atapi {
        /// From READ CAPACITY; zero with no medium
        total_sectors: u64,
    },
}

/// One probed unit on a bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub kind: DeviceKind,
    /// Highest UDMA mode the unit reports
    pub supported_udma: Option<u8>,
    /// UDMA mode programmed with SET FEATURES
    pub selected_udma: Option<u8>,
    pub sector_size: u16,
    /// Unit detected an 80-conductor cable (word 93 bit 13)
    pub cable_80_wire: bool,
    pub model: String,
    pub serial: String,
    pub firmware: String,
}

impl Device {
    /// Build a device from a raw IDENTIFY (or IDENTIFY PACKET) response
    pub fn from_identify(words: &[u16; IDENTIFY_WORDS], atapi: bool) -> Self {
        let kind = if atapi {
            DeviceKind::Atapi { total_sectors: 0 }
        } else {
            let lba28_sectors = (words[60] as u32) | ((words[61] as u32) << 16);
            let lba48_sectors = if words[83] & (1 << 10) != 0 {
                Some(
                    (words[100] as u64)
                        | ((words[101] as u64) << 16)
                        | ((words[102] as u64) << 32)
                        | ((words[103] as u64) << 48),
                )
            } else {
                None
            };
            DeviceKind::Ata { lba28_sectors, lba48_sectors }
        };

        // Word 88 is only meaningful when word 53 bit 2 says so
        let supported_udma = if words[53] & (1 << 2) != 0 {
            let modes = words[88] & 0x7F;
            if modes != 0 {
                Some(15 - modes.leading_zeros() as u8)
            } else {
                None
            }
        } else {
            None
        };

        Device {
            kind,
            supported_udma,
            selected_udma: None,
            sector_size: if atapi { ATAPI_SECTOR_SIZE } else { ATA_SECTOR_SIZE },
            cable_80_wire: words[93] & (1 << 13) != 0,
            model: ata_string(&words[27..47]),
            serial: ata_string(&words[10..20]),
            firmware: ata_string(&words[23..27]),
        }
    }

    pub fn is_atapi(&self) -> bool {
        matches!(self.kind, DeviceKind::Atapi { .. })
    }

    /// Capacity in sectors
    pub fn total_sectors(&self) -> u64 {
        match self.kind {
            DeviceKind::Ata { lba28_sectors, lba48_sectors } => {
                (lba28_sectors as u64).max(lba48_sectors.unwrap_or(0))
            }
            DeviceKind::Atapi { total_sectors } => total_sectors,
        }
    }

    pub fn supports_lba28(&self) -> bool {
        matches!(self.kind, DeviceKind::Ata { lba28_sectors, .. } if lba28_sectors != 0)
    }

    pub fn supports_lba48(&self) -> bool {
        matches!(self.kind, DeviceKind::Ata { lba48_sectors: Some(_), .. })
    }
}

/// ATA strings store two characters per word, high byte first
fn ata_string(words: &[u16]) -> String {
    let mut bytes = Vec::with_capacity(words.len() * 2);
    for word in words {
        bytes.push((word >> 8) as u8);
        bytes.push(*word as u8);
    }
    while matches!(bytes.last(), Some(b' ') | Some(0)) {
        bytes.pop();
    }
    let start = bytes.iter().position(|b| *b != b' ').unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

/// Encode a string the way IDENTIFY stores it (used by the simulator)
#[cfg(any(test, feature = "sim"))]
pub(crate) fn put_ata_string(words: &mut [u16], text: &str) {
    let bytes = text.as_bytes();
    for (i, word) in words.iter_mut().enumerate() {
        let hi = bytes.get(i * 2).copied().unwrap_or(b' ');
        let lo = bytes.get(i * 2 + 1).copied().unwrap_or(b' ');
        *word = ((hi as u16) << 8) | lo as u16;
    }
}
