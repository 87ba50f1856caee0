//! Command building and addressing-mode selection

use xbox_driver_traits::{DriverError, DriverResult};

use crate::identify::{Device, DeviceIndex};
use crate::regs::*;

/// First LBA that needs 48-bit addressing
pub const LBA28_LIMIT: u64 = 1 << 28;
/// Sector count register holds 8 bits, 0 meaning 256
pub const LBA28_MAX_SECTORS: u32 = 256;
/// Two 8-bit passes, 0 meaning 65536
pub const LBA48_MAX_SECTORS: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    Lba28,
    Lba48,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Device to memory
    Read,
    /// Memory to device
    Write,
}

/// One ATA protocol exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaCommand {
    pub command: u8,
    pub feature: u8,
    /// Register encoding: 0 means the maximum for the addressing mode
    pub sector_count: u16,
    pub lba: u64,
}

impl AtaCommand {
    /// READ/WRITE DMA (EXT) for `sectors` sectors at `lba`
    pub fn dma(direction: Direction, addressing: Addressing, lba: u64, sectors: u32) -> Self {
        let command = match (direction, addressing) {
            (Direction::Read, Addressing::Lba28) => CMD_READ_DMA,
            (Direction::Write, Addressing::Lba28) => CMD_WRITE_DMA,
            (Direction::Read, Addressing::Lba48) => CMD_READ_DMA_EXT,
            (Direction::Write, Addressing::Lba48) => CMD_WRITE_DMA_EXT,
        };
        let sector_count = match addressing {
            Addressing::Lba28 => (sectors & 0xFF) as u16,
            Addressing::Lba48 => (sectors & 0xFFFF) as u16,
        };
        AtaCommand {
            command,
            feature: 0,
            sector_count,
            lba,
        }
    }

    /// Non-data command
    pub fn simple(command: u8, feature: u8, sector_count: u16) -> Self {
        AtaCommand { command, feature, sector_count, lba: 0 }
    }

    /// Addressing mode implied by the opcode, for LBA commands
    pub fn addressing(&self) -> Option<Addressing> {
        match self.command {
            CMD_READ_DMA | CMD_WRITE_DMA => Some(Addressing::Lba28),
            CMD_READ_DMA_EXT | CMD_WRITE_DMA_EXT => Some(Addressing::Lba48),
            _ => None,
        }
    }

    /// Drive-select byte for this command on `index`
    pub fn drive_select(&self, index: DeviceIndex) -> u8 {
        let mut value = DRIVE_SELECT_BASE | DRIVE_SELECT_LBA;
        if index == DeviceIndex::Slave {
            value |= DRIVE_SELECT_SLAVE;
        }
        if self.addressing() == Some(Addressing::Lba28) {
            value |= ((self.lba >> 24) & 0x0F) as u8;
        }
        value
    }
}

/// Choose the addressing mode and sector count for the next DMA round
///
/// `remaining` sectors are left starting at `lba`; at most `queue_sectors`
/// fit in one round. 28-bit addressing is preferred whenever the whole round
/// fits in it; the round is otherwise issued with 48-bit addressing, or
/// clamped to what 28-bit can reach on units without 48-bit support.
pub fn plan_round(
    device: &Device,
    lba: u64,
    remaining: u64,
    queue_sectors: u32,
) -> DriverResult<(Addressing, u32)> {
    if remaining == 0 || queue_sectors == 0 {
        return Err(DriverError::InvalidParameter);
    }
    let n = remaining.min(queue_sectors as u64) as u32;

    if device.supports_lba28() && n <= LBA28_MAX_SECTORS && lba + n as u64 <= LBA28_LIMIT {
        return Ok((Addressing::Lba28, n));
    }
    if device.supports_lba48() {
        return Ok((Addressing::Lba48, n.min(LBA48_MAX_SECTORS)));
    }
    if device.supports_lba28() && lba < LBA28_LIMIT {
        let reach = (LBA28_LIMIT - lba).min(LBA28_MAX_SECTORS as u64) as u32;
        return Ok((Addressing::Lba28, n.min(reach)));
    }
    Err(DriverError::OutOfRange)
}

/// ATAPI READ(12) packet
pub fn read12_packet(lba: u32, sectors: u32) -> [u8; ATAPI_PACKET_LEN] {
    let l = lba.to_be_bytes();
    let n = sectors.to_be_bytes();
    [SCSI_READ_12, 0, l[0], l[1], l[2], l[3], n[0], n[1], n[2], n[3], 0, 0]
}

/// ATAPI READ CAPACITY(10) packet; response is 8 bytes
pub fn read_capacity_packet() -> [u8; ATAPI_PACKET_LEN] {
    let mut packet = [0u8; ATAPI_PACKET_LEN];
    packet[0] = SCSI_READ_CAPACITY_10;
    packet
}
