//! IDE channel register map
//!
//! Task-file registers are offsets from the channel's I/O base, the control
//! block has its own base, and the busmaster window is a separate range
//! belonging to the PCI IDE function.

// Busmaster DMA window
pub const BM_COMMAND: u16 = 0x00;
pub const BM_STATUS: u16 = 0x02;
pub const BM_PRDT_ADDRESS: u16 = 0x04;

// BM_COMMAND bits
pub const BM_COMMAND_START: u8 = 1 << 0;
/// Direction: set = device to memory (read), clear = memory to device (write)
pub const BM_COMMAND_READ: u8 = 1 << 3;
pub const BM_COMMAND_WRITE: u8 = 0;

// BM_STATUS bits (ERROR and INTERRUPT are write-one-to-clear)
pub const BM_STATUS_ACTIVE: u8 = 1 << 0;
pub const BM_STATUS_ERROR: u8 = 1 << 1;
pub const BM_STATUS_INTERRUPT: u8 = 1 << 2;

// Task-file registers
pub const ATA_REG_DATA: u16 = 0;
pub const ATA_REG_ERROR: u16 = 1;
pub const ATA_REG_FEATURES: u16 = 1;
pub const ATA_REG_SECTOR_COUNT: u16 = 2;
pub const ATA_REG_LBA_LOW: u16 = 3;
pub const ATA_REG_LBA_MID: u16 = 4;
pub const ATA_REG_LBA_HIGH: u16 = 5;
pub const ATA_REG_DRIVE: u16 = 6;
pub const ATA_REG_COMMAND: u16 = 7;
pub const ATA_REG_STATUS: u16 = 7;

// Drive-select byte
pub const DRIVE_SELECT_BASE: u8 = 0xA0;
pub const DRIVE_SELECT_LBA: u8 = 0x40;
pub const DRIVE_SELECT_SLAVE: u8 = 0x10;

// Control block: alternate status (read) / device control (write), same offset
pub const CTRL_ALT_STATUS: u16 = 0;
pub const CTRL_DEVICE_CONTROL: u16 = 0;

// Device control bits
pub const CTRL_HOB: u8 = 1 << 3;
pub const CTRL_SOFTWARE_RESET: u8 = 1 << 2;
pub const CTRL_NIEN: u8 = 1 << 1;

// Status register bits
pub const STATUS_ERR: u8 = 1 << 0;
pub const STATUS_DRQ: u8 = 1 << 3;
pub const STATUS_SRV: u8 = 1 << 4;
pub const STATUS_DF: u8 = 1 << 5;
pub const STATUS_RDY: u8 = 1 << 6;
pub const STATUS_BSY: u8 = 1 << 7;

// Error register bits
pub const ERROR_ABRT: u8 = 1 << 2;
pub const ERROR_IDNF: u8 = 1 << 4;

// Commands
pub const CMD_READ_DMA: u8 = 0xC8;
pub const CMD_WRITE_DMA: u8 = 0xCA;
pub const CMD_READ_DMA_EXT: u8 = 0x25;
pub const CMD_WRITE_DMA_EXT: u8 = 0x35;
pub const CMD_FLUSH_CACHE: u8 = 0xE7;
pub const CMD_FLUSH_CACHE_EXT: u8 = 0xEA;
pub const CMD_IDENTIFY: u8 = 0xEC;
pub const CMD_IDENTIFY_PACKET: u8 = 0xA1;
pub const CMD_PACKET: u8 = 0xA0;
pub const CMD_SET_FEATURES: u8 = 0xEF;

// Features
pub const FEATURE_PACKET_DMA: u8 = 0x01;
pub const FEATURE_SET_TRANSFER_MODE: u8 = 0x03;
/// OR with the UDMA mode number
pub const TRANSFER_MODE_UDMA: u8 = 0x40;

// ATAPI signature left in LBA mid/high after a device reset or aborted IDENTIFY
pub const ATAPI_SIGNATURE_MID: u8 = 0x14;
pub const ATAPI_SIGNATURE_HIGH: u8 = 0xEB;

// SCSI packet opcodes used over ATAPI
pub const SCSI_READ_CAPACITY_10: u8 = 0x25;
pub const SCSI_READ_12: u8 = 0xA8;

/// Length of an ATAPI command packet
pub const ATAPI_PACKET_LEN: usize = 12;

/// True if `status` reports ERR or DF
#[inline]
pub fn status_failed(status: u8) -> bool {
    status & (STATUS_ERR | STATUS_DF) != 0
}
