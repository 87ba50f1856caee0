//! Block Transport Trait
//!
//! Implemented by storage drivers (onboard ATA channel, USB mass storage).
//! Used by filesystem backends (FAT, FATX, ISO-9660).
//!
//! A [`TransportDriver`] is the static description of a transport kind; the
//! registry calls [`TransportDriver::init`] once per mount to obtain a bound
//! [`BlockTransport`] instance. Every call on an instance is blocking from
//! the caller's point of view, whatever completion model the hardware uses.

use alloc::boxed::Box;

use crate::{DriverError, DriverResult};

/// Control requests understood by every transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoctlCommand {
    /// Flush device-side caches
    Sync,
    /// Total addressable sectors
    GetSectorCount,
    /// Bytes per sector
    GetSectorSize,
    /// Erase block size in sectors
    GetBlockSize,
}

/// What a transport learns about the mount it is being bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportContext {
    /// Upper-case drive letter of the mount
    pub drive_letter: char,
}

/// Transport kind, selected at mount time
pub trait TransportDriver: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Bind a transport instance for the given mount
    fn init(&self, ctx: &TransportContext) -> DriverResult<Box<dyn BlockTransport>>;
}

/// Sector-addressed transport bound to one mount
pub trait BlockTransport: Send {
    /// Read `sector_count` sectors starting at `sector_offset`
    ///
    /// `buffer` must hold at least `sector_count` sectors.
    fn read(&mut self, buffer: &mut [u8], sector_offset: u64, sector_count: usize) -> DriverResult<()>;

    /// Write `sector_count` sectors starting at `sector_offset`
    fn write(&mut self, buffer: &[u8], sector_offset: u64, sector_count: usize) -> DriverResult<()>;

    /// Answer a control request; `Sync` returns 0
    fn ioctl(&mut self, cmd: IoctlCommand) -> DriverResult<u64>;

    /// Release the binding. Called once, after the backend is torn down.
    fn deinit(&mut self) {}
}

/// Block transport geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockGeometry {
    /// Sector size in bytes (512 for disks, 2048 for optical media)
    pub sector_size: u32,
    /// Total number of sectors
    pub total_sectors: u64,
    /// Erase block size in sectors
    pub block_size: u32,
}

/// Convenience methods for BlockTransport
pub trait BlockTransportExt: BlockTransport {
    /// Get sector size
    fn sector_size(&mut self) -> DriverResult<u32> {
        Ok(self.ioctl(IoctlCommand::GetSectorSize)? as u32)
    }

    /// Get total sectors
    fn sector_count(&mut self) -> DriverResult<u64> {
        self.ioctl(IoctlCommand::GetSectorCount)
    }

    /// Query all geometry fields
    fn geometry(&mut self) -> DriverResult<BlockGeometry> {
        Ok(BlockGeometry {
            sector_size: self.sector_size()?,
            total_sectors: self.sector_count()?,
            block_size: self.ioctl(IoctlCommand::GetBlockSize)? as u32,
        })
    }

    /// Flush any cached writes to the device
    fn sync(&mut self) -> DriverResult<()> {
        self.ioctl(IoctlCommand::Sync).map(|_| ())
    }
}

// Auto-implement BlockTransportExt for all BlockTransport implementors
impl<T: BlockTransport + ?Sized> BlockTransportExt for T {}

/// Byte length of `sector_count` sectors, checked against a buffer length
pub fn transfer_len(sector_count: usize, sector_size: usize, buffer_len: usize) -> DriverResult<usize> {
    if sector_count == 0 || sector_size == 0 {
        return Err(DriverError::InvalidParameter);
    }
    let bytes = sector_count
        .checked_mul(sector_size)
        .ok_or(DriverError::InvalidParameter)?;
    if buffer_len < bytes {
        return Err(DriverError::BufferTooSmall);
    }
    Ok(bytes)
}
