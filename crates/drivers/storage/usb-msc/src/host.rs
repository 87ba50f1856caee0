//! Host stack boundary
//!
//! The USB host stack owns enumeration and the bulk-only transport. It
//! accepts READ(10)/WRITE(10) requests and finishes them later, from its own
//! context, by calling [`Transfer::complete`] with the CSW status.

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU16, Ordering};

use spin::{Mutex, MutexGuard};
use xbox_driver_traits::DriverResult;

/// CSW status: command passed
pub const CSW_STATUS_PASSED: u8 = 0x00;
/// CSW status: command failed
pub const CSW_STATUS_FAILED: u8 = 0x01;
/// CSW status: phase error
pub const CSW_STATUS_PHASE_ERROR: u8 = 0x02;

const PENDING: u16 = 0x100;

/// One READ(10)/WRITE(10) in flight
///
/// Carries its own data buffer so the host can fill or drain it after the
/// submitting call has returned.
pub struct Transfer {
    lba: u32,
    blocks: u16,
    data: Mutex<Vec<u8>>,
    status: AtomicU16,
}

impl Transfer {
    /// Read transfer with a zeroed buffer of `len` bytes
    pub fn inbound(lba: u32, blocks: u16, len: usize) -> Arc<Self> {
        Self::with_data(lba, blocks, vec![0; len])
    }

    /// Write transfer carrying a copy of `data`
    pub fn outbound(lba: u32, blocks: u16, data: &[u8]) -> Arc<Self> {
        Self::with_data(lba, blocks, data.to_vec())
    }

    fn with_data(lba: u32, blocks: u16, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Transfer {
            lba,
            blocks,
            data: Mutex::new(data),
            status: AtomicU16::new(PENDING),
        })
    }

    pub fn lba(&self) -> u32 {
        self.lba
    }

    pub fn blocks(&self) -> u16 {
        self.blocks
    }

    pub fn data(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock()
    }

    /// Mark the transfer finished with the device's CSW status
    pub fn complete(&self, csw_status: u8) {
        self.status.store(csw_status as u16, Ordering::Release);
    }

    /// CSW status once complete, `None` while still in flight
    pub fn status(&self) -> Option<u8> {
        match self.status.load(Ordering::Acquire) {
            PENDING => None,
            status => Some(status as u8),
        }
    }
}

/// Mass-storage side of the USB host stack
///
/// A submitted transfer must eventually be completed, with a failure status
/// if the device goes away.
pub trait MscHost: Send + Sync {
    /// Queue a READ(10); `Err` if the request was not accepted
    fn submit_read10(&self, dev_addr: u8, lun: u8, transfer: Arc<Transfer>) -> DriverResult<()>;

    /// Queue a WRITE(10); `Err` if the request was not accepted
    fn submit_write10(&self, dev_addr: u8, lun: u8, transfer: Arc<Transfer>) -> DriverResult<()>;

    /// Block count reported by READ CAPACITY at enumeration
    fn block_count(&self, dev_addr: u8, lun: u8) -> u32;

    /// Block size reported by READ CAPACITY at enumeration
    fn block_size(&self, dev_addr: u8, lun: u8) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_states() {
        let xfer = Transfer::inbound(7, 2, 1024);
        assert_eq!(xfer.status(), None);
        assert_eq!(xfer.data().len(), 1024);
        assert_eq!((xfer.lba(), xfer.blocks()), (7, 2));

        xfer.complete(CSW_STATUS_PASSED);
        assert_eq!(xfer.status(), Some(CSW_STATUS_PASSED));

        let xfer = Transfer::outbound(0, 1, &[0x5A; 512]);
        xfer.complete(CSW_STATUS_PHASE_ERROR);
        assert_eq!(xfer.status(), Some(CSW_STATUS_PHASE_ERROR));
        assert!(xfer.data().iter().all(|&b| b == 0x5A));
    }
}
