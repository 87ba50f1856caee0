//! Block transport over a USB mass-storage unit
//!
//! The host stack completes transfers asynchronously. Each read or write
//! here submits one READ(10)/WRITE(10) at a time and yields to the
//! scheduler until the host reports the CSW, so callers see an ordinary
//! blocking call.

use alloc::boxed::Box;
use alloc::sync::Arc;

use log::warn;
use xbox_arch::sched;
use xbox_driver_traits::{
    debug_usb, transfer_len, BlockTransport, DriverError, DriverResult, IoctlCommand, TransportContext,
    TransportDriver,
};

use crate::devices::MscDevices;
use crate::host::{MscHost, Transfer, CSW_STATUS_PASSED, CSW_STATUS_PHASE_ERROR};

/// Logical unit addressed on every device
pub const LUN: u8 = 0;

/// Most blocks moved by a single READ(10)/WRITE(10)
pub const MAX_TRANSFER_BLOCKS: u16 = 128;

/// Split a sector range into `(lba, blocks)` commands
pub fn split_transfers(lba: u32, count: usize) -> impl Iterator<Item = (u32, u16)> {
    let step = MAX_TRANSFER_BLOCKS as usize;
    (0..count).step_by(step).map(move |done| {
        let blocks = (count - done).min(step) as u16;
        (lba + done as u32, blocks)
    })
}

/// Transport kind for mounts on attached mass-storage units
pub struct UsbTransportDriver {
    host: Arc<dyn MscHost>,
    devices: Arc<MscDevices>,
}

impl UsbTransportDriver {
    pub fn new(host: Arc<dyn MscHost>, devices: Arc<MscDevices>) -> Self {
        UsbTransportDriver { host, devices }
    }

    pub fn devices(&self) -> &Arc<MscDevices> {
        &self.devices
    }
}

impl TransportDriver for UsbTransportDriver {
    fn name(&self) -> &'static str {
        "usb-msc"
    }

    fn init(&self, ctx: &TransportContext) -> DriverResult<Box<dyn BlockTransport>> {
        let dev_addr = self.devices.address(ctx.drive_letter).ok_or(DriverError::DeviceNotFound)?;
        let block_size = self.host.block_size(dev_addr, LUN);
        if block_size == 0 {
            warn!("usb-msc: {}: address {} reports no block size", ctx.drive_letter, dev_addr);
            return Err(DriverError::DeviceNotFound);
        }
        debug_usb!("usb-msc: {}: bound to address {}", ctx.drive_letter, dev_addr);
        Ok(Box::new(UsbTransport {
            host: Arc::clone(&self.host),
            dev_addr,
            block_size,
        }))
    }
}

/// One mount's binding to a mass-storage unit
pub struct UsbTransport {
    host: Arc<dyn MscHost>,
    dev_addr: u8,
    block_size: u32,
}

impl UsbTransport {
    pub fn dev_addr(&self) -> u8 {
        self.dev_addr
    }

    fn check_range(&self, sector_offset: u64, sector_count: usize, buffer_len: usize) -> DriverResult<u32> {
        transfer_len(sector_count, self.block_size as usize, buffer_len)?;
        let end = sector_offset
            .checked_add(sector_count as u64)
            .ok_or(DriverError::OutOfRange)?;
        if end > self.host.block_count(self.dev_addr, LUN) as u64 {
            return Err(DriverError::OutOfRange);
        }
        // Fits: the block count itself is 32-bit
        Ok(sector_offset as u32)
    }

    fn wait(&self, transfer: &Transfer) -> DriverResult<()> {
        let status = loop {
            if let Some(status) = transfer.status() {
                break status;
            }
            sched::yield_now();
        };
        if status == CSW_STATUS_PASSED {
            Ok(())
        } else {
            warn!(
                "usb-msc: address {}: command failed with status {} (lba {}, {} blocks)",
                self.dev_addr,
                status,
                transfer.lba(),
                transfer.blocks()
            );
            Err(DriverError::TransferFailed(status))
        }
    }
}

impl BlockTransport for UsbTransport {
    fn read(&mut self, buffer: &mut [u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        let lba = self.check_range(sector_offset, sector_count, buffer.len())?;
        let mut done = 0;
        for (lba, blocks) in split_transfers(lba, sector_count) {
            let len = blocks as usize * self.block_size as usize;
            let transfer = Transfer::inbound(lba, blocks, len);
            self.host.submit_read10(self.dev_addr, LUN, Arc::clone(&transfer))?;
            self.wait(&transfer)?;

            let data = transfer.data();
            let src = data
                .get(..len)
                .ok_or(DriverError::TransferFailed(CSW_STATUS_PHASE_ERROR))?;
            buffer[done..done + len].copy_from_slice(src);
            done += len;
        }
        Ok(())
    }

    fn write(&mut self, buffer: &[u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        let lba = self.check_range(sector_offset, sector_count, buffer.len())?;
        let mut done = 0;
        for (lba, blocks) in split_transfers(lba, sector_count) {
            let len = blocks as usize * self.block_size as usize;
            let transfer = Transfer::outbound(lba, blocks, &buffer[done..done + len]);
            self.host.submit_write10(self.dev_addr, LUN, Arc::clone(&transfer))?;
            self.wait(&transfer)?;
            done += len;
        }
        Ok(())
    }

    fn ioctl(&mut self, cmd: IoctlCommand) -> DriverResult<u64> {
        match cmd {
            IoctlCommand::Sync => Ok(0),
            IoctlCommand::GetSectorCount => Ok(self.host.block_count(self.dev_addr, LUN) as u64),
            IoctlCommand::GetSectorSize => Ok(self.host.block_size(self.dev_addr, LUN) as u64),
            IoctlCommand::GetBlockSize => Ok(1),
        }
    }

    fn deinit(&mut self) {
        debug_usb!("usb-msc: address {} unbound", self.dev_addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::CSW_STATUS_FAILED;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::thread;
    use std::time::Duration;
    use xbox_driver_traits::BlockTransportExt;

    const BLOCK: usize = 512;

    /// Host that completes every transfer from another thread
    struct MockHost {
        disk: Arc<StdMutex<Vec<u8>>>,
        fail_with: StdMutex<Option<u8>>,
        reject: bool,
        submitted: AtomicUsize,
    }

    impl MockHost {
        fn new(blocks: usize) -> Arc<Self> {
            let disk = (0..blocks * BLOCK).map(|i| (i / BLOCK) as u8).collect();
            Arc::new(MockHost {
                disk: Arc::new(StdMutex::new(disk)),
                fail_with: StdMutex::new(None),
                reject: false,
                submitted: AtomicUsize::new(0),
            })
        }

        fn submit(&self, transfer: Arc<Transfer>, read: bool) -> DriverResult<()> {
            if self.reject {
                return Err(DriverError::DeviceNotFound);
            }
            self.submitted.fetch_add(1, Ordering::SeqCst);
            let disk = Arc::clone(&self.disk);
            let fail = *self.fail_with.lock().unwrap();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(2));
                if let Some(status) = fail {
                    transfer.complete(status);
                    return;
                }
                let start = transfer.lba() as usize * BLOCK;
                let len = transfer.blocks() as usize * BLOCK;
                let mut disk = disk.lock().unwrap();
                if read {
                    transfer.data().copy_from_slice(&disk[start..start + len]);
                } else {
                    disk[start..start + len].copy_from_slice(&transfer.data());
                }
                transfer.complete(CSW_STATUS_PASSED);
            });
            Ok(())
        }
    }

    impl MscHost for MockHost {
        fn submit_read10(&self, _dev_addr: u8, _lun: u8, transfer: Arc<Transfer>) -> DriverResult<()> {
            self.submit(transfer, true)
        }

        fn submit_write10(&self, _dev_addr: u8, _lun: u8, transfer: Arc<Transfer>) -> DriverResult<()> {
            self.submit(transfer, false)
        }

        fn block_count(&self, _dev_addr: u8, _lun: u8) -> u32 {
            (self.disk.lock().unwrap().len() / BLOCK) as u32
        }

        fn block_size(&self, _dev_addr: u8, _lun: u8) -> u32 {
            BLOCK as u32
        }
    }

    fn bound(host: Arc<MockHost>) -> Box<dyn BlockTransport> {
        let devices = Arc::new(MscDevices::new());
        let letter = devices.attach(3).unwrap();
        let driver = UsbTransportDriver::new(host, devices);
        driver.init(&TransportContext { drive_letter: letter }).unwrap()
    }

    #[test]
    fn test_init_requires_attached_unit() {
        let devices = Arc::new(MscDevices::new());
        let driver = UsbTransportDriver::new(MockHost::new(8), devices.clone());
        assert_eq!(driver.name(), "usb-msc");
        assert_eq!(
            driver.init(&TransportContext { drive_letter: '0' }).err(),
            Some(DriverError::DeviceNotFound)
        );
        devices.attach(1);
        assert!(driver.init(&TransportContext { drive_letter: '0' }).is_ok());
    }

    #[test]
    fn test_read_blocks_until_completion() {
        let host = MockHost::new(300);
        let mut dev = bound(host.clone());

        let mut buf = vec![0u8; 3 * BLOCK];
        dev.read(&mut buf, 10, 3).unwrap();
        assert!(buf[..BLOCK].iter().all(|&b| b == 10));
        assert!(buf[2 * BLOCK..].iter().all(|&b| b == 12));

        // Larger requests are split into several commands
        let mut buf = vec![0u8; 200 * BLOCK];
        dev.read(&mut buf, 50, 200).unwrap();
        assert_eq!(host.submitted.load(Ordering::SeqCst), 3);
        assert_eq!(buf[199 * BLOCK], (249 % 256) as u8);
    }

    #[test]
    fn test_write_then_read_back() {
        let host = MockHost::new(16);
        let mut dev = bound(host.clone());

        dev.write(&[0xC3; 2 * BLOCK], 4, 2).unwrap();
        assert!(host.disk.lock().unwrap()[4 * BLOCK..6 * BLOCK].iter().all(|&b| b == 0xC3));

        let mut buf = [0u8; BLOCK];
        dev.read(&mut buf, 5, 1).unwrap();
        assert_eq!(buf, [0xC3; BLOCK]);
    }

    #[test]
    fn test_failed_csw_surfaces_status() {
        let host = MockHost::new(16);
        let mut dev = bound(host.clone());
        *host.fail_with.lock().unwrap() = Some(CSW_STATUS_FAILED);

        let mut buf = [0u8; BLOCK];
        assert_eq!(dev.read(&mut buf, 0, 1), Err(DriverError::TransferFailed(CSW_STATUS_FAILED)));
        assert_eq!(dev.write(&buf, 0, 1), Err(DriverError::TransferFailed(CSW_STATUS_FAILED)));
    }

    #[test]
    fn test_rejected_submission() {
        let mut host = MockHost::new(16);
        Arc::get_mut(&mut host).unwrap().reject = true;
        let mut dev = bound(host);

        let mut buf = [0u8; BLOCK];
        assert_eq!(dev.read(&mut buf, 0, 1), Err(DriverError::DeviceNotFound));
    }

    #[test]
    fn test_range_checks() {
        let host = MockHost::new(16);
        let mut dev = bound(host.clone());
        let mut buf = [0u8; 2 * BLOCK];

        assert_eq!(dev.read(&mut buf, 15, 2), Err(DriverError::OutOfRange));
        assert_eq!(dev.read(&mut buf, u64::MAX, 1), Err(DriverError::OutOfRange));
        assert_eq!(dev.read(&mut buf, 0, 0), Err(DriverError::InvalidParameter));
        assert_eq!(dev.read(&mut buf, 0, 3), Err(DriverError::BufferTooSmall));
        assert_eq!(host.submitted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ioctl_queries_device() {
        let mut dev = bound(MockHost::new(64));
        let geometry = dev.geometry().unwrap();
        assert_eq!(geometry.total_sectors, 64);
        assert_eq!(geometry.sector_size, BLOCK as u32);
        assert_eq!(geometry.block_size, 1);
        assert!(dev.sync().is_ok());
    }

    proptest! {
        #[test]
        fn prop_split_covers_range(lba in 0u32..1_000_000, count in 1usize..2000) {
            let mut next = lba;
            let mut total = 0;
            for (start, blocks) in split_transfers(lba, count) {
                prop_assert_eq!(start, next);
                prop_assert!(blocks >= 1 && blocks <= MAX_TRANSFER_BLOCKS);
                next += blocks as u32;
                total += blocks as usize;
            }
            prop_assert_eq!(total, count);
        }
    }
}
