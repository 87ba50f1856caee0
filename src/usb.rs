//! USB mass-storage hot-plug
//!
//! The host stack reports attach and detach from its own context. Attach
//! only claims a slot and a letter; the mount itself runs later from a task
//! ([`UsbStorage::mount`]), since probing the filesystem blocks on USB
//! transfers that the host context has to complete.

use alloc::sync::Arc;

use log::{info, warn};
use xbox_driver_usb_msc::{MscDevices, MscHost, UsbTransportDriver};
use xbox_vfs::{DriveRegistry, FilesystemDriver, VfsError, VfsResult};

/// Attached mass-storage units and their mounts
pub struct UsbStorage {
    transport: UsbTransportDriver,
}

impl UsbStorage {
    pub fn new(host: Arc<dyn MscHost>) -> Self {
        UsbStorage {
            transport: UsbTransportDriver::new(host, Arc::new(MscDevices::new())),
        }
    }

    pub fn devices(&self) -> &Arc<MscDevices> {
        self.transport.devices()
    }

    /// Host stack attach callback; returns the letter to mount
    pub fn on_attach(&self, dev_addr: u8) -> Option<char> {
        let letter = self.devices().attach(dev_addr)?;
        info!("usb-msc: address {} attached as {}:", dev_addr, letter);
        Some(letter)
    }

    /// Mount the unit behind `letter`, trying FAT then FATX
    ///
    /// Returns the name of the backend that took the drive. If neither
    /// does, the slot is released.
    pub fn mount(
        &self,
        registry: &DriveRegistry,
        letter: char,
        fat: &dyn FilesystemDriver,
        fatx: &dyn FilesystemDriver,
    ) -> VfsResult<&'static str> {
        for fs in [fat, fatx] {
            match registry.register(letter, fs, &self.transport) {
                Ok(()) => {
                    info!("usb-msc: mounted drive {} as {}", letter, fs.name());
                    return Ok(fs.name());
                }
                Err(e @ (VfsError::AlreadyMounted | VfsError::Busy)) => return Err(e),
                Err(_) => continue,
            }
        }
        warn!("usb-msc: failed to mount drive {}: no valid filesystem", letter);
        self.devices().release(letter);
        Err(VfsError::BackendInitFailed)
    }

    /// Host stack detach callback
    ///
    /// Unmounts the unit's letter before the slot is freed, so the letter
    /// cannot be handed to a new device while still mounted.
    pub fn on_detach(&self, registry: &DriveRegistry, dev_addr: u8) {
        let letter = match self.devices().letter(dev_addr) {
            Some(letter) => letter,
            None => return,
        };
        match registry.unregister(letter) {
            Ok(()) | Err(VfsError::NotMounted) => {}
            Err(e) => warn!("usb-msc: {}: unmount failed: {}", letter, e),
        }
        self.devices().detach(dev_addr);
        info!("usb-msc: address {} detached from {}:", dev_addr, letter);
    }
}
