//! Internal drive bring-up
//!
//! Probes the primary IDE channel and mounts the fixed drive letters over
//! it. A missing unit or unreadable partition is logged and reported, never
//! fatal: the rest of the system runs with whatever did mount.

use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{error, info, warn};
use xbox_driver_ata::{AtaConfig, AtaTransportDriver, BusPorts, DeviceIndex, IdeBus, IdeChannel};
use xbox_driver_traits::DriverResult;
use xbox_vfs::{DriveRegistry, FilesystemDriver, VfsError};

/// Filesystem format of an internal drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalFs {
    /// Console FAT variant (hard disk partitions)
    Fatx,
    /// Optical media
    Iso9660,
}

/// Drive letters mounted from the IDE channel at boot, in mount order
pub const INTERNAL_DRIVES: [(char, InternalFs); 3] = [
    ('C', InternalFs::Fatx),
    ('E', InternalFs::Fatx),
    ('D', InternalFs::Iso9660),
];

/// Probe the console's primary IDE channel
pub fn probe_primary_bus<C: IdeChannel>(channel: C, config: AtaConfig) -> DriverResult<Arc<IdeBus<C>>> {
    let bus = IdeBus::probe(channel, BusPorts::PRIMARY, config).map_err(|e| {
        error!("ata: primary channel probe failed: {}", e);
        e
    })?;

    for index in [DeviceIndex::Master, DeviceIndex::Slave] {
        match bus.device(index) {
            Some(dev) => info!(
                "ata: {:?}: {} ({} sectors of {} bytes, udma {:?})",
                index,
                dev.model,
                dev.total_sectors(),
                dev.sector_size,
                dev.selected_udma
            ),
            None => info!("ata: {:?}: not present", index),
        }
    }
    Ok(Arc::new(bus))
}

/// Outcome of [`mount_internal_drives`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MountReport {
    pub mounted: Vec<char>,
    pub failed: Vec<(char, VfsError)>,
}

impl MountReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Mount `C:` and `E:` as FATX and `D:` as ISO-9660 over `bus`
pub fn mount_internal_drives<C: IdeChannel + 'static>(
    registry: &DriveRegistry,
    bus: &Arc<IdeBus<C>>,
    fatx: &dyn FilesystemDriver,
    iso: &dyn FilesystemDriver,
) -> MountReport {
    let transport = AtaTransportDriver::new(Arc::clone(bus));
    let mut report = MountReport::default();

    for (letter, format) in INTERNAL_DRIVES {
        let fs = match format {
            InternalFs::Fatx => fatx,
            InternalFs::Iso9660 => iso,
        };
        match registry.register(letter, fs, &transport) {
            Ok(()) => report.mounted.push(letter),
            Err(e) => {
                warn!("fs: error mounting drive {} as {}: {}", letter, fs.name(), e);
                report.failed.push((letter, e));
            }
        }
    }

    info!("fs: {} internal drive(s) mounted", report.mounted.len());
    report
}
