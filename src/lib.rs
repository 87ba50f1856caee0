//! Console storage bring-up
//!
//! Wires the onboard IDE channel and USB mass storage into the drive-letter
//! VFS: `C:` and `E:` are the hard disk partitions, `D:` the optical drive,
//! and `0:`-`3:` hot-plugged USB units.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bringup;
pub mod usb;

pub use bringup::{mount_internal_drives, probe_primary_bus, MountReport, INTERNAL_DRIVES};
pub use usb::UsbStorage;

pub use xbox_arch as arch;
pub use xbox_driver_ata as ata;
pub use xbox_driver_traits as traits;
pub use xbox_driver_usb_msc as usb_msc;
pub use xbox_vfs as vfs;
