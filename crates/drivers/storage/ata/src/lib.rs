//! ATA/IDE Busmaster DMA Driver
//!
//! Drives the console's onboard IDE channel: probes the master and slave
//! units with IDENTIFY / IDENTIFY PACKET, negotiates a UDMA mode and moves
//! sectors with busmaster DMA. Requests larger than one DMA round are split
//! into sequential rounds, each described by a table of at most 64 KiB
//! regions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use xbox_driver_ata::{AtaConfig, BusPorts, IdeBus, PortChannel, DeviceIndex};
//!
//! let channel = unsafe { PortChannel::new(window, window_phys) };
//! let bus = IdeBus::probe(channel, BusPorts::PRIMARY, AtaConfig::default())?;
//!
//! let mut buffer = [0u8; 512];
//! bus.read(DeviceIndex::Master, 0, &mut buffer, 1)?;
//! ```
//!
//! Hardware access goes through [`IdeChannel`]; the `sim` feature provides a
//! register-level simulator implementing it for tests.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod bus;
pub mod channel;
pub mod command;
pub mod config;
pub mod identify;
pub mod prdt;
pub mod regs;
pub mod transport;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use bus::IdeBus;
pub use channel::{BusPorts, IdeChannel};
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use channel::PortChannel;
pub use command::{Addressing, AtaCommand, Direction};
pub use config::AtaConfig;
pub use identify::{Device, DeviceIndex, DeviceKind};
pub use prdt::DmaWindow;
pub use transport::{device_index_for_letter, AtaTransport, AtaTransportDriver};
