//! Console architecture support
//!
//! This crate provides the low-level pieces the storage drivers sit on:
//! - Port I/O primitives (x86 `in`/`out`)
//! - Scheduler hooks used by blocking drivers
//! - Fixed wiring of the console's onboard IDE channel

#![cfg_attr(not(test), no_std)]

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod port;
pub mod sched;

/// Primary IDE channel task-file base
pub const ATA_PRIMARY_BUS_IO_BASE: u16 = 0x1F0;

/// Primary IDE channel control block (alternate status / device control)
pub const ATA_PRIMARY_BUS_CTRL_BASE: u16 = 0x3F6;

/// Busmaster DMA window of the onboard IDE controller
pub const ATA_BUSMASTER_BASE: u16 = 0xFF60;
