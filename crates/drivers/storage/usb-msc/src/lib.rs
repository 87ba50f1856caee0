//! USB Mass Storage Block Transport
//!
//! Exposes attached mass-storage units to the VFS as block transports
//! addressed by the drive letters `0`-`3`.
//!
//! # Architecture
//!
//! ```text
//! USB host stack (enumeration, bulk-only transport)
//!   │  attach / detach        │  Transfer::complete(csw)
//!   ▼                         ▼
//! MscDevices (slot table) ─▶ UsbTransport (submit, then yield until done)
//!                             │
//!                             ▼
//!                       BlockTransport (VFS)
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod devices;
pub mod host;
pub mod transport;

pub use devices::{letter_for_slot, MscDevices, MAX_UNITS};
pub use host::{MscHost, Transfer, CSW_STATUS_FAILED, CSW_STATUS_PASSED, CSW_STATUS_PHASE_ERROR};
pub use transport::{UsbTransport, UsbTransportDriver, LUN, MAX_TRANSFER_BLOCKS};
