//! Storage Driver Traits
//!
//! This crate defines the block transport contract that storage drivers
//! implement (onboard ATA channel, USB mass storage) and that filesystem
//! backends consume, without either side knowing the other's
//! implementation.
//!
//! # Debug Features
//!
//! Enable debug output for specific subsystems at compile time:
//! ```toml
//! xbox-driver-traits = { path = "...", features = ["debug-storage"] }
//! ```
//!
//! Available features:
//! - `debug-all`: Enable all debug output
//! - `debug-storage`: ATA bus and block transport operations
//! - `debug-usb`: USB mass storage transfers

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod block;
mod debug;

pub use block::*;

#[doc(hidden)]
pub use log;

use core::fmt;

/// Common error type for transport operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Device not present or not responding
    DeviceNotFound,
    /// Busy flag never cleared, or DMA never completed
    Timeout,
    /// Busmaster reported an error for the DMA round
    DmaFault,
    /// Device set ERR or DF; carries the status and error registers
    CommandFailed { status: u8, error: u8 },
    /// USB mass storage command failed with this CSW status
    TransferFailed(u8),
    /// Invalid parameter
    InvalidParameter,
    /// Sector range outside the device
    OutOfRange,
    /// Buffer too small for the requested sectors
    BufferTooSmall,
    /// Not supported by this device
    NotSupported,
}

impl DriverError {
    /// Negative status code, as returned through the C-level contract
    pub fn code(&self) -> i8 {
        match self {
            DriverError::DeviceNotFound => -1,
            DriverError::Timeout => -2,
            DriverError::DmaFault => -3,
            DriverError::CommandFailed { .. } => -4,
            DriverError::TransferFailed(_) => -5,
            DriverError::InvalidParameter => -6,
            DriverError::OutOfRange => -7,
            DriverError::BufferTooSmall => -8,
            DriverError::NotSupported => -9,
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::DeviceNotFound => f.write_str("device not present"),
            DriverError::Timeout => f.write_str("command timed out"),
            DriverError::DmaFault => f.write_str("busmaster DMA error"),
            DriverError::CommandFailed { status, error } => {
                write!(f, "command failed (status {:#04x}, error {:#04x})", status, error)
            }
            DriverError::TransferFailed(status) => write!(f, "transfer failed (CSW status {})", status),
            DriverError::InvalidParameter => f.write_str("invalid parameter"),
            DriverError::OutOfRange => f.write_str("sector range outside device"),
            DriverError::BufferTooSmall => f.write_str("buffer too small"),
            DriverError::NotSupported => f.write_str("not supported by device"),
        }
    }
}

pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_negative_and_distinct() {
        let all = [
            DriverError::DeviceNotFound,
            DriverError::Timeout,
            DriverError::DmaFault,
            DriverError::CommandFailed { status: 0x51, error: 0x04 },
            DriverError::TransferFailed(1),
            DriverError::InvalidParameter,
            DriverError::OutOfRange,
            DriverError::BufferTooSmall,
            DriverError::NotSupported,
        ];
        for (i, a) in all.iter().enumerate() {
            assert!(a.code() < 0);
            for b in &all[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }
}
