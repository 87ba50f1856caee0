//! Driver tunables

use xbox_driver_traits::{DriverError, DriverResult};

use crate::prdt::PRD_MAX_BYTES;

/// Busy-flag polls before a command is declared timed out
pub const DEFAULT_BSY_TIMEOUT: u32 = 10_000;

/// Busmaster status polls before a DMA round is declared timed out
pub const DEFAULT_DMA_TIMEOUT: u32 = 1_000_000;

/// Bytes moved per DMA round (must be a multiple of 64 KiB)
pub const DEFAULT_MAX_DMA_QUEUE_BYTES: usize = PRD_MAX_BYTES * 8;

/// Highest UDMA mode the controller will program
pub const DEFAULT_MAX_UDMA_MODE: u8 = 5;

/// UDMA ceiling without an 80-conductor cable
pub const UDMA_MODE_40_WIRE_MAX: u8 = 2;

/// ATA driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtaConfig {
    /// Status polls allowed while waiting for BSY to clear
    pub bsy_timeout: u32,
    /// Busmaster polls allowed while a DMA round is active
    pub dma_timeout: u32,
    /// Largest byte count handed to the busmaster in one round
    pub max_dma_queue_bytes: usize,
    /// Cap for the negotiated UDMA mode
    pub max_udma_mode: u8,
}

impl AtaConfig {
    pub const fn new() -> Self {
        AtaConfig {
            bsy_timeout: DEFAULT_BSY_TIMEOUT,
            dma_timeout: DEFAULT_DMA_TIMEOUT,
            max_dma_queue_bytes: DEFAULT_MAX_DMA_QUEUE_BYTES,
            max_udma_mode: DEFAULT_MAX_UDMA_MODE,
        }
    }

    pub fn with_bsy_timeout(mut self, polls: u32) -> Self {
        self.bsy_timeout = polls;
        self
    }

    pub fn with_dma_timeout(mut self, polls: u32) -> Self {
        self.dma_timeout = polls;
        self
    }

    pub fn with_max_dma_queue_bytes(mut self, bytes: usize) -> Self {
        self.max_dma_queue_bytes = bytes;
        self
    }

    pub fn with_max_udma_mode(mut self, mode: u8) -> Self {
        self.max_udma_mode = mode;
        self
    }

    /// Number of descriptor entries a full round needs
    pub fn max_prd_entries(&self) -> usize {
        self.max_dma_queue_bytes / PRD_MAX_BYTES
    }

    /// Reject settings the hardware cannot honour
    pub fn validate(&self) -> DriverResult<()> {
        if self.max_dma_queue_bytes == 0 || self.max_dma_queue_bytes % PRD_MAX_BYTES != 0 {
            return Err(DriverError::InvalidParameter);
        }
        if self.bsy_timeout == 0 || self.dma_timeout == 0 {
            return Err(DriverError::InvalidParameter);
        }
        if self.max_udma_mode > 6 {
            return Err(DriverError::InvalidParameter);
        }
        Ok(())
    }
}

impl Default for AtaConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = AtaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_dma_queue_bytes, 65536 * 8);
        assert_eq!(config.max_prd_entries(), 8);
    }

    #[test]
    fn test_queue_must_be_multiple_of_64k() {
        assert!(AtaConfig::new().with_max_dma_queue_bytes(0).validate().is_err());
        assert!(AtaConfig::new().with_max_dma_queue_bytes(65536 + 512).validate().is_err());
        assert!(AtaConfig::new().with_max_dma_queue_bytes(65536 * 3).validate().is_ok());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(AtaConfig::new().with_bsy_timeout(0).validate().is_err());
        assert!(AtaConfig::new().with_dma_timeout(0).validate().is_err());
    }
}
