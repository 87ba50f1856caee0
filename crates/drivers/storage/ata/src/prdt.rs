//! Physical Region Descriptor tables
//!
//! The busmaster walks a table of 8-byte descriptors, each naming a
//! physical region of at most 64 KiB that does not cross a 64 KiB
//! boundary. The last descriptor carries the end-of-table flag.

use alloc::vec::Vec;

use xbox_driver_traits::{DriverError, DriverResult};

/// Largest region one descriptor can describe
pub const PRD_MAX_BYTES: usize = 65536;
/// Size of one encoded descriptor
pub const PRD_ENTRY_SIZE: usize = 8;
/// End-of-table flag in the high half of the flags word
pub const PRD_FLAG_EOT: u16 = 1 << 15;

/// One descriptor as the busmaster sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrdEntry {
    pub phys_addr: u32,
    /// 0 encodes 64 KiB
    pub byte_count: u16,
    pub flags: u16,
}

impl PrdEntry {
    /// Describe `len` bytes (1..=64 KiB) at `phys_addr`
    pub fn new(phys_addr: u32, len: usize, last: bool) -> Self {
        debug_assert!(len > 0 && len <= PRD_MAX_BYTES);
        PrdEntry {
            phys_addr,
            byte_count: len as u16,
            flags: if last { PRD_FLAG_EOT } else { 0 },
        }
    }

    pub fn len(&self) -> usize {
        if self.byte_count == 0 {
            PRD_MAX_BYTES
        } else {
            self.byte_count as usize
        }
    }

    pub fn is_last(&self) -> bool {
        self.flags & PRD_FLAG_EOT != 0
    }

    pub fn to_bytes(&self) -> [u8; PRD_ENTRY_SIZE] {
        let mut out = [0u8; PRD_ENTRY_SIZE];
        out[0..4].copy_from_slice(&self.phys_addr.to_le_bytes());
        out[4..6].copy_from_slice(&self.byte_count.to_le_bytes());
        out[6..8].copy_from_slice(&self.flags.to_le_bytes());
        out
    }

    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        if raw.len() < PRD_ENTRY_SIZE {
            return None;
        }
        Some(PrdEntry {
            phys_addr: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            byte_count: u16::from_le_bytes([raw[4], raw[5]]),
            flags: u16::from_le_bytes([raw[6], raw[7]]),
        })
    }
}

/// Split the region `[phys_addr, phys_addr + len)` into descriptors
///
/// Fails if the region is empty, wraps the 32-bit address space, or needs
/// more than `max_entries` descriptors.
pub fn build_table(phys_addr: u32, len: usize, max_entries: usize) -> DriverResult<Vec<PrdEntry>> {
    if len == 0 {
        return Err(DriverError::InvalidParameter);
    }
    let end = phys_addr as u64 + len as u64;
    if end > u32::MAX as u64 + 1 {
        return Err(DriverError::InvalidParameter);
    }

    let mut entries = Vec::new();
    let mut addr = phys_addr as u64;
    while addr < end {
        let to_boundary = PRD_MAX_BYTES as u64 - (addr % PRD_MAX_BYTES as u64);
        let chunk = to_boundary.min(end - addr);
        if entries.len() == max_entries {
            return Err(DriverError::InvalidParameter);
        }
        entries.push(PrdEntry::new(addr as u32, chunk as usize, addr + chunk == end));
        addr += chunk;
    }
    Ok(entries)
}

/// Encode `entries` into `out`, which must be large enough
pub fn write_table(entries: &[PrdEntry], out: &mut [u8]) -> DriverResult<()> {
    if out.len() < entries.len() * PRD_ENTRY_SIZE {
        return Err(DriverError::BufferTooSmall);
    }
    for (entry, slot) in entries.iter().zip(out.chunks_exact_mut(PRD_ENTRY_SIZE)) {
        slot.copy_from_slice(&entry.to_bytes());
    }
    Ok(())
}

/// DMA-reachable bounce memory owned by a channel
///
/// `bytes[0..]` is at physical address `phys_base`. The data area starts at
/// offset 0; the descriptor table follows it.
pub struct DmaWindow<'a> {
    pub phys_base: u32,
    pub bytes: &'a mut [u8],
}

impl DmaWindow<'_> {
    /// Bytes a window needs for rounds of `queue_bytes`
    pub const fn required_len(queue_bytes: usize) -> usize {
        queue_bytes + (queue_bytes / PRD_MAX_BYTES) * PRD_ENTRY_SIZE
    }

    /// Offset of the descriptor table inside the window
    pub fn table_offset(queue_bytes: usize) -> usize {
        queue_bytes
    }
}
