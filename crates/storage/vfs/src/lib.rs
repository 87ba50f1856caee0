//! Drive-letter Virtual File System
//!
//! Lets several filesystem formats (FAT, FATX, ISO-9660) run over several
//! block transports (onboard ATA, USB mass storage), each pairing addressed
//! by a drive letter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │       Dashboard / game code          │
//! └──────────────────┬───────────────────┘
//!                    │ open/read/write/lseek/opendir ("C:/...")
//! ┌──────────────────▼───────────────────┐
//! │            Path dispatcher           │
//! │  - drive letter resolution           │
//! │  - per-mount locking                 │
//! │  - handle lifetime                   │
//! └──────────────────┬───────────────────┘
//!                    │ DriveRegistry::find
//! ┌──────────────────▼───────────────────┐
//! │   Drive registry (A-Z, 0-9 slots)    │
//! └──────────────────┬───────────────────┘
//!                    │ Filesystem trait
//! ┌─────────┬────────┴────────┬──────────┐
//! │   FAT   │      FATX       │ ISO-9660 │
//! └─────────┴────────┬────────┴──────────┘
//!                    │ BlockTransport trait
//! ┌──────────────────▼───────────────────┐
//! │      ATA bus  /  USB mass storage    │
//! └──────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use xbox_driver_traits::{BlockTransport, TransportDriver};

pub mod dispatch;
pub mod error;
pub mod file;
pub mod mount;
pub mod path;

pub use dispatch::{DirHandle, FileHandle};
pub use error::{VfsError, VfsResult};
pub use file::{DirEntry, DirId, FileId, FileMode, FileType, SeekFrom};
pub use mount::{DriveRegistry, Mount, MountInfo};
pub use path::{is_drive_letter, parse as parse_path, DrivePath, MAX_DRIVES};

/// Maximum filename length
pub const MAX_FILENAME: usize = 255;

/// Filesystem format, selected at mount time
pub trait FilesystemDriver: Send + Sync {
    /// Get filesystem name
    fn name(&self) -> &'static str;

    /// Bind a backend instance to a transport that is already initialised
    fn init(&self, letter: char, dev: &mut dyn BlockTransport) -> VfsResult<Box<dyn Filesystem>>;
}

/// Filesystem backend bound to one mount
///
/// Every call runs with the mount's lock held and receives the mount's
/// transport, so a backend never needs its own locking for caches or
/// cursors. Paths start with `/` and are relative to the drive.
pub trait Filesystem: Send {
    /// Open a file
    fn open(&mut self, dev: &mut dyn BlockTransport, path: &str, mode: FileMode) -> VfsResult<FileId>;

    /// Read from the file position; returns the byte count (0 at end of file)
    fn read(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &mut [u8]) -> VfsResult<usize>;

    /// Write at the file position
    fn write(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &[u8]) -> VfsResult<usize>;

    /// Move the file position (see [`SeekFrom::resolve`])
    fn lseek(&mut self, dev: &mut dyn BlockTransport, file: FileId, offset: i64, whence: SeekFrom) -> VfsResult<u64>;

    /// Close a file
    fn close(&mut self, dev: &mut dyn BlockTransport, file: FileId) -> VfsResult<()>;

    /// Open a directory stream
    fn opendir(&mut self, dev: &mut dyn BlockTransport, path: &str) -> VfsResult<DirId>;

    /// Next entry of a directory stream
    fn readdir(&mut self, dev: &mut dyn BlockTransport, dir: DirId) -> VfsResult<Option<DirEntry>>;

    /// Close a directory stream
    fn closedir(&mut self, dev: &mut dyn BlockTransport, dir: DirId);

    /// Release backend state; the transport is torn down right after
    fn deinit(&mut self, _dev: &mut dyn BlockTransport) {}
}

/// Global drive registry
static REGISTRY: DriveRegistry = DriveRegistry::new();

/// Get a reference to the global registry
pub fn registry() -> &'static DriveRegistry {
    &REGISTRY
}

/// Mount `fs` over `transport` at `letter`
pub fn register(letter: char, fs: &dyn FilesystemDriver, transport: &dyn TransportDriver) -> VfsResult<()> {
    REGISTRY.register(letter, fs, transport)
}

/// Unmount a drive letter
pub fn unregister(letter: char) -> VfsResult<()> {
    REGISTRY.unregister(letter)
}

/// Find the mount for a drive letter
pub fn find(letter: char) -> Option<alloc::sync::Arc<Mount>> {
    REGISTRY.find(letter)
}

/// List mounted drives
pub fn list() -> Vec<MountInfo> {
    REGISTRY.list()
}

/// Open a file
pub fn open(path: &str, mode: FileMode) -> VfsResult<FileHandle> {
    REGISTRY.open(path, mode)
}

/// Open a directory
pub fn opendir(path: &str) -> VfsResult<DirHandle> {
    REGISTRY.opendir(path)
}

#[cfg(test)]
mod testing;
