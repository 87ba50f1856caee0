//! File handle and file types

use alloc::string::String;

use crate::{VfsError, VfsResult, MAX_FILENAME};

/// File type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Unknown type
    Unknown,
}

/// File open mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode {
    /// Read access
    pub read: bool,
    /// Write access
    pub write: bool,
    /// Append mode
    pub append: bool,
    /// Create if not exists
    pub create: bool,
    /// Truncate on open
    pub truncate: bool,
}

impl FileMode {
    /// Read-only mode
    pub const READ: FileMode = FileMode {
        read: true,
        write: false,
        append: false,
        create: false,
        truncate: false,
    };

    /// Write-only mode (create/truncate)
    pub const WRITE: FileMode = FileMode {
        read: false,
        write: true,
        append: false,
        create: true,
        truncate: true,
    };

    /// Read-write mode
    pub const READ_WRITE: FileMode = FileMode {
        read: true,
        write: true,
        append: false,
        create: false,
        truncate: false,
    };

    /// Append mode
    pub const APPEND: FileMode = FileMode {
        read: false,
        write: true,
        append: true,
        create: true,
        truncate: false,
    };
}

/// Seek origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// From start of file
    Start,
    /// From current position
    Current,
    /// From end of file
    End,
}

impl SeekFrom {
    /// New absolute position for a backend with the given cursor and size
    pub fn resolve(self, offset: i64, current: u64, size: u64) -> VfsResult<u64> {
        let base = match self {
            SeekFrom::Start => 0,
            SeekFrom::Current => current,
            SeekFrom::End => size,
        };
        let target = base as i128 + offset as i128;
        if target < 0 || target > u64::MAX as i128 {
            return Err(VfsError::InvalidArgument);
        }
        Ok(target as u64)
    }
}

/// Backend-issued identifier of an open file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Backend-issued identifier of an open directory stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DirId(pub u32);

/// Directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, at most [`MAX_FILENAME`] bytes
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Entry type
    pub file_type: FileType,
}

impl DirEntry {
    pub fn new(name: &str, size: u64, file_type: FileType) -> VfsResult<Self> {
        if name.is_empty() || name.len() > MAX_FILENAME {
            return Err(VfsError::InvalidArgument);
        }
        Ok(DirEntry {
            name: String::from(name),
            size,
            file_type,
        })
    }
}
