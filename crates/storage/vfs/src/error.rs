//! VFS Error types

use core::fmt;

use xbox_driver_traits::DriverError;

/// VFS Result type
pub type VfsResult<T> = Result<T, VfsError>;

/// VFS Error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// No mount for the drive letter (or it was unmounted)
    NotMounted,
    /// Drive letter already has a mount
    AlreadyMounted,
    /// Drive letter is in the middle of being mounted
    Busy,
    /// Not an ASCII letter or digit
    InvalidDriveLetter,
    /// Path is not `<letter>:` or `<letter>:/...`
    InvalidPath,
    /// Filesystem backend refused the transport
    BackendInitFailed,
    /// Block transport could not be bound
    TransportInitFailed(DriverError),
    /// Transport error surfaced through a backend
    Driver(DriverError),
    /// File or directory not found
    NotFound,
    /// I/O error
    IoError,
    /// Invalid argument
    InvalidArgument,
    /// Operation not supported
    NotSupported,
    /// Read-only filesystem
    ReadOnly,
    /// Handle not known to the backend
    BadHandle,
}

impl VfsError {
    /// Convert to errno-style error code
    pub fn to_errno(&self) -> i32 {
        match self {
            VfsError::NotFound => -2,           // ENOENT
            VfsError::IoError => -5,            // EIO
            VfsError::BadHandle => -9,          // EBADF
            VfsError::Busy => -16,              // EBUSY
            VfsError::AlreadyMounted => -16,
            VfsError::NotMounted => -19,        // ENODEV
            VfsError::InvalidArgument => -22,   // EINVAL
            VfsError::InvalidPath => -22,
            VfsError::InvalidDriveLetter => -22,
            VfsError::ReadOnly => -30,          // EROFS
            VfsError::NotSupported => -38,      // ENOSYS
            VfsError::BackendInitFailed => -5,
            VfsError::TransportInitFailed(e) | VfsError::Driver(e) => match e {
                DriverError::DeviceNotFound => -19,
                DriverError::Timeout => -110,   // ETIMEDOUT
                DriverError::InvalidParameter | DriverError::BufferTooSmall => -22,
                DriverError::OutOfRange => -34, // ERANGE
                DriverError::NotSupported => -38,
                _ => -5,
            },
        }
    }
}

impl From<DriverError> for VfsError {
    fn from(e: DriverError) -> Self {
        VfsError::Driver(e)
    }
}

impl fmt::Display for VfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VfsError::NotMounted => f.write_str("drive not mounted"),
            VfsError::AlreadyMounted => f.write_str("drive already mounted"),
            VfsError::Busy => f.write_str("drive is being mounted"),
            VfsError::InvalidDriveLetter => f.write_str("invalid drive letter"),
            VfsError::InvalidPath => f.write_str("invalid path"),
            VfsError::BackendInitFailed => f.write_str("filesystem backend init failed"),
            VfsError::TransportInitFailed(e) => write!(f, "block transport init failed: {}", e),
            VfsError::Driver(e) => write!(f, "{}", e),
            VfsError::NotFound => f.write_str("not found"),
            VfsError::IoError => f.write_str("I/O error"),
            VfsError::InvalidArgument => f.write_str("invalid argument"),
            VfsError::NotSupported => f.write_str("operation not supported"),
            VfsError::ReadOnly => f.write_str("read-only filesystem"),
            VfsError::BadHandle => f.write_str("bad handle"),
        }
    }
}
