//! Debug macros for driver subsystems
//!
//! These macros compile to nothing when debug features are disabled.

/// Debug print for the storage subsystem (ATA bus, block transports, VFS)
#[macro_export]
#[cfg(feature = "debug-storage")]
macro_rules! debug_storage {
    ($($arg:tt)*) => {
        $crate::log::debug!(target: "storage", $($arg)*)
    };
}

#[macro_export]
#[cfg(not(feature = "debug-storage"))]
macro_rules! debug_storage {
    ($($arg:tt)*) => {};
}

/// Debug print for USB mass storage
#[macro_export]
#[cfg(feature = "debug-usb")]
macro_rules! debug_usb {
    ($($arg:tt)*) => {
        $crate::log::debug!(target: "usb", $($arg)*)
    };
}

#[macro_export]
#[cfg(not(feature = "debug-usb"))]
macro_rules! debug_usb {
    ($($arg:tt)*) => {};
}
