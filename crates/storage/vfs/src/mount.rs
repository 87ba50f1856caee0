//! Drive registry
//!
//! Maps a drive letter to a [`Mount`]: a filesystem backend bound to a block
//! transport, plus the lock that serialises every call through that mount.
//!
//! The slot table sits behind a single lock. Register and unregister flip a
//! slot in one critical section, so a lookup sees either no mount or a fully
//! initialised one, never a half-built or half-torn-down binding. Backend
//! and transport initialisation and tear-down happen outside that lock with
//! the slot parked in `Mounting` or `Unmounting`, so a slow mount never
//! stalls lookups of other letters and a letter is not reused until its old
//! mount is gone.
//!
//! The per-mount lock is held across backend calls that may block on the
//! device, so it is taken with [`sched::lock`].

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;

use log::{info, warn};
use spin::Mutex;
use xbox_arch::sched;
use xbox_driver_traits::{debug_storage, BlockTransport, TransportContext, TransportDriver};

use crate::path::{drive_index, normalize_letter, MAX_DRIVES};
use crate::{Filesystem, FilesystemDriver, VfsError, VfsResult};

struct MountState {
    fs: Option<Box<dyn Filesystem>>,
    transport: Option<Box<dyn BlockTransport>>,
}

/// A bound (backend, transport) pair
pub struct Mount {
    letter: char,
    fs_name: &'static str,
    transport_name: &'static str,
    state: Mutex<MountState>,
}

impl Mount {
    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn fs_name(&self) -> &'static str {
        self.fs_name
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport_name
    }

    /// False once the mount has been torn down
    pub fn is_live(&self) -> bool {
        sched::lock(&self.state).fs.is_some()
    }

    /// Run `f` with exclusive use of the backend and its transport
    ///
    /// Blocks until any other call on this mount finishes. Fails with
    /// `NotMounted` if the mount was unregistered.
    pub fn with<R>(
        &self,
        f: impl FnOnce(&mut dyn Filesystem, &mut dyn BlockTransport) -> VfsResult<R>,
    ) -> VfsResult<R> {
        let mut state = sched::lock(&self.state);
        let MountState { fs, transport } = &mut *state;
        match (fs.as_mut(), transport.as_mut()) {
            (Some(fs), Some(transport)) => f(fs.as_mut(), transport.as_mut()),
            _ => Err(VfsError::NotMounted),
        }
    }

    /// Tear down backend then transport, after in-flight calls drain
    fn shutdown(&self) {
        let mut state = sched::lock(&self.state);
        let fs = state.fs.take();
        let transport = state.transport.take();
        if let (Some(mut fs), Some(mut transport)) = (fs, transport) {
            fs.deinit(transport.as_mut());
            transport.deinit();
        }
    }
}

/// Summary of one mounted drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountInfo {
    pub letter: char,
    pub fs_name: &'static str,
    pub transport_name: &'static str,
}

enum Slot {
    Empty,
    Mounting,
    Mounted(Arc<Mount>),
    Unmounting,
}

/// Drive letter to mount table
pub struct DriveRegistry {
    slots: Mutex<[Slot; MAX_DRIVES]>,
}

impl DriveRegistry {
    pub const fn new() -> Self {
        const EMPTY: Slot = Slot::Empty;
        DriveRegistry {
            slots: Mutex::new([EMPTY; MAX_DRIVES]),
        }
    }

    /// Bind `fs` over `transport` at `letter`
    ///
    /// The transport is initialised first, then the backend with the
    /// transport already usable. Any failure unwinds completely: the
    /// transport is released and the letter stays unmounted.
    pub fn register(
        &self,
        letter: char,
        fs: &dyn FilesystemDriver,
        transport: &dyn TransportDriver,
    ) -> VfsResult<()> {
        let letter = normalize_letter(letter)?;
        let idx = drive_index(letter).ok_or(VfsError::InvalidDriveLetter)?;

        {
            let mut slots = self.slots.lock();
            match slots[idx] {
                Slot::Mounted(_) => return Err(VfsError::AlreadyMounted),
                Slot::Mounting | Slot::Unmounting => return Err(VfsError::Busy),
                Slot::Empty => slots[idx] = Slot::Mounting,
            }
        }

        match bind(letter, fs, transport) {
            Ok(mount) => {
                self.slots.lock()[idx] = Slot::Mounted(Arc::new(mount));
                info!("vfs: {}: mounted {} over {}", letter, fs.name(), transport.name());
                Ok(())
            }
            Err(e) => {
                self.slots.lock()[idx] = Slot::Empty;
                warn!("vfs: {}: mount of {} over {} failed: {}", letter, fs.name(), transport.name(), e);
                Err(e)
            }
        }
    }

    /// Look up the mount for `letter`
    pub fn find(&self, letter: char) -> Option<Arc<Mount>> {
        let idx = match normalize_letter(letter).ok().and_then(drive_index) {
            Some(idx) => idx,
            None => {
                warn!("vfs: invalid drive letter {:?}", letter);
                return None;
            }
        };
        let slots = self.slots.lock();
        match &slots[idx] {
            Slot::Mounted(mount) => Some(Arc::clone(mount)),
            _ => {
                debug_storage!("vfs: no mount for drive {}", letter);
                None
            }
        }
    }

    /// Unmount `letter`
    ///
    /// Lookups stop seeing the mount at once. Tear-down waits for any call
    /// already running on the mount, and the letter only becomes free for a
    /// new mount once it finishes; until then `register` gets `Busy`. Handles
    /// that outlive the mount get `NotMounted`.
    pub fn unregister(&self, letter: char) -> VfsResult<()> {
        let letter = normalize_letter(letter)?;
        let idx = drive_index(letter).ok_or(VfsError::InvalidDriveLetter)?;

        let mount = {
            let mut slots = self.slots.lock();
            match mem::replace(&mut slots[idx], Slot::Unmounting) {
                Slot::Mounted(mount) => mount,
                Slot::Empty => {
                    slots[idx] = Slot::Empty;
                    return Err(VfsError::NotMounted);
                }
                busy => {
                    slots[idx] = busy;
                    return Err(VfsError::Busy);
                }
            }
        };

        mount.shutdown();
        self.slots.lock()[idx] = Slot::Empty;
        info!("vfs: {}: unmounted", letter);
        Ok(())
    }

    /// Mounted drives in letter order
    pub fn list(&self) -> Vec<MountInfo> {
        let slots = self.slots.lock();
        slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Mounted(m) => Some(MountInfo {
                    letter: m.letter,
                    fs_name: m.fs_name,
                    transport_name: m.transport_name,
                }),
                _ => None,
            })
            .collect()
    }
}

impl Default for DriveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn bind(letter: char, fs: &dyn FilesystemDriver, transport: &dyn TransportDriver) -> VfsResult<Mount> {
    let ctx = TransportContext { drive_letter: letter };
    let mut dev = transport.init(&ctx).map_err(VfsError::TransportInitFailed)?;

    let backend = match fs.init(letter, dev.as_mut()) {
        Ok(backend) => backend,
        Err(e) => {
            warn!("vfs: {}: {} rejected the drive: {}", letter, fs.name(), e);
            dev.deinit();
            return Err(VfsError::BackendInitFailed);
        }
    };

    Ok(Mount {
        letter,
        fs_name: fs.name(),
        transport_name: transport.name(),
        state: Mutex::new(MountState {
            fs: Some(backend),
            transport: Some(dev),
        }),
    })
}
