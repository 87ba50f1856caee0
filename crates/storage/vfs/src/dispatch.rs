//! Path dispatcher
//!
//! Resolves a path's drive letter and forwards each call to the mounted
//! backend while holding that mount's lock. Handles keep their mount alive
//! and route every later call through the same lock; the lock is taken per
//! call, never across a whole directory iteration.

use alloc::sync::Arc;

use crate::file::{DirEntry, DirId, FileId, FileMode, SeekFrom};
use crate::mount::{DriveRegistry, Mount};
use crate::path;
use crate::{VfsError, VfsResult};

impl DriveRegistry {
    /// Open a file by drive path
    pub fn open(&self, path: &str, mode: FileMode) -> VfsResult<FileHandle> {
        let (mount, rel) = self.resolve(path)?;
        let id = mount.with(|fs, dev| fs.open(dev, rel, mode))?;
        Ok(FileHandle { mount, id, open: true })
    }

    /// Open a directory stream by drive path
    pub fn opendir(&self, path: &str) -> VfsResult<DirHandle> {
        let (mount, rel) = self.resolve(path)?;
        let id = mount.with(|fs, dev| fs.opendir(dev, rel))?;
        Ok(DirHandle { mount, id, open: true })
    }

    fn resolve<'p>(&self, path: &'p str) -> VfsResult<(Arc<Mount>, &'p str)> {
        let parsed = path::parse(path)?;
        let mount = self.find(parsed.letter).ok_or(VfsError::NotMounted)?;
        Ok((mount, parsed.path))
    }
}

/// An open file
///
/// Closed on [`close`](FileHandle::close) or when dropped.
pub struct FileHandle {
    mount: Arc<Mount>,
    id: FileId,
    open: bool,
}

impl FileHandle {
    pub fn drive_letter(&self) -> char {
        self.mount.letter()
    }

    /// Read up to `buffer.len()` bytes; the buffer is zeroed first
    pub fn read(&mut self, buffer: &mut [u8]) -> VfsResult<usize> {
        buffer.fill(0);
        let id = self.id;
        self.mount.with(|fs, dev| fs.read(dev, id, buffer))
    }

    pub fn write(&mut self, buffer: &[u8]) -> VfsResult<usize> {
        let id = self.id;
        self.mount.with(|fs, dev| fs.write(dev, id, buffer))
    }

    /// Move the file position; returns the new absolute offset
    pub fn lseek(&mut self, offset: i64, whence: SeekFrom) -> VfsResult<u64> {
        let id = self.id;
        self.mount.with(|fs, dev| fs.lseek(dev, id, offset, whence))
    }

    pub fn close(mut self) -> VfsResult<()> {
        self.release()
    }

    fn release(&mut self) -> VfsResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let id = self.id;
        self.mount.with(|fs, dev| fs.close(dev, id))
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// An open directory stream
pub struct DirHandle {
    mount: Arc<Mount>,
    id: DirId,
    open: bool,
}

impl DirHandle {
    pub fn drive_letter(&self) -> char {
        self.mount.letter()
    }

    /// Next entry, or `None` at the end of the directory
    pub fn readdir(&mut self) -> VfsResult<Option<DirEntry>> {
        let id = self.id;
        self.mount.with(|fs, dev| fs.readdir(dev, id))
    }

    pub fn closedir(mut self) -> VfsResult<()> {
        self.release()
    }

    fn release(&mut self) -> VfsResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let id = self.id;
        self.mount.with(|fs, dev| {
            fs.closedir(dev, id);
            Ok(())
        })
    }
}

impl Drop for DirHandle {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
