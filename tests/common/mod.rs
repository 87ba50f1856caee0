//! Shared fixtures: signature-checking backends and a threaded USB host

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use xbox_storage::traits::{BlockTransport, BlockTransportExt, DriverError, DriverResult};
use xbox_storage::usb_msc::{MscHost, Transfer, CSW_STATUS_PASSED};
use xbox_storage::vfs::{
    DirEntry, DirId, FileId, FileMode, FileType, Filesystem, FilesystemDriver, SeekFrom, VfsError, VfsResult,
};

/// Backend that accepts a drive carrying `magic` at (`sector`, `offset`)
///
/// Mounted drives expose the raw device as one file, `/RAW`.
pub struct MagicFs {
    pub name: &'static str,
    pub sector: u64,
    pub offset: usize,
    pub magic: &'static [u8],
}

pub const FAT: MagicFs = MagicFs { name: "fat", sector: 0, offset: 510, magic: &[0x55, 0xAA] };
pub const FATX: MagicFs = MagicFs { name: "fatx", sector: 0, offset: 0, magic: b"FATX" };
pub const ISO9660: MagicFs = MagicFs { name: "iso9660", sector: 16, offset: 1, magic: b"CD001" };

impl FilesystemDriver for MagicFs {
    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self, _letter: char, dev: &mut dyn BlockTransport) -> VfsResult<Box<dyn Filesystem>> {
        let sector_size = dev.sector_size()? as usize;
        let mut buf = vec![0u8; sector_size];
        dev.read(&mut buf, self.sector, 1)?;
        if buf.get(self.offset..self.offset + self.magic.len()) != Some(self.magic) {
            return Err(VfsError::NotSupported);
        }
        Ok(Box::new(RawFs {
            sector_size,
            size: dev.sector_count()? * sector_size as u64,
            files: HashMap::new(),
            dirs: HashMap::new(),
            next_id: 1,
        }))
    }
}

struct RawFs {
    sector_size: usize,
    size: u64,
    files: HashMap<u32, u64>,
    dirs: HashMap<u32, bool>,
    next_id: u32,
}

impl RawFs {
    fn pos(&self, file: FileId) -> VfsResult<u64> {
        self.files.get(&file.0).copied().ok_or(VfsError::BadHandle)
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl Filesystem for RawFs {
    fn open(&mut self, _dev: &mut dyn BlockTransport, path: &str, _mode: FileMode) -> VfsResult<FileId> {
        if path != "/RAW" {
            return Err(VfsError::NotFound);
        }
        let id = self.next();
        self.files.insert(id, 0);
        Ok(FileId(id))
    }

    fn read(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &mut [u8]) -> VfsResult<usize> {
        let mut pos = self.pos(file)?;
        let mut sector = vec![0u8; self.sector_size];
        let mut done = 0;
        while done < buffer.len() && pos < self.size {
            let offset = (pos % self.sector_size as u64) as usize;
            dev.read(&mut sector, pos / self.sector_size as u64, 1)?;
            let n = (self.sector_size - offset).min(buffer.len() - done);
            buffer[done..done + n].copy_from_slice(&sector[offset..offset + n]);
            done += n;
            pos += n as u64;
        }
        self.files.insert(file.0, pos);
        Ok(done)
    }

    fn write(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &[u8]) -> VfsResult<usize> {
        let mut pos = self.pos(file)?;
        let mut sector = vec![0u8; self.sector_size];
        let mut done = 0;
        while done < buffer.len() && pos < self.size {
            let lba = pos / self.sector_size as u64;
            let offset = (pos % self.sector_size as u64) as usize;
            dev.read(&mut sector, lba, 1)?;
            let n = (self.sector_size - offset).min(buffer.len() - done);
            sector[offset..offset + n].copy_from_slice(&buffer[done..done + n]);
            dev.write(&sector, lba, 1)?;
            done += n;
            pos += n as u64;
        }
        self.files.insert(file.0, pos);
        Ok(done)
    }

    fn lseek(&mut self, _dev: &mut dyn BlockTransport, file: FileId, offset: i64, whence: SeekFrom) -> VfsResult<u64> {
        let pos = whence.resolve(offset, self.pos(file)?, self.size)?;
        self.files.insert(file.0, pos);
        Ok(pos)
    }

    fn close(&mut self, dev: &mut dyn BlockTransport, file: FileId) -> VfsResult<()> {
        self.files.remove(&file.0).ok_or(VfsError::BadHandle)?;
        dev.sync()?;
        Ok(())
    }

    fn opendir(&mut self, _dev: &mut dyn BlockTransport, path: &str) -> VfsResult<DirId> {
        if path != "/" {
            return Err(VfsError::NotFound);
        }
        let id = self.next();
        self.dirs.insert(id, false);
        Ok(DirId(id))
    }

    fn readdir(&mut self, _dev: &mut dyn BlockTransport, dir: DirId) -> VfsResult<Option<DirEntry>> {
        let listed = self.dirs.get_mut(&dir.0).ok_or(VfsError::BadHandle)?;
        if std::mem::replace(listed, true) {
            return Ok(None);
        }
        DirEntry::new("RAW", self.size, FileType::Regular).map(Some)
    }

    fn closedir(&mut self, _dev: &mut dyn BlockTransport, dir: DirId) {
        self.dirs.remove(&dir.0);
    }
}

/// USB host whose units complete transfers from a worker thread
pub struct ThreadedHost {
    units: Mutex<HashMap<u8, Arc<Mutex<Vec<u8>>>>>,
}

pub const USB_BLOCK: usize = 512;

impl ThreadedHost {
    pub fn new() -> Arc<Self> {
        Arc::new(ThreadedHost { units: Mutex::new(HashMap::new()) })
    }

    /// Plug in a unit with the given image
    pub fn insert(&self, dev_addr: u8, image: Vec<u8>) {
        self.units.lock().unwrap().insert(dev_addr, Arc::new(Mutex::new(image)));
    }

    pub fn image(&self, dev_addr: u8) -> Vec<u8> {
        self.units.lock().unwrap()[&dev_addr].lock().unwrap().clone()
    }

    fn unit(&self, dev_addr: u8) -> DriverResult<Arc<Mutex<Vec<u8>>>> {
        self.units.lock().unwrap().get(&dev_addr).cloned().ok_or(DriverError::DeviceNotFound)
    }

    fn submit(&self, dev_addr: u8, transfer: Arc<Transfer>, read: bool) -> DriverResult<()> {
        let unit = self.unit(dev_addr)?;
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(1));
            let start = transfer.lba() as usize * USB_BLOCK;
            let len = transfer.blocks() as usize * USB_BLOCK;
            let mut image = unit.lock().unwrap();
            if read {
                transfer.data().copy_from_slice(&image[start..start + len]);
            } else {
                image[start..start + len].copy_from_slice(&transfer.data());
            }
            transfer.complete(CSW_STATUS_PASSED);
        });
        Ok(())
    }
}

impl MscHost for ThreadedHost {
    fn submit_read10(&self, dev_addr: u8, _lun: u8, transfer: Arc<Transfer>) -> DriverResult<()> {
        self.submit(dev_addr, transfer, true)
    }

    fn submit_write10(&self, dev_addr: u8, _lun: u8, transfer: Arc<Transfer>) -> DriverResult<()> {
        self.submit(dev_addr, transfer, false)
    }

    fn block_count(&self, dev_addr: u8, _lun: u8) -> u32 {
        self.unit(dev_addr).map(|u| (u.lock().unwrap().len() / USB_BLOCK) as u32).unwrap_or(0)
    }

    fn block_size(&self, dev_addr: u8, _lun: u8) -> u32 {
        if self.unit(dev_addr).is_ok() {
            USB_BLOCK as u32
        } else {
            0
        }
    }
}

/// Image of `blocks` sectors with `magic` written at (`sector`, `offset`)
pub fn image_with(blocks: usize, fs: &MagicFs, sector_size: usize) -> Vec<u8> {
    let mut image = vec![0u8; blocks * sector_size];
    let at = fs.sector as usize * sector_size + fs.offset;
    image[at..at + fs.magic.len()].copy_from_slice(fs.magic);
    image
}
