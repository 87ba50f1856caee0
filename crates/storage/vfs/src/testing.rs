//! In-memory transport and backend used by the registry and dispatcher tests

use std::collections::HashMap;
use std::string::{String, ToString};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use xbox_driver_traits::{
    transfer_len, BlockTransport, BlockTransportExt, DriverError, DriverResult, IoctlCommand,
    TransportContext, TransportDriver,
};

use crate::{DirEntry, DirId, FileId, FileMode, FileType, Filesystem, FilesystemDriver, SeekFrom};
use crate::{VfsError, VfsResult};

pub const SECTOR: usize = 512;

/// Ordered record of tear-down and completion events
#[derive(Default)]
pub struct Log(StdMutex<Vec<String>>);

impl Log {
    pub fn push(&self, event: &str) {
        self.0.lock().unwrap().push(event.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Backing store shared by every transport bound from one [`RamDriver`]
pub struct RamDisk {
    pub data: StdMutex<Vec<u8>>,
    pub inits: AtomicUsize,
    pub deinits: AtomicUsize,
    pub fail_init: AtomicBool,
    log: Arc<Log>,
}

impl RamDisk {
    pub fn new(sectors: usize, log: Arc<Log>) -> Arc<Self> {
        Arc::new(RamDisk {
            data: StdMutex::new(vec![0; sectors * SECTOR]),
            inits: AtomicUsize::new(0),
            deinits: AtomicUsize::new(0),
            fail_init: AtomicBool::new(false),
            log,
        })
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        self.data.lock().unwrap()[offset..offset + len].to_vec()
    }
}

pub struct RamDriver(pub Arc<RamDisk>);

impl TransportDriver for RamDriver {
    fn name(&self) -> &'static str {
        "ram"
    }

    fn init(&self, _ctx: &TransportContext) -> DriverResult<Box<dyn BlockTransport>> {
        if self.0.fail_init.load(Ordering::SeqCst) {
            return Err(DriverError::DeviceNotFound);
        }
        self.0.inits.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RamTransport { disk: Arc::clone(&self.0) }))
    }
}

struct RamTransport {
    disk: Arc<RamDisk>,
}

impl RamTransport {
    fn span(&self, sector_offset: u64, sector_count: usize, buffer_len: usize) -> DriverResult<(usize, usize)> {
        let len = transfer_len(sector_count, SECTOR, buffer_len)?;
        let start = sector_offset as usize * SECTOR;
        if start + len > self.disk.data.lock().unwrap().len() {
            return Err(DriverError::OutOfRange);
        }
        Ok((start, len))
    }
}

impl BlockTransport for RamTransport {
    fn read(&mut self, buffer: &mut [u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        let (start, len) = self.span(sector_offset, sector_count, buffer.len())?;
        buffer[..len].copy_from_slice(&self.disk.data.lock().unwrap()[start..start + len]);
        Ok(())
    }

    fn write(&mut self, buffer: &[u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        let (start, len) = self.span(sector_offset, sector_count, buffer.len())?;
        self.disk.data.lock().unwrap()[start..start + len].copy_from_slice(&buffer[..len]);
        Ok(())
    }

    fn ioctl(&mut self, cmd: IoctlCommand) -> DriverResult<u64> {
        Ok(match cmd {
            IoctlCommand::Sync => 0,
            IoctlCommand::GetSectorCount => (self.disk.data.lock().unwrap().len() / SECTOR) as u64,
            IoctlCommand::GetSectorSize => SECTOR as u64,
            IoctlCommand::GetBlockSize => 1,
        })
    }

    fn deinit(&mut self) {
        self.disk.deinits.fetch_add(1, Ordering::SeqCst);
        self.disk.log.push("transport deinit");
    }
}

/// Holds a backend read open until released
#[derive(Default)]
pub struct Gate {
    pub entered: AtomicBool,
    pub open: AtomicBool,
}

impl Gate {
    pub fn wait_entered(&self) {
        while !self.entered.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }

    pub fn release(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

/// Backend exposing the whole disk as a single file, `/DATA`
pub struct FlatDriver {
    pub reject: bool,
    pub gate: Option<Arc<Gate>>,
    log: Arc<Log>,
}

impl FlatDriver {
    pub fn new(log: Arc<Log>) -> Self {
        FlatDriver { reject: false, gate: None, log }
    }
}

impl FilesystemDriver for FlatDriver {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn init(&self, _letter: char, dev: &mut dyn BlockTransport) -> VfsResult<Box<dyn Filesystem>> {
        let mut boot = [0u8; SECTOR];
        dev.read(&mut boot, 0, 1)?;
        if self.reject {
            return Err(VfsError::NotSupported);
        }
        Ok(Box::new(FlatFs {
            size: dev.sector_count()? * SECTOR as u64,
            files: HashMap::new(),
            dirs: HashMap::new(),
            next_id: 1,
            cache: vec![0; SECTOR],
            gate: self.gate.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FlatFs {
    size: u64,
    files: HashMap<u32, u64>,
    dirs: HashMap<u32, bool>,
    next_id: u32,
    /// One-sector cache shared by every open file on the mount
    cache: Vec<u8>,
    gate: Option<Arc<Gate>>,
    log: Arc<Log>,
}

impl FlatFs {
    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn pos(&self, file: FileId) -> VfsResult<u64> {
        self.files.get(&file.0).copied().ok_or(VfsError::BadHandle)
    }
}

impl Filesystem for FlatFs {
    fn open(&mut self, _dev: &mut dyn BlockTransport, path: &str, _mode: FileMode) -> VfsResult<FileId> {
        if path != "/DATA" {
            return Err(VfsError::NotFound);
        }
        let id = self.alloc_id();
        self.files.insert(id, 0);
        Ok(FileId(id))
    }

    fn read(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &mut [u8]) -> VfsResult<usize> {
        if let Some(gate) = &self.gate {
            gate.entered.store(true, Ordering::SeqCst);
            while !gate.open.load(Ordering::SeqCst) {
                thread::yield_now();
            }
        }

        let mut pos = self.pos(file)?;
        let mut done = 0;
        while done < buffer.len() && pos < self.size {
            let sector = pos / SECTOR as u64;
            let offset = (pos % SECTOR as u64) as usize;
            dev.read(&mut self.cache, sector, 1)?;
            let n = (SECTOR - offset).min(buffer.len() - done);
            buffer[done..done + n].copy_from_slice(&self.cache[offset..offset + n]);
            done += n;
            pos += n as u64;
        }
        self.files.insert(file.0, pos);

        if self.gate.is_some() {
            self.log.push("read done");
        }
        Ok(done)
    }

    fn write(&mut self, dev: &mut dyn BlockTransport, file: FileId, buffer: &[u8]) -> VfsResult<usize> {
        let mut pos = self.pos(file)?;
        let mut done = 0;
        while done < buffer.len() && pos < self.size {
            let sector = pos / SECTOR as u64;
            let offset = (pos % SECTOR as u64) as usize;
            dev.read(&mut self.cache, sector, 1)?;
            // Widen the read-modify-write window
            thread::yield_now();
            let n = (SECTOR - offset).min(buffer.len() - done);
            self.cache[offset..offset + n].copy_from_slice(&buffer[done..done + n]);
            dev.write(&self.cache, sector, 1)?;
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

    fn close(&mut self, _dev: &mut dyn BlockTransport, file: FileId) -> VfsResult<()> {
        self.files.remove(&file.0).map(|_| ()).ok_or(VfsError::BadHandle)
    }

    fn opendir(&mut self, _dev: &mut dyn BlockTransport, path: &str) -> VfsResult<DirId> {
        if path != "/" {
            return Err(VfsError::NotFound);
        }
        let id = self.alloc_id();
        self.dirs.insert(id, false);
        Ok(DirId(id))
    }

    fn readdir(&mut self, _dev: &mut dyn BlockTransport, dir: DirId) -> VfsResult<Option<DirEntry>> {
        let listed = self.dirs.get_mut(&dir.0).ok_or(VfsError::BadHandle)?;
        if *listed {
            return Ok(None);
        }
        *listed = true;
        DirEntry::new("DATA", self.size, FileType::Regular).map(Some)
    }

    fn closedir(&mut self, _dev: &mut dyn BlockTransport, dir: DirId) {
        self.dirs.remove(&dir.0);
    }

    fn deinit(&mut self, _dev: &mut dyn BlockTransport) {
        self.log.push("fs deinit");
    }
}
