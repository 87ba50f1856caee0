//! Register-level IDE channel simulator
//!
//! Models the task file, the control block, the busmaster engine and two
//! units backed by sparse sector maps. DMA rounds are executed when the
//! busmaster start bit is set, by walking the descriptor table the driver
//! wrote into the window, so descriptor and chunking bugs show up as data
//! corruption or busmaster errors just as they would on hardware.
//!
//! Every command and DMA round is recorded for assertions. Failures can be
//! injected: a unit that never drops BSY, a busmaster error on the next
//! round, or an aborted next command.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use crate::channel::{BusPorts, IdeChannel};
use crate::config::AtaConfig;
use crate::identify::{put_ata_string, DeviceIndex, ATAPI_SECTOR_SIZE, ATA_SECTOR_SIZE, IDENTIFY_WORDS};
use crate::prdt::{DmaWindow, PrdEntry, PRD_ENTRY_SIZE, PRD_MAX_BYTES};
use crate::regs::*;

/// Physical address the simulated window pretends to live at
pub const SIM_WINDOW_PHYS: u32 = 0x0080_0000;

/// A unit to attach to the simulated cable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimUnit {
    pub atapi: bool,
    pub lba28_sectors: u32,
    pub lba48_sectors: Option<u64>,
    /// Sectors on the loaded disc; `None` with an empty tray
    pub medium_sectors: Option<u64>,
    /// IDENTIFY word 88 mode mask
    pub udma_modes: u16,
    pub cable_80_wire: bool,
    pub model: &'static str,
}

impl SimUnit {
    /// Disk with 28-bit addressing only
    pub fn disk(sectors: u32) -> Self {
        SimUnit {
            atapi: false,
            lba28_sectors: sectors,
            lba48_sectors: None,
            medium_sectors: None,
            udma_modes: 0x1F,
            cable_80_wire: false,
            model: "SIM-DISK-28",
        }
    }

    /// Disk with both feature sets; the 28-bit count saturates
    pub fn lba48_disk(sectors: u64) -> Self {
        SimUnit {
            atapi: false,
            lba28_sectors: sectors.min(0x0FFF_FFFF) as u32,
            lba48_sectors: Some(sectors),
            medium_sectors: None,
            udma_modes: 0x3F,
            cable_80_wire: true,
            model: "SIM-DISK-48",
        }
    }

    /// Optical drive, optionally with a disc of `medium` sectors
    pub fn optical(medium: Option<u64>) -> Self {
        SimUnit {
            atapi: true,
            lba28_sectors: 0,
            lba48_sectors: None,
            medium_sectors: medium,
            udma_modes: 0x07,
            cable_80_wire: false,
            model: "SIM-DVD",
        }
    }

    pub fn with_udma_modes(mut self, modes: u16, cable_80_wire: bool) -> Self {
        self.udma_modes = modes;
        self.cable_80_wire = cable_80_wire;
        self
    }

    fn sector_size(&self) -> usize {
        if self.atapi {
            ATAPI_SECTOR_SIZE as usize
        } else {
            ATA_SECTOR_SIZE as usize
        }
    }

    fn capacity(&self) -> u64 {
        if self.atapi {
            self.medium_sectors.unwrap_or(0)
        } else {
            (self.lba28_sectors as u64).max(self.lba48_sectors.unwrap_or(0))
        }
    }

    fn identify_words(&self) -> [u16; IDENTIFY_WORDS] {
        let mut words = [0u16; IDENTIFY_WORDS];
        if self.atapi {
            words[0] = 0x8580;
        } else {
            words[60] = self.lba28_sectors as u16;
            words[61] = (self.lba28_sectors >> 16) as u16;
            if let Some(n) = self.lba48_sectors {
                words[83] |= 1 << 10;
                words[100] = n as u16;
                words[101] = (n >> 16) as u16;
                words[102] = (n >> 32) as u16;
                words[103] = (n >> 48) as u16;
            }
        }
        if self.udma_modes != 0 {
            words[53] |= 1 << 2;
            words[88] = self.udma_modes;
        }
        if self.cable_80_wire {
            words[93] |= 1 << 13;
        }
        put_ata_string(&mut words[10..20], "SIM0001");
        put_ata_string(&mut words[23..27], "1.0");
        put_ata_string(&mut words[27..47], self.model);
        words
    }
}

/// One command as the unit decoded it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRecord {
    pub unit: DeviceIndex,
    pub command: u8,
    pub feature: u8,
    /// Decoded count (0 in the register is already expanded)
    pub sector_count: u32,
    pub lba: u64,
}

/// One executed busmaster round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmaRound {
    pub entries: Vec<PrdEntry>,
    pub bytes: usize,
    /// Device to memory
    pub read: bool,
}

#[derive(Debug)]
struct UnitState {
    unit: SimUnit,
    sectors: BTreeMap<u64, Vec<u8>>,
    selected_udma: Option<u8>,
}

impl UnitState {
    fn read_sectors(&self, lba: u64, count: u64) -> Vec<u8> {
        let size = self.unit.sector_size();
        let mut out = Vec::with_capacity(count as usize * size);
        for n in lba..lba + count {
            match self.sectors.get(&n) {
                Some(data) => out.extend_from_slice(data),
                None => out.resize(out.len() + size, 0),
            }
        }
        out
    }

    fn write_sectors(&mut self, lba: u64, data: &[u8]) {
        let size = self.unit.sector_size();
        for (i, chunk) in data.chunks(size).enumerate() {
            let mut sector = vec![0u8; size];
            sector[..chunk.len()].copy_from_slice(chunk);
            self.sectors.insert(lba + i as u64, sector);
        }
    }
}

#[derive(Debug)]
enum Pending {
    /// Data ready to be pushed to memory
    Read(Vec<u8>),
    /// Data to pull from memory into the unit
    Write { unit: usize, lba: u64, bytes: usize },
    /// Command was rejected; the round completes without data
    Failed,
}

/// Observable and injectable simulator state
#[derive(Debug)]
pub struct SimState {
    units: [Option<UnitState>; 2],
    selected: usize,
    drive: u8,
    feature: u8,
    // (previous, current) pairs: the task file is a two-deep FIFO for 48-bit commands
    sector_count: [u8; 2],
    lba_low: [u8; 2],
    lba_mid: [u8; 2],
    lba_high: [u8; 2],
    device_control: u8,
    status: u8,
    error: u8,
    data_out: VecDeque<u16>,
    packet: Option<Vec<u16>>,
    pending: Option<Pending>,
    bm_command: u8,
    bm_status: u8,
    prdt_address: u32,
    stuck_busy: bool,
    fail_next_dma: bool,
    abort_next_command: bool,
    commands: Vec<CommandRecord>,
    rounds: Vec<DmaRound>,
    packets: Vec<[u8; ATAPI_PACKET_LEN]>,
}

impl SimState {
    fn new() -> Self {
        SimState {
            units: [None, None],
            selected: 0,
            drive: 0,
            feature: 0,
            sector_count: [0; 2],
            lba_low: [0; 2],
            lba_mid: [0; 2],
            lba_high: [0; 2],
            device_control: 0,
            status: STATUS_RDY,
            error: 0,
            data_out: VecDeque::new(),
            packet: None,
            pending: None,
            bm_command: 0,
            bm_status: 0,
            prdt_address: 0,
            stuck_busy: false,
            fail_next_dma: false,
            abort_next_command: false,
            commands: Vec::new(),
            rounds: Vec::new(),
            packets: Vec::new(),
        }
    }

    /// Keep BSY set forever, as a hung unit would
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Report a busmaster error on the next round
    pub fn fail_next_dma(&mut self) {
        self.fail_next_dma = true;
    }

    /// Abort the next command with ERR/ABRT
    pub fn abort_next_command(&mut self) {
        self.abort_next_command = true;
    }

    pub fn commands(&self) -> &[CommandRecord] {
        &self.commands
    }

    pub fn rounds(&self) -> &[DmaRound] {
        &self.rounds
    }

    pub fn packets(&self) -> &[[u8; ATAPI_PACKET_LEN]] {
        &self.packets
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.rounds.clear();
        self.packets.clear();
    }

    /// Last value written to the device control register
    pub fn device_control(&self) -> u8 {
        self.device_control
    }

    /// UDMA mode programmed with SET FEATURES
    pub fn selected_udma(&self, index: DeviceIndex) -> Option<u8> {
        self.units[index.index()].as_ref().and_then(|u| u.selected_udma)
    }

    /// Raw contents of `count` sectors
    pub fn sectors(&self, index: DeviceIndex, lba: u64, count: u64) -> Vec<u8> {
        match &self.units[index.index()] {
            Some(unit) => unit.read_sectors(lba, count),
            None => Vec::new(),
        }
    }

    /// Preload sector contents (disc images, partition tables)
    pub fn load(&mut self, index: DeviceIndex, lba: u64, data: &[u8]) {
        if let Some(unit) = self.units[index.index()].as_mut() {
            unit.write_sectors(lba, data);
        }
    }

    fn present(&self) -> bool {
        self.units[self.selected].is_some()
    }

    fn read_status(&self) -> u8 {
        if !self.present() {
            0
        } else if self.stuck_busy {
            STATUS_BSY | STATUS_RDY
        } else {
            self.status
        }
    }

    fn push(reg: &mut [u8; 2], value: u8) {
        reg[0] = reg[1];
        reg[1] = value;
    }

    fn lba28(&self) -> (u64, u32) {
        let lba = self.lba_low[1] as u64
            | (self.lba_mid[1] as u64) << 8
            | (self.lba_high[1] as u64) << 16
            | ((self.drive & 0x0F) as u64) << 24;
        let count = match self.sector_count[1] {
            0 => 256,
            n => n as u32,
        };
        (lba, count)
    }

    fn lba48(&self) -> (u64, u32) {
        let lba = self.lba_low[1] as u64
            | (self.lba_mid[1] as u64) << 8
            | (self.lba_high[1] as u64) << 16
            | (self.lba_low[0] as u64) << 24
            | (self.lba_mid[0] as u64) << 32
            | (self.lba_high[0] as u64) << 40;
        let count = match (self.sector_count[0] as u32) << 8 | self.sector_count[1] as u32 {
            0 => 65536,
            n => n,
        };
        (lba, count)
    }

    /// Reject the current command; a DMA round started for it ends without data
    fn abort(&mut self, error: u8) {
        self.status = STATUS_RDY | STATUS_ERR;
        self.error = error;
        self.data_out.clear();
        self.pending = Some(Pending::Failed);
    }

    fn write_device_control(&mut self, value: u8) {
        let was_reset = self.device_control & CTRL_SOFTWARE_RESET != 0;
        self.device_control = value;
        if value & CTRL_SOFTWARE_RESET != 0 {
            self.status = STATUS_BSY;
        } else if was_reset {
            self.status = STATUS_RDY;
            self.error = 1;
            self.selected = 0;
            self.pending = None;
            self.packet = None;
            self.data_out.clear();
        }
    }

    fn command(&mut self, command: u8) {
        if !self.present() || self.stuck_busy {
            return;
        }
        let unit = self.selected;
        let index = DeviceIndex::from_index(unit as u8).unwrap_or(DeviceIndex::Master);
        let (lba, count) = match command {
            CMD_READ_DMA_EXT | CMD_WRITE_DMA_EXT | CMD_FLUSH_CACHE_EXT => self.lba48(),
            _ => self.lba28(),
        };
        self.commands.push(CommandRecord {
            unit: index,
            command,
            feature: self.feature,
            sector_count: count,
            lba,
        });
        self.error = 0;
        self.pending = None;

        if self.abort_next_command {
            self.abort_next_command = false;
            self.abort(ERROR_ABRT);
            return;
        }

        let atapi = self.units[unit].as_ref().map(|u| u.unit.atapi).unwrap_or(false);
        match command {
            CMD_IDENTIFY if atapi => {
                self.abort(ERROR_ABRT);
                self.lba_mid[1] = ATAPI_SIGNATURE_MID;
                self.lba_high[1] = ATAPI_SIGNATURE_HIGH;
            }
            CMD_IDENTIFY | CMD_IDENTIFY_PACKET => {
                if (command == CMD_IDENTIFY_PACKET) != atapi {
                    self.abort(ERROR_ABRT);
                    return;
                }
                let words = match &self.units[unit] {
                    Some(u) => u.unit.identify_words(),
                    None => return,
                };
                self.data_out = words.iter().copied().collect();
                self.status = STATUS_RDY | STATUS_DRQ;
            }
            CMD_READ_DMA | CMD_READ_DMA_EXT | CMD_WRITE_DMA | CMD_WRITE_DMA_EXT if !atapi => {
                let (lba, count) = if command == CMD_READ_DMA_EXT || command == CMD_WRITE_DMA_EXT {
                    self.lba48()
                } else {
                    self.lba28()
                };
                let in_range = self.units[unit]
                    .as_ref()
                    .map(|u| lba + count as u64 <= u.unit.capacity())
                    .unwrap_or(false);
                if !in_range {
                    self.abort(ERROR_IDNF);
                    return;
                }
                self.pending = Some(match command {
                    CMD_READ_DMA | CMD_READ_DMA_EXT => match &self.units[unit] {
                        Some(u) => Pending::Read(u.read_sectors(lba, count as u64)),
                        None => Pending::Failed,
                    },
                    _ => Pending::Write { unit, lba, bytes: count as usize * ATA_SECTOR_SIZE as usize },
                });
                self.status = STATUS_RDY | STATUS_DRQ;
            }
            CMD_PACKET if atapi => {
                self.packet = Some(Vec::with_capacity(ATAPI_PACKET_LEN / 2));
                self.status = STATUS_RDY | STATUS_DRQ;
            }
            CMD_FLUSH_CACHE | CMD_FLUSH_CACHE_EXT if !atapi => {
                self.status = STATUS_RDY;
            }
            CMD_SET_FEATURES => {
                if self.feature == FEATURE_SET_TRANSFER_MODE {
                    let value = self.sector_count[1];
                    if value & 0xF8 == TRANSFER_MODE_UDMA {
                        let mode = value & 0x07;
                        let supported = self.units[unit]
                            .as_ref()
                            .map(|u| u.unit.udma_modes & (1 << mode) != 0)
                            .unwrap_or(false);
                        if !supported {
                            self.abort(ERROR_ABRT);
                            return;
                        }
                        if let Some(u) = self.units[unit].as_mut() {
                            u.selected_udma = Some(mode);
                        }
                    }
                }
                self.status = STATUS_RDY;
            }
            _ => self.abort(ERROR_ABRT),
        }
    }

    fn packet_word(&mut self, word: u16) {
        let Some(words) = self.packet.as_mut() else {
            return;
        };
        words.push(word);
        if words.len() < ATAPI_PACKET_LEN / 2 {
            return;
        }

        let mut packet = [0u8; ATAPI_PACKET_LEN];
        for (i, w) in words.iter().enumerate() {
            packet[i * 2..i * 2 + 2].copy_from_slice(&w.to_le_bytes());
        }
        self.packet = None;
        self.packets.push(packet);

        let medium = self.units[self.selected].as_ref().and_then(|u| u.unit.medium_sectors);
        let Some(medium) = medium else {
            // NOT READY, medium not present
            self.abort(0x20);
            return;
        };
        match packet[0] {
            SCSI_READ_CAPACITY_10 => {
                let last = (medium.saturating_sub(1) as u32).to_be_bytes();
                let block = (ATAPI_SECTOR_SIZE as u32).to_be_bytes();
                let mut data = Vec::with_capacity(8);
                data.extend_from_slice(&last);
                data.extend_from_slice(&block);
                self.pending = Some(Pending::Read(data));
                self.status = STATUS_RDY | STATUS_DRQ;
            }
            SCSI_READ_12 => {
                let lba = u32::from_be_bytes([packet[2], packet[3], packet[4], packet[5]]) as u64;
                let count = u32::from_be_bytes([packet[6], packet[7], packet[8], packet[9]]) as u64;
                if lba + count > medium {
                    // ILLEGAL REQUEST
                    self.abort(0x50);
                    return;
                }
                let data = match &self.units[self.selected] {
                    Some(u) => u.read_sectors(lba, count),
                    None => Vec::new(),
                };
                self.pending = Some(Pending::Read(data));
                self.status = STATUS_RDY | STATUS_DRQ;
            }
            _ => self.abort(ERROR_ABRT),
        }
    }

    fn data_word(&mut self) -> u16 {
        let word = self.data_out.pop_front().unwrap_or(0);
        if self.data_out.is_empty() && self.status & STATUS_DRQ != 0 {
            self.status = STATUS_RDY;
        }
        word
    }

    /// Walk the descriptor table the driver loaded
    fn descriptors(&self, window: &DmaWindow<'_>) -> Option<Vec<PrdEntry>> {
        let mut entries = Vec::new();
        let mut at = self.prdt_address.checked_sub(window.phys_base)? as usize;
        if at % 4 != 0 {
            return None;
        }
        loop {
            let raw = window.bytes.get(at..at + PRD_ENTRY_SIZE)?;
            let entry = PrdEntry::from_bytes(raw)?;
            entries.push(entry);
            if entry.is_last() {
                return Some(entries);
            }
            if entries.len() > PRD_MAX_BYTES / PRD_ENTRY_SIZE {
                return None;
            }
            at += PRD_ENTRY_SIZE;
        }
    }

    fn start_dma(&mut self, window: DmaWindow<'_>) {
        self.bm_status |= BM_STATUS_ACTIVE;
        let Some(pending) = self.pending.take() else {
            // Nothing to transfer: the engine sits active until the driver gives up
            return;
        };

        if self.fail_next_dma {
            self.fail_next_dma = false;
            self.bm_status = (self.bm_status & !BM_STATUS_ACTIVE) | BM_STATUS_ERROR | BM_STATUS_INTERRUPT;
            self.status = STATUS_RDY;
            return;
        }

        let read = self.bm_command & BM_COMMAND_READ != 0;
        let entries = match (&pending, self.descriptors(&window)) {
            (Pending::Failed, _) => {
                self.bm_status = (self.bm_status & !BM_STATUS_ACTIVE) | BM_STATUS_INTERRUPT;
                return;
            }
            (_, Some(entries)) => entries,
            (_, None) => {
                self.bm_status = (self.bm_status & !BM_STATUS_ACTIVE) | BM_STATUS_ERROR | BM_STATUS_INTERRUPT;
                return;
            }
        };
        let total: usize = entries.iter().map(|e| e.len()).sum();

        let ok = match pending {
            Pending::Read(data) if read && total == data.len() => {
                let mut offset = 0;
                let mut ok = true;
                for entry in &entries {
                    let start = entry.phys_addr.wrapping_sub(window.phys_base) as usize;
                    match window.bytes.get_mut(start..start + entry.len()) {
                        Some(dst) => dst.copy_from_slice(&data[offset..offset + entry.len()]),
                        None => ok = false,
                    }
                    offset += entry.len();
                }
                ok
            }
            Pending::Write { unit, lba, bytes } if !read && total == bytes => {
                let mut data = Vec::with_capacity(bytes);
                let mut ok = true;
                for entry in &entries {
                    let start = entry.phys_addr.wrapping_sub(window.phys_base) as usize;
                    match window.bytes.get(start..start + entry.len()) {
                        Some(src) => data.extend_from_slice(src),
                        None => ok = false,
                    }
                }
                if ok {
                    if let Some(u) = self.units[unit].as_mut() {
                        u.write_sectors(lba, &data);
                    }
                }
                ok
            }
            _ => false,
        };

        self.rounds.push(DmaRound { entries, bytes: total, read });
        self.bm_status &= !BM_STATUS_ACTIVE;
        self.bm_status |= BM_STATUS_INTERRUPT;
        if ok {
            self.status = STATUS_RDY;
        } else {
            self.bm_status |= BM_STATUS_ERROR;
        }
    }
}

/// Simulated channel; cheap to inspect through a [`SimHandle`]
pub struct SimChannel {
    ports: BusPorts,
    window: Vec<u8>,
    state: Arc<Mutex<SimState>>,
}

/// Shared view of a [`SimChannel`]'s state
#[derive(Clone)]
pub struct SimHandle(Arc<Mutex<SimState>>);

impl SimHandle {
    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.0.lock()
    }
}

impl SimChannel {
    /// Empty channel with a window of `window_len` bytes
    pub fn new(window_len: usize) -> Self {
        SimChannel {
            ports: BusPorts::PRIMARY,
            window: vec![0u8; window_len],
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    /// Empty channel with a window sized for `config`
    pub fn for_config(config: &AtaConfig) -> Self {
        Self::new(DmaWindow::required_len(config.max_dma_queue_bytes))
    }

    pub fn with_unit(self, index: DeviceIndex, unit: SimUnit) -> Self {
        self.state.lock().units[index.index()] = Some(UnitState {
            unit,
            sectors: BTreeMap::new(),
            selected_udma: None,
        });
        self
    }

    pub fn handle(&self) -> SimHandle {
        SimHandle(Arc::clone(&self.state))
    }
}

impl IdeChannel for SimChannel {
    fn inb(&mut self, port: u16) -> u8 {
        let st = self.state.lock();
        let p = self.ports;
        if port == p.ctrl(CTRL_ALT_STATUS) || port == p.reg(ATA_REG_STATUS) {
            st.read_status()
        } else if port == p.reg(ATA_REG_ERROR) {
            st.error
        } else if port == p.reg(ATA_REG_SECTOR_COUNT) {
            st.sector_count[1]
        } else if port == p.reg(ATA_REG_LBA_LOW) {
            st.lba_low[1]
        } else if port == p.reg(ATA_REG_LBA_MID) {
            st.lba_mid[1]
        } else if port == p.reg(ATA_REG_LBA_HIGH) {
            st.lba_high[1]
        } else if port == p.reg(ATA_REG_DRIVE) {
            st.drive
        } else if port == p.bm(BM_COMMAND) {
            st.bm_command
        } else if port == p.bm(BM_STATUS) {
            st.bm_status
        } else {
            0xFF
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        let mut st = self.state.lock();
        let p = self.ports;
        if port == p.ctrl(CTRL_DEVICE_CONTROL) {
            st.write_device_control(value);
        } else if port == p.reg(ATA_REG_FEATURES) {
            st.feature = value;
        } else if port == p.reg(ATA_REG_SECTOR_COUNT) {
            SimState::push(&mut st.sector_count, value);
        } else if port == p.reg(ATA_REG_LBA_LOW) {
            SimState::push(&mut st.lba_low, value);
        } else if port == p.reg(ATA_REG_LBA_MID) {
            SimState::push(&mut st.lba_mid, value);
        } else if port == p.reg(ATA_REG_LBA_HIGH) {
            SimState::push(&mut st.lba_high, value);
        } else if port == p.reg(ATA_REG_DRIVE) {
            st.drive = value;
            st.selected = if value & DRIVE_SELECT_SLAVE != 0 { 1 } else { 0 };
        } else if port == p.reg(ATA_REG_COMMAND) {
            st.command(value);
        } else if port == p.bm(BM_COMMAND) {
            let starting = value & BM_COMMAND_START != 0 && st.bm_command & BM_COMMAND_START == 0;
            st.bm_command = value;
            if starting {
                let window = DmaWindow {
                    phys_base: SIM_WINDOW_PHYS,
                    bytes: &mut self.window,
                };
                st.start_dma(window);
            } else if value & BM_COMMAND_START == 0 {
                st.bm_status &= !BM_STATUS_ACTIVE;
            }
        } else if port == p.bm(BM_STATUS) {
            // ERROR and INTERRUPT are write-one-to-clear
            st.bm_status &= !(value & (BM_STATUS_ERROR | BM_STATUS_INTERRUPT));
        }
    }

    fn inw(&mut self, port: u16) -> u16 {
        if port == self.ports.reg(ATA_REG_DATA) {
            self.state.lock().data_word()
        } else {
            0xFFFF
        }
    }

    fn outw(&mut self, port: u16, value: u16) {
        if port == self.ports.reg(ATA_REG_DATA) {
            self.state.lock().packet_word(value);
        }
    }

    fn outl(&mut self, port: u16, value: u32) {
        if port == self.ports.bm(BM_PRDT_ADDRESS) {
            self.state.lock().prdt_address = value;
        }
    }

    fn dma_window(&mut self) -> DmaWindow<'_> {
        DmaWindow {
            phys_base: SIM_WINDOW_PHYS,
            bytes: &mut self.window,
        }
    }
}
