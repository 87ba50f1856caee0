//! IDE bus: probe and chunked DMA transfers
//!
//! An [`IdeBus`] owns one channel. All register traffic happens inside a
//! [`Session`], which exists only while the channel lock is held, so at most
//! one command (and one DMA round) is in flight per bus.

use log::{info, warn};
use spin::Mutex;

use xbox_arch::sched;
use xbox_driver_traits::{debug_storage, transfer_len, DriverError, DriverResult};

use crate::channel::{BusPorts, IdeChannel};
use crate::command::{
    plan_round, read12_packet, read_capacity_packet, Addressing, AtaCommand, Direction,
};
use crate::config::{AtaConfig, UDMA_MODE_40_WIRE_MAX};
use crate::identify::{Device, DeviceIndex, DeviceKind, IDENTIFY_WORDS};
use crate::prdt::{self, DmaWindow};
use crate::regs::*;

/// Where a transfer was when it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferPhase {
    Idle,
    SelectDevice,
    ProgramAddress,
    IssueCommand,
    WaitReady,
    ProgramDescriptors,
    StartDma,
    PollCompletion,
    Complete,
    Error,
}

/// Device side of one DMA round
#[derive(Debug, Clone, Copy)]
enum Request {
    Ata(AtaCommand),
    Packet([u8; ATAPI_PACKET_LEN]),
}

/// One physical IDE channel with up to two units
pub struct IdeBus<C: IdeChannel> {
    ports: BusPorts,
    config: AtaConfig,
    devices: [Option<Device>; 2],
    wire80: bool,
    channel: Mutex<C>,
}

impl<C: IdeChannel> IdeBus<C> {
    /// Reset the channel and identify both units
    ///
    /// A slot that does not answer is left empty; only an unusable
    /// configuration or DMA window fails the whole bus.
    pub fn probe(mut channel: C, ports: BusPorts, config: AtaConfig) -> DriverResult<Self> {
        config.validate()?;
        let needed = DmaWindow::required_len(config.max_dma_queue_bytes);
        {
            let window = channel.dma_window();
            if window.bytes.len() < needed || window.phys_base as usize % prdt::PRD_MAX_BYTES != 0 {
                warn!("ata: DMA window too small or misaligned ({} bytes)", window.bytes.len());
                return Err(DriverError::InvalidParameter);
            }
        }

        let mut devices = [None, None];
        let mut session = Session::new(&mut channel, &ports, &config);
        session.soft_reset();

        for index in [DeviceIndex::Master, DeviceIndex::Slave] {
            match session.identify(index) {
                Ok(Some(device)) => devices[index.index()] = Some(device),
                Ok(None) => {
                    debug_storage!("ata: no unit in slot {:?}", index);
                }
                Err(e) => warn!("ata: slot {:?} did not identify: {}", index, e),
            }
        }

        let wire80 = devices.iter().flatten().any(|d| d.cable_80_wire);
        let udma_cap = if wire80 {
            config.max_udma_mode
        } else {
            config.max_udma_mode.min(UDMA_MODE_40_WIRE_MAX)
        };

        for index in [DeviceIndex::Master, DeviceIndex::Slave] {
            let Some(device) = devices[index.index()].as_mut() else {
                continue;
            };

            if let Some(supported) = device.supported_udma {
                let mode = supported.min(udma_cap);
                match session.set_udma_mode(index, mode) {
                    Ok(()) => device.selected_udma = Some(mode),
                    Err(e) => warn!("ata: UDMA{} rejected by {:?}: {}", mode, index, e),
                }
            }

            if device.is_atapi() {
                let total_sectors = match session.read_capacity(index) {
                    Ok(n) => n,
                    Err(e) => {
                        info!("ata: no medium in {:?} ({})", index, e);
                        0
                    }
                };
                device.kind = DeviceKind::Atapi { total_sectors };
            }

            info!(
                "ata: {:?} '{}' {} sectors of {} bytes, UDMA {:?}",
                index,
                device.model,
                device.total_sectors(),
                device.sector_size,
                device.selected_udma
            );
        }

        Ok(IdeBus {
            ports,
            config,
            devices,
            wire80,
            channel: Mutex::new(channel),
        })
    }

    pub fn device(&self, index: DeviceIndex) -> Option<&Device> {
        self.devices[index.index()].as_ref()
    }

    /// An 80-conductor cable was detected
    pub fn wire80(&self) -> bool {
        self.wire80
    }

    /// Read `sector_count` sectors at `lba` into `buffer`
    pub fn read(&self, index: DeviceIndex, lba: u64, buffer: &mut [u8], sector_count: usize) -> DriverResult<()> {
        let device = self.device(index).ok_or(DriverError::DeviceNotFound)?;
        let len = check_range(device, lba, sector_count, buffer.len())?;
        let sector_size = device.sector_size as usize;

        let mut channel = sched::lock(&self.channel);
        let mut session = Session::new(&mut *channel, &self.ports, &self.config);

        let mut done = 0usize;
        while done < len {
            let at = lba + (done / sector_size) as u64;
            let remaining = ((len - done) / sector_size) as u64;
            let (request, sectors) = self.next_round(device, Direction::Read, at, remaining)?;
            let bytes = sectors as usize * sector_size;

            session.run_round(index, Direction::Read, request, bytes)?;
            let window = session.channel.dma_window();
            buffer[done..done + bytes].copy_from_slice(&window.bytes[..bytes]);
            done += bytes;
        }
        Ok(())
    }

    /// Write `sector_count` sectors from `buffer` at `lba`
    pub fn write(&self, index: DeviceIndex, lba: u64, buffer: &[u8], sector_count: usize) -> DriverResult<()> {
        let device = self.device(index).ok_or(DriverError::DeviceNotFound)?;
        if device.is_atapi() {
            return Err(DriverError::NotSupported);
        }
        let len = check_range(device, lba, sector_count, buffer.len())?;
        let sector_size = device.sector_size as usize;

        let mut channel = sched::lock(&self.channel);
        let mut session = Session::new(&mut *channel, &self.ports, &self.config);

        let mut done = 0usize;
        while done < len {
            let at = lba + (done / sector_size) as u64;
            let remaining = ((len - done) / sector_size) as u64;
            let (request, sectors) = self.next_round(device, Direction::Write, at, remaining)?;
            let bytes = sectors as usize * sector_size;

            {
                let window = session.channel.dma_window();
                window.bytes[..bytes].copy_from_slice(&buffer[done..done + bytes]);
            }
            session.run_round(index, Direction::Write, request, bytes)?;
            done += bytes;
        }
        Ok(())
    }

    /// Flush the unit's write cache
    pub fn flush(&self, index: DeviceIndex) -> DriverResult<()> {
        let device = self.device(index).ok_or(DriverError::DeviceNotFound)?;
        if device.is_atapi() {
            return Ok(());
        }
        let opcode = if device.supports_lba48() {
            CMD_FLUSH_CACHE_EXT
        } else {
            CMD_FLUSH_CACHE
        };

        let mut channel = sched::lock(&self.channel);
        let mut session = Session::new(&mut *channel, &self.ports, &self.config);
        session.non_data(index, AtaCommand::simple(opcode, 0, 0))
    }

    fn next_round(
        &self,
        device: &Device,
        direction: Direction,
        lba: u64,
        remaining: u64,
    ) -> DriverResult<(Request, u32)> {
        let queue_sectors = (self.config.max_dma_queue_bytes / device.sector_size as usize) as u32;
        if device.is_atapi() {
            let sectors = remaining.min(queue_sectors as u64) as u32;
            let lba = u32::try_from(lba).map_err(|_| DriverError::OutOfRange)?;
            return Ok((Request::Packet(read12_packet(lba, sectors)), sectors));
        }
        let (addressing, sectors) = plan_round(device, lba, remaining, queue_sectors)?;
        debug_storage!("ata: {:?} round lba={} sectors={} {:?}", direction, lba, sectors, addressing);
        Ok((Request::Ata(AtaCommand::dma(direction, addressing, lba, sectors)), sectors))
    }
}

/// Validate a transfer before touching hardware; returns its byte length
fn check_range(device: &Device, lba: u64, sector_count: usize, buffer_len: usize) -> DriverResult<usize> {
    let len = transfer_len(sector_count, device.sector_size as usize, buffer_len)?;
    let end = lba
        .checked_add(sector_count as u64)
        .ok_or(DriverError::OutOfRange)?;
    if end > device.total_sectors() {
        return Err(DriverError::OutOfRange);
    }
    Ok(len)
}

/// Register-level work on a locked channel
struct Session<'a, C: IdeChannel> {
    channel: &'a mut C,
    ports: &'a BusPorts,
    config: &'a AtaConfig,
    phase: TransferPhase,
}

impl<'a, C: IdeChannel> Session<'a, C> {
    fn new(channel: &'a mut C, ports: &'a BusPorts, config: &'a AtaConfig) -> Self {
        Session { channel, ports, config, phase: TransferPhase::Idle }
    }

    fn status(&mut self) -> u8 {
        self.channel.inb(self.ports.reg(ATA_REG_STATUS))
    }

    fn alt_status(&mut self) -> u8 {
        self.channel.inb(self.ports.ctrl(CTRL_ALT_STATUS))
    }

    /// ~400ns for the drive to drive its status after a select
    fn settle(&mut self) {
        for _ in 0..4 {
            self.alt_status();
        }
    }

    /// Poll until BSY clears; returns the final status
    fn wait_not_busy(&mut self) -> DriverResult<u8> {
        for _ in 0..self.config.bsy_timeout {
            let status = self.alt_status();
            if status & STATUS_BSY == 0 {
                return Ok(self.status());
            }
        }
        Err(DriverError::Timeout)
    }

    /// Poll until the unit asks for data (DRQ) or reports an error
    fn wait_drq(&mut self) -> DriverResult<u8> {
        for _ in 0..self.config.bsy_timeout {
            let status = self.alt_status();
            if status & STATUS_BSY != 0 {
                continue;
            }
            if status_failed(status) {
                return Err(self.command_error());
            }
            if status & STATUS_DRQ != 0 {
                return Ok(status);
            }
        }
        Err(DriverError::Timeout)
    }

    fn command_error(&mut self) -> DriverError {
        let status = self.status();
        let error = self.channel.inb(self.ports.reg(ATA_REG_ERROR));
        DriverError::CommandFailed { status, error }
    }

    fn fail(&mut self, err: DriverError) -> DriverError {
        warn!("ata: transfer failed in {:?}: {}", self.phase, err);
        self.phase = TransferPhase::Error;
        err
    }

    fn soft_reset(&mut self) {
        let ctrl = self.ports.ctrl(CTRL_DEVICE_CONTROL);
        self.channel.outb(ctrl, CTRL_NIEN | CTRL_SOFTWARE_RESET);
        self.settle();
        self.channel.outb(ctrl, CTRL_NIEN);
        self.settle();
        if self.wait_not_busy().is_err() {
            warn!("ata: channel still busy after reset");
        }
    }

    fn select(&mut self, value: u8) -> DriverResult<()> {
        self.phase = TransferPhase::SelectDevice;
        self.channel.outb(self.ports.reg(ATA_REG_DRIVE), value);
        self.settle();
        self.wait_not_busy().map(|_| ())
    }

    /// IDENTIFY (or IDENTIFY PACKET) one slot; `None` if nothing answers
    fn identify(&mut self, index: DeviceIndex) -> DriverResult<Option<Device>> {
        let mut select = DRIVE_SELECT_BASE;
        if index == DeviceIndex::Slave {
            select |= DRIVE_SELECT_SLAVE;
        }
        if self.select(select).is_err() {
            return Ok(None);
        }

        for reg in [ATA_REG_SECTOR_COUNT, ATA_REG_LBA_LOW, ATA_REG_LBA_MID, ATA_REG_LBA_HIGH] {
            self.channel.outb(self.ports.reg(reg), 0);
        }
        self.channel.outb(self.ports.reg(ATA_REG_COMMAND), CMD_IDENTIFY);
        self.settle();
        if self.status() == 0 {
            return Ok(None);
        }
        let status = match self.wait_not_busy() {
            Ok(status) => status,
            Err(_) => return Ok(None),
        };

        let mid = self.channel.inb(self.ports.reg(ATA_REG_LBA_MID));
        let high = self.channel.inb(self.ports.reg(ATA_REG_LBA_HIGH));
        let atapi = mid == ATAPI_SIGNATURE_MID && high == ATAPI_SIGNATURE_HIGH;
        if atapi {
            self.channel.outb(self.ports.reg(ATA_REG_COMMAND), CMD_IDENTIFY_PACKET);
            self.settle();
        } else if mid != 0 || high != 0 || status_failed(status) {
            // Not an ATA unit we can drive
            return Ok(None);
        }

        self.wait_drq()?;
        let mut words = [0u16; IDENTIFY_WORDS];
        for word in words.iter_mut() {
            *word = self.channel.inw(self.ports.reg(ATA_REG_DATA));
        }
        Ok(Some(Device::from_identify(&words, atapi)))
    }

    fn set_udma_mode(&mut self, index: DeviceIndex, mode: u8) -> DriverResult<()> {
        let cmd = AtaCommand::simple(
            CMD_SET_FEATURES,
            FEATURE_SET_TRANSFER_MODE,
            (TRANSFER_MODE_UDMA | mode) as u16,
        );
        self.non_data(index, cmd)
    }

    /// Issue a command that moves no data and wait for it to finish
    fn non_data(&mut self, index: DeviceIndex, cmd: AtaCommand) -> DriverResult<()> {
        self.phase = TransferPhase::WaitReady;
        self.wait_not_busy().map_err(|e| self.fail(e))?;
        self.select(cmd.drive_select(index)).map_err(|e| self.fail(e))?;
        self.phase = TransferPhase::ProgramAddress;
        self.channel.outb(self.ports.reg(ATA_REG_FEATURES), cmd.feature);
        self.channel.outb(self.ports.reg(ATA_REG_SECTOR_COUNT), cmd.sector_count as u8);
        self.phase = TransferPhase::IssueCommand;
        self.channel.outb(self.ports.reg(ATA_REG_COMMAND), cmd.command);
        self.settle();
        self.phase = TransferPhase::WaitReady;
        let status = self.wait_not_busy().map_err(|e| self.fail(e))?;
        if status_failed(status) {
            let err = self.command_error();
            return Err(self.fail(err));
        }
        self.phase = TransferPhase::Complete;
        Ok(())
    }

    /// READ CAPACITY(10); returns the sector count of the loaded medium
    fn read_capacity(&mut self, index: DeviceIndex) -> DriverResult<u64> {
        self.run_round(index, Direction::Read, Request::Packet(read_capacity_packet()), 8)?;
        let window = self.channel.dma_window();
        let raw = &window.bytes[..8];
        let last_lba = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        Ok(last_lba as u64 + 1)
    }

    /// One complete DMA round of `bytes` bytes through the window's data area
    fn run_round(&mut self, index: DeviceIndex, direction: Direction, request: Request, bytes: usize) -> DriverResult<()> {
        self.phase = TransferPhase::WaitReady;
        self.wait_not_busy().map_err(|e| self.fail(e))?;

        let select = match request {
            Request::Ata(cmd) => cmd.drive_select(index),
            Request::Packet(_) => {
                let mut value = DRIVE_SELECT_BASE;
                if index == DeviceIndex::Slave {
                    value |= DRIVE_SELECT_SLAVE;
                }
                value
            }
        };
        self.select(select).map_err(|e| self.fail(e))?;

        self.phase = TransferPhase::ProgramDescriptors;
        self.program_busmaster(direction, bytes).map_err(|e| self.fail(e))?;

        self.phase = TransferPhase::ProgramAddress;
        match request {
            Request::Ata(cmd) => {
                self.program_address(&cmd);
                self.phase = TransferPhase::IssueCommand;
                self.channel.outb(self.ports.reg(ATA_REG_COMMAND), cmd.command);
            }
            Request::Packet(packet) => {
                let limit = bytes.min(0xFFFE) as u16;
                self.channel.outb(self.ports.reg(ATA_REG_FEATURES), FEATURE_PACKET_DMA);
                self.channel.outb(self.ports.reg(ATA_REG_LBA_MID), limit as u8);
                self.channel.outb(self.ports.reg(ATA_REG_LBA_HIGH), (limit >> 8) as u8);
                self.phase = TransferPhase::IssueCommand;
                self.channel.outb(self.ports.reg(ATA_REG_COMMAND), CMD_PACKET);
                self.settle();
                self.wait_drq().map_err(|e| self.fail(e))?;
                for pair in packet.chunks_exact(2) {
                    let word = u16::from_le_bytes([pair[0], pair[1]]);
                    self.channel.outw(self.ports.reg(ATA_REG_DATA), word);
                }
            }
        }

        self.phase = TransferPhase::StartDma;
        let dir_bit = match direction {
            Direction::Read => BM_COMMAND_READ,
            Direction::Write => BM_COMMAND_WRITE,
        };
        self.channel.outb(self.ports.bm(BM_COMMAND), dir_bit | BM_COMMAND_START);

        self.phase = TransferPhase::PollCompletion;
        let outcome = self.poll_busmaster();
        self.channel.outb(self.ports.bm(BM_COMMAND), dir_bit);
        outcome.map_err(|e| self.fail(e))?;

        self.phase = TransferPhase::WaitReady;
        let status = self.wait_not_busy().map_err(|e| self.fail(e))?;
        if status_failed(status) {
            let err = self.command_error();
            return Err(self.fail(err));
        }
        self.phase = TransferPhase::Complete;
        Ok(())
    }

    /// Stop the engine, clear stale status, lay out and load the descriptor table
    fn program_busmaster(&mut self, direction: Direction, bytes: usize) -> DriverResult<()> {
        let dir_bit = match direction {
            Direction::Read => BM_COMMAND_READ,
            Direction::Write => BM_COMMAND_WRITE,
        };
        self.channel.outb(self.ports.bm(BM_COMMAND), 0);
        self.channel
            .outb(self.ports.bm(BM_STATUS), BM_STATUS_ERROR | BM_STATUS_INTERRUPT);

        let queue_bytes = self.config.max_dma_queue_bytes;
        if bytes > queue_bytes {
            return Err(DriverError::InvalidParameter);
        }
        let table_offset = DmaWindow::table_offset(queue_bytes);
        let table_phys = {
            let window = self.channel.dma_window();
            let entries = prdt::build_table(window.phys_base, bytes, self.config.max_prd_entries())?;
            prdt::write_table(&entries, &mut window.bytes[table_offset..])?;
            window.phys_base + table_offset as u32
        };

        self.channel.outl(self.ports.bm(BM_PRDT_ADDRESS), table_phys);
        self.channel.outb(self.ports.bm(BM_COMMAND), dir_bit);
        Ok(())
    }

    /// Task-file address registers; 48-bit commands need the high-order pass first
    fn program_address(&mut self, cmd: &AtaCommand) {
        let ctrl = self.ports.ctrl(CTRL_DEVICE_CONTROL);
        let lba = cmd.lba.to_le_bytes();
        if cmd.addressing() == Some(Addressing::Lba48) {
            self.channel.outb(ctrl, CTRL_NIEN | CTRL_HOB);
            self.channel.outb(self.ports.reg(ATA_REG_SECTOR_COUNT), (cmd.sector_count >> 8) as u8);
            self.channel.outb(self.ports.reg(ATA_REG_LBA_LOW), lba[3]);
            self.channel.outb(self.ports.reg(ATA_REG_LBA_MID), lba[4]);
            self.channel.outb(self.ports.reg(ATA_REG_LBA_HIGH), lba[5]);
            self.channel.outb(ctrl, CTRL_NIEN);
        }
        self.channel.outb(self.ports.reg(ATA_REG_FEATURES), cmd.feature);
        self.channel.outb(self.ports.reg(ATA_REG_SECTOR_COUNT), cmd.sector_count as u8);
        self.channel.outb(self.ports.reg(ATA_REG_LBA_LOW), lba[0]);
        self.channel.outb(self.ports.reg(ATA_REG_LBA_MID), lba[1]);
        self.channel.outb(self.ports.reg(ATA_REG_LBA_HIGH), lba[2]);
    }

    /// Wait for the round to finish, yielding between polls
    fn poll_busmaster(&mut self) -> DriverResult<()> {
        let status_port = self.ports.bm(BM_STATUS);
        for _ in 0..self.config.dma_timeout {
            let bm = self.channel.inb(status_port);
            if bm & BM_STATUS_ERROR != 0 {
                self.channel.outb(status_port, BM_STATUS_ERROR | BM_STATUS_INTERRUPT);
                return Err(DriverError::DmaFault);
            }
            if bm & BM_STATUS_INTERRUPT != 0 && bm & BM_STATUS_ACTIVE == 0 {
                self.channel.outb(status_port, BM_STATUS_INTERRUPT);
                return Ok(());
            }
            sched::yield_now();
        }
        Err(DriverError::Timeout)
    }
}
