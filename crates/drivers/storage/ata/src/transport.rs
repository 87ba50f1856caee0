//! Block transport over the onboard IDE channel

use alloc::boxed::Box;
use alloc::sync::Arc;

use xbox_driver_traits::{
    debug_storage, BlockTransport, DriverError, DriverResult, IoctlCommand, TransportContext, TransportDriver,
};

use crate::bus::IdeBus;
use crate::channel::IdeChannel;
use crate::identify::DeviceIndex;

/// Unit a drive letter addresses on the cable
///
/// `D` is the slave (the optical drive); `X`, `Y`, `Z` and every letter up
/// to `M` are the master; the remaining letters are the slave.
pub fn device_index_for_letter(letter: char) -> DeviceIndex {
    let letter = letter.to_ascii_uppercase();
    match letter {
        'D' => DeviceIndex::Slave,
        'X' | 'Y' | 'Z' => DeviceIndex::Master,
        c if c <= 'M' => DeviceIndex::Master,
        _ => DeviceIndex::Slave,
    }
}

/// Transport kind for mounts backed by an [`IdeBus`]
pub struct AtaTransportDriver<C: IdeChannel> {
    bus: Arc<IdeBus<C>>,
}

impl<C: IdeChannel> AtaTransportDriver<C> {
    pub fn new(bus: Arc<IdeBus<C>>) -> Self {
        AtaTransportDriver { bus }
    }

    pub fn bus(&self) -> &Arc<IdeBus<C>> {
        &self.bus
    }
}

impl<C: IdeChannel + 'static> TransportDriver for AtaTransportDriver<C> {
    fn name(&self) -> &'static str {
        "ata"
    }

    fn init(&self, ctx: &TransportContext) -> DriverResult<Box<dyn BlockTransport>> {
        let index = device_index_for_letter(ctx.drive_letter);
        if self.bus.device(index).is_none() {
            return Err(DriverError::DeviceNotFound);
        }
        debug_storage!("ata: {}: bound to {:?}", ctx.drive_letter, index);
        Ok(Box::new(AtaTransport { bus: Arc::clone(&self.bus), index }))
    }
}

/// One mount's binding to a unit on the bus
pub struct AtaTransport<C: IdeChannel> {
    bus: Arc<IdeBus<C>>,
    index: DeviceIndex,
}

impl<C: IdeChannel> AtaTransport<C> {
    pub fn index(&self) -> DeviceIndex {
        self.index
    }
}

impl<C: IdeChannel> BlockTransport for AtaTransport<C> {
    fn read(&mut self, buffer: &mut [u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        self.bus.read(self.index, sector_offset, buffer, sector_count)
    }

    fn write(&mut self, buffer: &[u8], sector_offset: u64, sector_count: usize) -> DriverResult<()> {
        self.bus.write(self.index, sector_offset, buffer, sector_count)
    }

    fn ioctl(&mut self, cmd: IoctlCommand) -> DriverResult<u64> {
        let device = self.bus.device(self.index).ok_or(DriverError::DeviceNotFound)?;
        match cmd {
            IoctlCommand::Sync => self.bus.flush(self.index).map(|_| 0),
            IoctlCommand::GetSectorCount => Ok(device.total_sectors()),
            IoctlCommand::GetSectorSize => Ok(device.sector_size as u64),
            IoctlCommand::GetBlockSize => Ok(1),
        }
    }
}
