//! Register access to one IDE channel
//!
//! The bus logic talks to hardware only through [`IdeChannel`], so the same
//! code drives the real controller via port I/O and the register-level
//! simulator used in tests.

use crate::prdt::DmaWindow;

/// Port numbers of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPorts {
    /// Task-file base (data register)
    pub io_base: u16,
    /// Control block (alternate status / device control)
    pub ctrl_base: u16,
    /// Busmaster DMA registers
    pub busmaster_base: u16,
}

impl BusPorts {
    /// The console's onboard channel
    pub const PRIMARY: BusPorts = BusPorts {
        io_base: xbox_arch::ATA_PRIMARY_BUS_IO_BASE,
        ctrl_base: xbox_arch::ATA_PRIMARY_BUS_CTRL_BASE,
        busmaster_base: xbox_arch::ATA_BUSMASTER_BASE,
    };

    #[inline]
    pub fn reg(&self, offset: u16) -> u16 {
        self.io_base + offset
    }

    #[inline]
    pub fn ctrl(&self, offset: u16) -> u16 {
        self.ctrl_base + offset
    }

    #[inline]
    pub fn bm(&self, offset: u16) -> u16 {
        self.busmaster_base + offset
    }
}

/// Raw register and DMA-memory access for a channel
///
/// Ports are absolute. Implementations do no locking; the bus serialises
/// every access behind its own lock.
pub trait IdeChannel: Send {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);
    fn inw(&mut self, port: u16) -> u16;
    fn outw(&mut self, port: u16, value: u16);
    fn outl(&mut self, port: u16, value: u32);

    /// Bounce memory the busmaster can reach
    fn dma_window(&mut self) -> DmaWindow<'_>;
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use self::x86::PortChannel;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    use super::IdeChannel;
    use crate::prdt::DmaWindow;
    use xbox_arch::port;

    /// Channel backed by real port I/O
    pub struct PortChannel {
        window: &'static mut [u8],
        phys_base: u32,
    }

    impl PortChannel {
        /// # Safety
        ///
        /// `window` must be identity-usable memory at physical address
        /// `phys_base` (64 KiB aligned, below 4 GiB) that nothing else
        /// touches, and the caller must own the channel's ports.
        pub unsafe fn new(window: &'static mut [u8], phys_base: u32) -> Self {
            PortChannel { window, phys_base }
        }
    }

    impl IdeChannel for PortChannel {
        fn inb(&mut self, p: u16) -> u8 {
            unsafe { port::inb(p) }
        }

        fn outb(&mut self, p: u16, value: u8) {
            unsafe { port::outb(p, value) }
        }

        fn inw(&mut self, p: u16) -> u16 {
            unsafe { port::inw(p) }
        }

        fn outw(&mut self, p: u16, value: u16) {
            unsafe { port::outw(p, value) }
        }

        fn outl(&mut self, p: u16, value: u32) {
            unsafe { port::outl(p, value) }
        }

        fn dma_window(&mut self) -> DmaWindow<'_> {
            DmaWindow {
                phys_base: self.phys_base,
                bytes: &mut *self.window,
            }
        }
    }
}
