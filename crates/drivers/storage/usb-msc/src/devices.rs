//! Attached unit table
//!
//! Each attached mass-storage device takes the first free slot and is
//! addressed by the drive letter `'0' + slot`.

use log::warn;
use spin::Mutex;
use xbox_driver_traits::debug_usb;

/// Mass-storage units tracked at once
pub const MAX_UNITS: usize = 4;

/// Drive letter of a slot
pub fn letter_for_slot(slot: usize) -> Option<char> {
    if slot < MAX_UNITS {
        char::from_digit(slot as u32, 10)
    } else {
        None
    }
}

fn slot_for_letter(letter: char) -> Option<usize> {
    letter.to_digit(10).map(|d| d as usize).filter(|&slot| slot < MAX_UNITS)
}

/// Slot table mapping drive letters to USB device addresses
pub struct MscDevices {
    slots: Mutex<[Option<u8>; MAX_UNITS]>,
}

impl MscDevices {
    pub const fn new() -> Self {
        MscDevices {
            slots: Mutex::new([None; MAX_UNITS]),
        }
    }

    /// Claim a slot for a newly enumerated device; returns its letter
    pub fn attach(&self, dev_addr: u8) -> Option<char> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter().position(|s| *s == Some(dev_addr)) {
            warn!("usb-msc: address {} attached twice", dev_addr);
            return letter_for_slot(slot);
        }
        match slots.iter().position(Option::is_none) {
            Some(slot) => {
                slots[slot] = Some(dev_addr);
                debug_usb!("usb-msc: address {} -> slot {}", dev_addr, slot);
                letter_for_slot(slot)
            }
            None => {
                warn!("usb-msc: no free slot for address {}", dev_addr);
                None
            }
        }
    }

    /// Forget a removed device; returns the letter it had
    pub fn detach(&self, dev_addr: u8) -> Option<char> {
        let mut slots = self.slots.lock();
        let slot = slots.iter().position(|s| *s == Some(dev_addr))?;
        slots[slot] = None;
        debug_usb!("usb-msc: address {} left slot {}", dev_addr, slot);
        letter_for_slot(slot)
    }

    /// Letter of an attached device
    pub fn letter(&self, dev_addr: u8) -> Option<char> {
        let slots = self.slots.lock();
        let slot = slots.iter().position(|s| *s == Some(dev_addr))?;
        letter_for_slot(slot)
    }

    /// Free the slot behind `letter`
    pub fn release(&self, letter: char) {
        if let Some(slot) = slot_for_letter(letter) {
            self.slots.lock()[slot] = None;
        }
    }

    /// Device address currently behind `letter`
    pub fn address(&self, letter: char) -> Option<u8> {
        let slot = slot_for_letter(letter)?;
        self.slots.lock()[slot]
    }
}

impl Default for MscDevices {
    fn default() -> Self {
        Self::new()
    }
}
