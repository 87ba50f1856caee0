//! USB mass-storage attach, mount, use and detach

mod common;

use common::{image_with, ThreadedHost, FAT, FATX, USB_BLOCK};
use xbox_storage::vfs::{DriveRegistry, FileMode, SeekFrom, VfsError};
use xbox_storage::UsbStorage;

#[test]
fn test_fat_stick_mounts_at_first_slot() {
    let host = ThreadedHost::new();
    host.insert(7, image_with(128, &FAT, USB_BLOCK));
    let usb = UsbStorage::new(host.clone());
    let registry = DriveRegistry::new();

    let letter = usb.on_attach(7).unwrap();
    assert_eq!(letter, '0');
    assert_eq!(usb.mount(&registry, letter, &FAT, &FATX), Ok("fat"));

    let info = registry.list();
    assert_eq!(info.len(), 1);
    assert_eq!((info[0].letter, info[0].fs_name, info[0].transport_name), ('0', "fat", "usb-msc"));

    let mut file = registry.open("0:/RAW", FileMode::READ_WRITE).unwrap();
    file.lseek(510, SeekFrom::Start).unwrap();
    let mut sig = [0u8; 2];
    assert_eq!(file.read(&mut sig), Ok(2));
    assert_eq!(sig, [0x55, 0xAA]);

    file.lseek(3 * USB_BLOCK as i64, SeekFrom::Start).unwrap();
    assert_eq!(file.write(b"saved game"), Ok(10));
    file.close().unwrap();
    assert_eq!(&host.image(7)[3 * USB_BLOCK..3 * USB_BLOCK + 10], b"saved game");
}

#[test]
fn test_falls_back_to_fatx() {
    let host = ThreadedHost::new();
    host.insert(2, image_with(64, &FAT, USB_BLOCK));
    host.insert(3, image_with(64, &FATX, USB_BLOCK));
    let usb = UsbStorage::new(host);
    let registry = DriveRegistry::new();

    let first = usb.on_attach(2).unwrap();
    let second = usb.on_attach(3).unwrap();
    assert_eq!((first, second), ('0', '1'));
    assert_eq!(usb.mount(&registry, first, &FAT, &FATX), Ok("fat"));
    assert_eq!(usb.mount(&registry, second, &FAT, &FATX), Ok("fatx"));
    assert_eq!(registry.find('1').unwrap().fs_name(), "fatx");
}

#[test]
fn test_unrecognised_stick_releases_slot() {
    let host = ThreadedHost::new();
    host.insert(4, vec![0u8; 64 * USB_BLOCK]);
    host.insert(5, image_with(64, &FATX, USB_BLOCK));
    let usb = UsbStorage::new(host);
    let registry = DriveRegistry::new();

    let letter = usb.on_attach(4).unwrap();
    assert_eq!(usb.mount(&registry, letter, &FAT, &FATX), Err(VfsError::BackendInitFailed));
    assert!(registry.find(letter).is_none());
    assert_eq!(usb.devices().address(letter), None);

    // The freed slot goes to the next device
    assert_eq!(usb.on_attach(5), Some('0'));
    assert_eq!(usb.mount(&registry, '0', &FAT, &FATX), Ok("fatx"));
}

#[test]
fn test_detach_unmounts_and_frees_letter() {
    let host = ThreadedHost::new();
    host.insert(9, image_with(32, &FAT, USB_BLOCK));
    let usb = UsbStorage::new(host.clone());
    let registry = DriveRegistry::new();

    let letter = usb.on_attach(9).unwrap();
    usb.mount(&registry, letter, &FAT, &FATX).unwrap();
    let mut stale = registry.open("0:/RAW", FileMode::READ).unwrap();

    usb.on_detach(&registry, 9);
    assert!(registry.find('0').is_none());
    assert_eq!(usb.devices().address('0'), None);
    assert_eq!(stale.read(&mut [0u8; 8]), Err(VfsError::NotMounted));

    // Re-plugging gets the same letter back
    assert_eq!(usb.on_attach(9), Some('0'));
    assert_eq!(usb.mount(&registry, '0', &FAT, &FATX), Ok("fat"));

    // Unknown addresses are ignored
    usb.on_detach(&registry, 200);
    assert!(registry.find('0').is_some());
}
