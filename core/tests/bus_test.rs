use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crabapple_core::bus::{MemoryBus, Ram, Rom, SetupError};
use crabapple_core::device::MappedDevice;

/// Minimal register device: one byte of state, remembers the last write.
struct TestRegister {
    start: u16,
    value: AtomicU8,
    last_write: AtomicU8,
}

impl TestRegister {
    fn new(start: u16, value: u8) -> Arc<Self> {
        Arc::new(Self {
            start,
            value: AtomicU8::new(value),
            last_write: AtomicU8::new(0),
        })
    }
}

impl MappedDevice for TestRegister {
    fn start_address(&self) -> u16 {
        self.start
    }

    fn size(&self) -> u32 {
        0x10
    }

    fn read_byte(&self, _address: u16) -> u8 {
        self.value.load(Ordering::SeqCst)
    }

    fn write_byte(&self, _address: u16, value: u8) {
        self.last_write.store(value, Ordering::SeqCst);
    }
}

fn bus_with_ram(kb: u32) -> Arc<MemoryBus> {
    MemoryBus::new(Ram::new(kb, 0).unwrap())
}

// ==========================================================================
// RAM
// ==========================================================================

#[test]
fn test_ram_size_must_be_power_of_two() {
    assert!(matches!(Ram::new(0, 0), Err(SetupError::RamSize(0))));
    assert!(matches!(Ram::new(3, 0), Err(SetupError::RamSize(3))));
    assert!(Ram::new(4, 0).is_ok());
    assert!(Ram::new(64, 0).is_ok());
}

#[test]
fn test_ram_out_of_range_reads_zero_writes_dropped() {
    // 4 KB of RAM: $1000 and up is open bus
    let bus = bus_with_ram(4);
    bus.write_byte(0x0FFF, 0x42);
    assert_eq!(bus.read_byte(0x0FFF), 0x42);
    bus.write_byte(0x1000, 0x42);
    assert_eq!(bus.read_byte(0x1000), 0x00);
}

#[test]
fn test_load_ram_bytes() {
    let bus = bus_with_ram(64);
    bus.load_ram_bytes(0x0280, &[0xA9, 0x42, 0x00]);
    assert_eq!(bus.read_byte(0x0280), 0xA9);
    assert_eq!(bus.read_byte(0x0281), 0x42);
    assert_eq!(bus.read_byte(0x0282), 0x00);
    // Bytes past the end of the store are dropped, not wrapped
    bus.load_ram_bytes(0xFFFF, &[0x11, 0x22]);
    assert_eq!(bus.read_byte(0xFFFF), 0x11);
    assert_eq!(bus.read_byte(0x0000), 0x00);
}

#[test]
fn test_ram_himem_window() {
    // 8 KB with the upper 4 KB mapped at $F000
    let ram = Ram::new(8, 0xF000).unwrap();
    let bus = MemoryBus::new(ram);
    bus.write_byte(0xF123, 0x99);
    assert_eq!(bus.read_byte(0xF123), 0x99);
    // Between the base allocation and the window: open bus
    bus.write_byte(0x8000, 0x55);
    assert_eq!(bus.read_byte(0x8000), 0x00);
}

// ==========================================================================
// Word access
// ==========================================================================

#[test]
fn test_read_word_little_endian() {
    let bus = bus_with_ram(64);
    bus.write_byte(0x0300, 0xCD);
    bus.write_byte(0x0301, 0xAB);
    assert_eq!(bus.read_word(0x0300), 0xABCD);
}

#[test]
fn test_read_word_wraps_address_space() {
    let bus = bus_with_ram(64);
    bus.write_byte(0xFFFF, 0x34);
    bus.write_byte(0x0000, 0x12);
    assert_eq!(bus.read_word(0xFFFF), 0x1234);
}

#[test]
fn test_write_word_low_then_high() {
    let bus = bus_with_ram(64);
    bus.write_word(0x0400, 0xBEEF);
    assert_eq!(bus.read_byte(0x0400), 0xEF);
    assert_eq!(bus.read_byte(0x0401), 0xBE);
}

// ==========================================================================
// ROM overlays
// ==========================================================================

#[test]
fn test_rom_answers_reads_and_ignores_writes() {
    let bus = bus_with_ram(64);
    let image: Vec<u8> = (0..16).collect();
    bus.add_rom(Rom::from_bytes(0xE000, &image));

    assert_eq!(bus.read_byte(0xE005), 5);
    bus.write_byte(0xE005, 0xFF);
    assert_eq!(bus.read_byte(0xE005), 5); // ROM byte survives
}

#[test]
fn test_rom_bank_out_reveals_ram() {
    let bus = bus_with_ram(64);
    bus.write_byte(0xE123, 0x77); // lands in RAM under the overlay
    let image = vec![0x11u8; 0x1000];
    let rom = Rom::from_bytes(0xE000, &image);
    bus.add_rom(rom.clone());

    assert_eq!(bus.read_byte(0xE123), 0x11);
    rom.bank_out();
    assert_eq!(bus.read_byte(0xE123), 0x77);
    rom.bank_in();
    assert_eq!(bus.read_byte(0xE123), 0x11);
}

#[test]
fn test_rom_truncated_to_address_space() {
    let image = vec![0xAAu8; 0x1000];
    let rom = Rom::from_bytes(0xFF00, &image);
    assert_eq!(rom.size(), 0x100);
    assert!(rom.contains(0xFFFF));
    assert!(!rom.contains(0xFEFF));
}

// ==========================================================================
// Dispatch priority
// ==========================================================================

#[test]
fn test_device_wins_over_rom_and_ram() {
    let bus = bus_with_ram(64);
    bus.write_byte(0xD005, 0x01); // RAM underneath
    bus.add_rom(Rom::from_bytes(0xD000, &[0x22; 0x10]));
    let dev = TestRegister::new(0xD000, 0x33);
    bus.register_device(dev.clone());

    // Reads: device answers ahead of the ROM and RAM
    assert_eq!(bus.read_byte(0xD005), 0x33);

    // Writes: RAM and device see it, the ROM never does
    bus.write_byte(0xD005, 0x44);
    assert_eq!(dev.last_write.load(Ordering::SeqCst), 0x44);
    dev.value.store(0, Ordering::SeqCst);
    // With the device answering 0, the ROM is still next in line
    assert_eq!(bus.read_byte(0xD005), 0x00);
}

#[test]
fn test_write_through_reaches_ram_under_device() {
    let bus = bus_with_ram(64);
    let dev = TestRegister::new(0x5000, 0xEE);
    bus.register_device(dev);
    bus.write_byte(0x5003, 0x77);
    // The device answers reads in its range, but the byte also landed in RAM
    assert_eq!(bus.read_byte(0x5003), 0xEE);
    assert_eq!(bus.ram().read_byte(0x5003), 0x77);
}

#[test]
fn test_first_registered_device_wins() {
    let bus = bus_with_ram(64);
    let first = TestRegister::new(0x5000, 0x01);
    let second = TestRegister::new(0x5000, 0x02);
    bus.register_device(first);
    bus.register_device(second);
    assert_eq!(bus.read_byte(0x5000), 0x01);
}
