//! The system memory bus: a single entry point for CPU byte access,
//! dispatching to device overlays, ROM overlays and RAM in that order.

pub mod ram;
pub mod rom;

pub use ram::Ram;
pub use rom::Rom;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, Weak};

use thiserror::Error;

use crate::device::MappedDevice;

/// Errors that can occur while assembling the memory system.
///
/// Everything here happens during construction; once the machine is
/// running, every bus operation is total.
#[derive(Debug, Error)]
pub enum SetupError {
    /// RAM size is not a non-zero power of two.
    #[error("RAM size must be a non-zero power of two in KB, got {0} KB")]
    RamSize(u32),

    /// A ROM or RAM image could not be read from disk.
    #[error("failed to read image {path}: {source}")]
    Image {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Address-decoding hub for a 64 KB 6502 address space.
///
/// Reads probe registered devices first (in registration order), then ROM
/// overlays that are not banked out, then fall back to RAM. Writes always
/// land in RAM and are additionally presented to every overlapping device,
/// which models write-through registers with side effects. ROM overlays
/// never see writes.
pub struct MemoryBus {
    ram: Ram,
    roms: RwLock<Vec<Arc<Rom>>>,
    devices: RwLock<Vec<Arc<dyn MappedDevice>>>,
    /// Self-reference handed to devices at registration.
    this: Weak<MemoryBus>,
}

impl MemoryBus {
    pub fn new(ram: Ram) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            ram,
            roms: RwLock::new(Vec::new()),
            devices: RwLock::new(Vec::new()),
            this: this.clone(),
        })
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        for device in self.devices.read().unwrap().iter() {
            if device.contains(address) {
                return device.read_byte(address);
            }
        }
        for rom in self.roms.read().unwrap().iter() {
            if rom.contains(address) {
                if rom.is_banked_out() {
                    return self.ram.read_byte(address);
                }
                return rom.read_byte(address);
            }
        }
        self.ram.read_byte(address)
    }

    /// Little-endian word read; the second byte wraps around the top of
    /// the address space. This does not reproduce the hardware's
    /// JMP-indirect page-wrap quirk.
    pub fn read_word(&self, address: u16) -> u16 {
        let lo = self.read_byte(address) as u16;
        let hi = self.read_byte(address.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    pub fn write_byte(&self, address: u16, value: u8) {
        self.ram.write_byte(address, value);
        for device in self.devices.read().unwrap().iter() {
            if device.contains(address) {
                device.write_byte(address, value);
            }
        }
    }

    /// Little-endian word write: low byte at `address`, high byte at
    /// `address + 1`.
    pub fn write_word(&self, address: u16, value: u16) {
        self.write_byte(address, (value & 0xFF) as u8);
        self.write_byte(address.wrapping_add(1), (value >> 8) as u8);
    }

    /// Append a ROM overlay built from a raw binary file. Returns a handle
    /// the caller can keep for bank switching.
    pub fn load_rom(&self, start: u16, path: &Path) -> Result<Arc<Rom>, SetupError> {
        let rom = Rom::from_file(start, path)?;
        self.add_rom(rom.clone());
        Ok(rom)
    }

    /// Append an already-built ROM overlay.
    pub fn add_rom(&self, rom: Arc<Rom>) {
        log::debug!(
            "ROM overlay at {:#06X}..{:#06X}",
            rom.start_address(),
            rom.start_address() as usize + rom.size()
        );
        self.roms.write().unwrap().push(rom);
    }

    /// Copy a raw binary file into RAM starting at `start`.
    pub fn load_ram(&self, start: u16, path: &Path) -> Result<(), SetupError> {
        self.ram.load_file(start, path)
    }

    /// Copy an in-memory snapshot into RAM starting at `start`.
    pub fn load_ram_bytes(&self, start: u16, bytes: &[u8]) {
        self.ram.load(start, bytes);
    }

    /// Append a device overlay. The device receives a back-pointer to the
    /// bus so it may originate bus accesses of its own.
    pub fn register_device(&self, device: Arc<dyn MappedDevice>) {
        device.attach(self.this.clone());
        self.devices.write().unwrap().push(device);
    }
}
