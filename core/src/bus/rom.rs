use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bus::SetupError;

/// An immutable memory overlay loaded from a raw binary image.
///
/// A ROM claims `[start, start + len)` on the bus. It can be banked out at
/// runtime, which makes the bus treat the range as if the ROM were absent
/// so the RAM underneath shows through.
pub struct Rom {
    start: u16,
    bytes: Box<[u8]>,
    banked_out: AtomicBool,
}

impl Rom {
    /// Build a ROM overlay from an in-memory image. The image is truncated
    /// so the overlay fits within the 64 KB address space.
    pub fn from_bytes(start: u16, image: &[u8]) -> Arc<Self> {
        let max = 0x10000 - start as usize;
        let len = image.len().min(max);
        Arc::new(Self {
            start,
            bytes: image[..len].to_vec().into_boxed_slice(),
            banked_out: AtomicBool::new(false),
        })
    }

    /// Load a ROM overlay from a raw binary file (no header).
    pub fn from_file(start: u16, path: &Path) -> Result<Arc<Self>, SetupError> {
        let image = std::fs::read(path).map_err(|source| SetupError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(start, &image))
    }

    pub fn start_address(&self) -> u16 {
        self.start
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn contains(&self, address: u16) -> bool {
        (address as usize) >= (self.start as usize)
            && (address as usize) < (self.start as usize) + self.bytes.len()
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        self.bytes[(address - self.start) as usize]
    }

    pub fn is_banked_out(&self) -> bool {
        self.banked_out.load(Ordering::SeqCst)
    }

    /// Make the ROM invisible to the bus.
    pub fn bank_out(&self) {
        self.banked_out.store(true, Ordering::SeqCst);
    }

    /// Make the ROM visible to the bus again.
    pub fn bank_in(&self) {
        self.banked_out.store(false, Ordering::SeqCst);
    }
}
