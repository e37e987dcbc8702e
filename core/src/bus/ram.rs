use std::path::Path;
use std::sync::Mutex;

use crate::bus::SetupError;

/// System RAM: a power-of-two byte store with an optional disjoint high
/// window.
///
/// The base allocation covers `[0, kb * 1024)`. When `himem` is non-zero
/// and the store is larger than 4 KB, the bytes above the first 4 KB are
/// additionally reachable at `[himem, himem + size - 0x1000)` — the wiring
/// used to place RAM under the monitor ROM area without a full 64 KB.
///
/// Accesses outside the legal ranges model open bus conservatively:
/// reads return 0, writes are dropped.
pub struct Ram {
    bytes: Mutex<Box<[u8]>>,
    size: usize,
    himem: u16,
}

impl Ram {
    /// Allocate `kb` kilobytes of zeroed RAM. `kb` must be a non-zero
    /// power of two. `himem` of 0 disables the high window.
    pub fn new(kb: u32, himem: u16) -> Result<Self, SetupError> {
        if kb == 0 || !kb.is_power_of_two() {
            return Err(SetupError::RamSize(kb));
        }
        let size = (kb as usize) * 1024;
        Ok(Self {
            bytes: Mutex::new(vec![0u8; size].into_boxed_slice()),
            size,
            himem,
        })
    }

    /// Total bytes in the store.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Map a bus address to a buffer index, or `None` outside the legal
    /// ranges. High-window addresses land on the bytes above the first
    /// 4 KB of the allocation.
    fn index(&self, address: u16) -> Option<usize> {
        let addr = address as usize;
        if addr < self.size {
            return Some(addr);
        }
        let himem = self.himem as usize;
        if himem > 0 && self.size > 0x1000 && addr >= himem && addr < himem + self.size - 0x1000 {
            return Some(0x1000 + (addr - himem));
        }
        None
    }

    pub fn read_byte(&self, address: u16) -> u8 {
        match self.index(address) {
            Some(i) => self.bytes.lock().unwrap()[i],
            None => 0,
        }
    }

    pub fn write_byte(&self, address: u16, value: u8) {
        if let Some(i) = self.index(address) {
            self.bytes.lock().unwrap()[i] = value;
        }
    }

    /// Copy a snapshot into the base allocation starting at `start`.
    /// Bytes past the end of the store are dropped.
    pub fn load(&self, start: u16, data: &[u8]) {
        let start = start as usize;
        if start >= self.size {
            return;
        }
        let len = data.len().min(self.size - start);
        self.bytes.lock().unwrap()[start..start + len].copy_from_slice(&data[..len]);
    }

    /// Load a raw binary snapshot from disk into RAM at `start`.
    pub fn load_file(&self, start: u16, path: &Path) -> Result<(), SetupError> {
        let data = std::fs::read(path).map_err(|source| SetupError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(start, &data);
        Ok(())
    }
}
