//! Peripherals: 8-bit input/output ports with two interrupt lines, shared
//! between a PIA port and whatever host-side source drives them.

pub mod keyboard;
pub mod terminal;

pub use keyboard::AsciiKeyboard;
pub use terminal::VideoTerminal;

use std::sync::atomic::{AtomicBool, Ordering};

/// An 8-bit peripheral attached to one PIA port.
///
/// All methods take `&self`: peripherals are shared (`Arc`) between the
/// PIA and other holders such as the telnet server, and their state is a
/// handful of scalars behind atomics. Reads and writes must be O(1)
/// register accesses — a peripheral call from the CPU thread may never
/// block.
pub trait Peripheral: Send + Sync {
    /// Current data register value.
    fn read(&self) -> u8;

    /// Present a byte to the peripheral.
    fn write(&self, value: u8);

    /// Check interrupt line 1. Consume-on-read: returns the latch and
    /// clears it.
    fn interrupt1(&self) -> bool;

    /// Check interrupt line 2. Consume-on-read.
    fn interrupt2(&self) -> bool;
}

/// A consume-on-read interrupt latch. Multiple raises before a take
/// saturate into one.
#[derive(Default)]
pub struct InterruptLatch(AtomicBool);

impl InterruptLatch {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return the latch state and clear it.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
