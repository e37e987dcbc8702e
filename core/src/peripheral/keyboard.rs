use std::sync::atomic::{AtomicU8, Ordering};

use crate::peripheral::{InterruptLatch, Peripheral};

/// ASCII keyboard on PIA port A.
///
/// Host keystrokes arrive from a terminal, a telnet client or a window
/// event loop and are translated to the machine's native codes: carriage
/// return and line feed both become 0x8D, delete becomes 0xDF, lowercase
/// letters are folded to uppercase, and every code carries the high bit
/// ("character present" convention).
///
/// The data register holds a single byte: when keystrokes arrive faster
/// than the CPU reads them, only the last one is observable and the IRQ1
/// latch saturates.
#[derive(Default)]
pub struct AsciiKeyboard {
    data: AtomicU8,
    irq1: InterruptLatch,
    irq2: InterruptLatch,
}

impl AsciiKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host keystroke.
    pub fn keypress(&self, code: u8) {
        let mut code = code;
        if code == 0x0A || code == 0x0D {
            code = 0x8D; // CR
        }
        if code == 0x7F {
            code = 0xDF; // backspace
        }
        if code & 0x60 == 0x60 {
            code &= 0xDF; // fold lowercase to uppercase
        }
        self.data.store(code | 0x80, Ordering::SeqCst);
        self.irq1.raise();
    }

    /// Feed a string of keystrokes. Only the last byte remains observable
    /// in the data register.
    pub fn text_input(&self, text: &str) {
        for byte in text.bytes() {
            self.keypress(byte);
        }
    }
}

impl Peripheral for AsciiKeyboard {
    fn read(&self) -> u8 {
        self.data.load(Ordering::SeqCst)
    }

    fn write(&self, _value: u8) {}

    fn interrupt1(&self) -> bool {
        self.irq1.take()
    }

    fn interrupt2(&self) -> bool {
        self.irq2.take()
    }
}
