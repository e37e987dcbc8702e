use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::device::MappedDevice;
use crate::peripheral::Peripheral;

/// MC6820/6520 Peripheral Interface Adapter.
///
/// Two independent port blocks (A and B), each with a data direction
/// register, a control register and an attached peripheral. The device
/// occupies a 2 KB bus window; only the five low address bits are decoded,
/// so the four registers at offsets 0x10-0x13 mirror across the window.
///
/// | Offset | CRx.2 = 0          | CRx.2 = 1                     |
/// |--------|--------------------|-------------------------------|
/// | 0x10   | DDRA               | Port A data (peripheral A)    |
/// | 0x11   | CRA                | CRA                           |
/// | 0x12   | DDRB               | Port B data (peripheral B)    |
/// | 0x13   | CRB                | CRB                           |
///
/// Before any register read the PIA polls both peripherals' interrupt
/// latches and ORs the results into the control registers. Reading a data
/// register clears CRA's IRQ1 flag.
pub struct Pia6820 {
    start_address: u16,
    port_a: Option<Arc<dyn Peripheral>>,
    port_b: Option<Arc<dyn Peripheral>>,
    cra: AtomicU8,
    crb: AtomicU8,
    ddra: AtomicU8,
    ddrb: AtomicU8,
}

// Control register flags.
const CR_IRQ1: u8 = 0x80;
const CR_IRQ2: u8 = 0x40;
const CR_DDR: u8 = 0x04;
const CR_CX1: u8 = 0x03; // Cx1 control; input only, masked from CR reads

impl Pia6820 {
    /// Set up a PIA at the given base address with the given peripherals.
    pub fn new(
        start_address: u16,
        port_a: Option<Arc<dyn Peripheral>>,
        port_b: Option<Arc<dyn Peripheral>>,
    ) -> Self {
        Self {
            start_address,
            port_a,
            port_b,
            cra: AtomicU8::new(0),
            crb: AtomicU8::new(0),
            ddra: AtomicU8::new(0),
            ddrb: AtomicU8::new(0),
        }
    }

    /// Clear all four registers to their power-on state.
    pub fn reset(&self) {
        self.cra.store(0, Ordering::SeqCst);
        self.crb.store(0, Ordering::SeqCst);
        self.ddra.store(0, Ordering::SeqCst);
        self.ddrb.store(0, Ordering::SeqCst);
    }

    /// Sample both peripherals' consume-on-read interrupt latches into the
    /// control registers.
    fn poll_interrupts(&self) {
        if let Some(port) = &self.port_a {
            if port.interrupt1() {
                self.cra.fetch_or(CR_IRQ1, Ordering::SeqCst);
            }
            if port.interrupt2() {
                self.cra.fetch_or(CR_IRQ2, Ordering::SeqCst);
            }
        }
        if let Some(port) = &self.port_b {
            if port.interrupt1() {
                self.crb.fetch_or(CR_IRQ1, Ordering::SeqCst);
            }
            if port.interrupt2() {
                self.crb.fetch_or(CR_IRQ2, Ordering::SeqCst);
            }
        }
    }
}

impl MappedDevice for Pia6820 {
    fn start_address(&self) -> u16 {
        self.start_address
    }

    fn size(&self) -> u32 {
        2048
    }

    fn read_byte(&self, address: u16) -> u8 {
        self.poll_interrupts();

        match address & 0x1F {
            0x10 => {
                if self.cra.load(Ordering::SeqCst) & CR_DDR != 0 {
                    let ddra = self.ddra.load(Ordering::SeqCst);
                    let value = match &self.port_a {
                        Some(port) => port.read() & !ddra,
                        None => 0,
                    };
                    self.cra.fetch_and(!CR_IRQ1, Ordering::SeqCst);
                    value
                } else {
                    self.ddra.load(Ordering::SeqCst)
                }
            }
            0x11 => self.cra.load(Ordering::SeqCst) & !CR_CX1,
            0x12 => {
                if self.crb.load(Ordering::SeqCst) & CR_DDR != 0 {
                    let ddrb = self.ddrb.load(Ordering::SeqCst);
                    let value = match &self.port_b {
                        Some(port) => port.read() & !ddrb,
                        None => 0,
                    };
                    // Port B data reads clear IRQ1 on the A side: the
                    // display-status poll acknowledges the keyboard strobe.
                    self.cra.fetch_and(!CR_IRQ1, Ordering::SeqCst);
                    value
                } else {
                    self.ddrb.load(Ordering::SeqCst)
                }
            }
            0x13 => self.crb.load(Ordering::SeqCst) & !CR_CX1,
            _ => 0,
        }
    }

    fn write_byte(&self, address: u16, value: u8) {
        match address & 0x1F {
            0x10 => {
                if self.cra.load(Ordering::SeqCst) & CR_DDR != 0 {
                    if let Some(port) = &self.port_a {
                        port.write(value & self.ddra.load(Ordering::SeqCst));
                    }
                } else {
                    self.ddra.store(value, Ordering::SeqCst);
                }
            }
            0x11 => self.cra.store(value, Ordering::SeqCst),
            0x12 => {
                if self.crb.load(Ordering::SeqCst) & CR_DDR != 0 {
                    if let Some(port) = &self.port_b {
                        port.write(value & self.ddrb.load(Ordering::SeqCst));
                    }
                } else {
                    self.ddrb.store(value, Ordering::SeqCst);
                }
            }
            0x13 => self.crb.store(value, Ordering::SeqCst),
            _ => {}
        }
    }
}
