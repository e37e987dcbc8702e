use std::sync::Arc;

use crabapple_core::bus::{MemoryBus, Ram};
use crabapple_core::cpu::Mos6502;

/// Build a flat 64 KB machine with `program` at `org` and the reset
/// vector pointing there, then step once so the CPU comes out of RESET.
pub fn boot(org: u16, program: &[u8]) -> Mos6502 {
    let mut cpu = power_on(org, program);
    cpu.step();
    assert_eq!(cpu.pc, org);
    cpu
}

/// Like [`boot`], but without consuming the pending RESET.
pub fn power_on(org: u16, program: &[u8]) -> Mos6502 {
    let bus = flat_bus();
    load(&bus, org, program);
    bus.write_word(0xFFFC, org);
    Mos6502::new(bus)
}

/// A bus backed by 64 KB of RAM and nothing else.
pub fn flat_bus() -> Arc<MemoryBus> {
    MemoryBus::new(Ram::new(64, 0).expect("64 KB is a power of two"))
}

pub fn load(bus: &MemoryBus, org: u16, bytes: &[u8]) {
    for (i, &byte) in bytes.iter().enumerate() {
        bus.write_byte(org.wrapping_add(i as u16), byte);
    }
}
