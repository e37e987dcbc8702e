//! CPU interpreter and execution-thread plumbing.

pub mod mos6502;

pub use mos6502::{CpuState, Mos6502, StatusFlag};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;

/// Interrupt sources, in dispatch priority order. `Nmi` and `Reset` are
/// edge-triggered and override a pending `Irq`. `Brk` is recorded when a
/// BRK opcode is fetched from code, and can also be raised from outside
/// to inject a break (dispatched through the IRQ/BRK vector with B
/// clear, like a hardware interrupt).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PendingInterrupt {
    None = 0,
    Brk = 1,
    Irq = 2,
    Nmi = 3,
    Reset = 4,
}

impl PendingInterrupt {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Brk,
            2 => Self::Irq,
            3 => Self::Nmi,
            4 => Self::Reset,
            _ => Self::None,
        }
    }
}

/// Control state shared between the CPU execution thread and the host:
/// the cooperative stop flag and the pending-interrupt cell. Both are
/// consulted only at instruction boundaries.
pub struct CpuControl {
    stopping: AtomicBool,
    pending: AtomicU8,
}

impl CpuControl {
    pub(crate) fn new() -> Self {
        Self {
            stopping: AtomicBool::new(false),
            pending: AtomicU8::new(PendingInterrupt::None as u8),
        }
    }

    /// Request a RESET at the next instruction boundary.
    pub fn reset(&self) {
        self.raise(PendingInterrupt::Reset);
    }

    /// Request an IRQ. Honored only while the I flag is clear; stays
    /// pending until then.
    pub fn irq(&self) {
        self.raise(PendingInterrupt::Irq);
    }

    /// Request an NMI. Always honored at the next boundary.
    pub fn nmi(&self) {
        self.raise(PendingInterrupt::Nmi);
    }

    /// Post an interrupt. A lower-priority source never displaces a
    /// pending higher-priority one.
    pub fn raise(&self, interrupt: PendingInterrupt) {
        self.pending.fetch_max(interrupt as u8, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> PendingInterrupt {
        PendingInterrupt::from_u8(self.pending.load(Ordering::SeqCst))
    }

    /// Consume the pending interrupt.
    pub(crate) fn take_pending(&self) -> PendingInterrupt {
        PendingInterrupt::from_u8(
            self.pending
                .swap(PendingInterrupt::None as u8, Ordering::SeqCst),
        )
    }

    /// Ask the execution thread to leave its loop at the next boundary.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    pub(crate) fn clear_stopping(&self) {
        self.stopping.store(false, Ordering::SeqCst);
    }
}

/// Handle to a running CPU execution thread.
pub struct CpuThread {
    control: Arc<CpuControl>,
    handle: JoinHandle<Mos6502>,
}

impl CpuThread {
    pub(crate) fn new(control: Arc<CpuControl>, handle: JoinHandle<Mos6502>) -> Self {
        Self { control, handle }
    }

    pub fn control(&self) -> &Arc<CpuControl> {
        &self.control
    }

    /// Cooperative stop: raises the flag, joins the thread and hands the
    /// interpreter back so it can be inspected or restarted.
    pub fn stop(self) -> Mos6502 {
        self.control.stop();
        match self.handle.join() {
            Ok(cpu) => cpu,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
