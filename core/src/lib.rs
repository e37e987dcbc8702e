pub mod bus;
pub mod cpu;
pub mod device;
pub mod peripheral;

pub mod prelude {
    pub use crate::bus::{MemoryBus, Ram, Rom, SetupError};
    pub use crate::cpu::{CpuControl, CpuThread, Mos6502, PendingInterrupt};
    pub use crate::device::MappedDevice;
    pub use crate::peripheral::{AsciiKeyboard, Peripheral, VideoTerminal};
}
