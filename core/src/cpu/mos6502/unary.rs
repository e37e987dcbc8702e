use super::{AddressingMode, Mos6502};

impl Mos6502 {
    /// DEC - decrement memory. Sets N, Z.
    pub(crate) fn op_dec(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| {
            let result = value.wrapping_sub(1);
            cpu.set_nz(result);
            result
        });
    }

    /// INC - increment memory. Sets N, Z.
    pub(crate) fn op_inc(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| {
            let result = value.wrapping_add(1);
            cpu.set_nz(result);
            result
        });
    }
}
