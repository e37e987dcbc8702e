use super::{AddressingMode, Mos6502, StatusFlag};

impl Mos6502 {
    /// Read-modify-write helper: applies `operation` to the accumulator or
    /// to the addressed memory byte.
    pub(crate) fn modify<F>(&mut self, am: AddressingMode, operation: F)
    where
        F: FnOnce(&mut Self, u8) -> u8,
    {
        if am == AddressingMode::Accumulator {
            let value = self.a;
            let result = operation(self, value);
            self.a = result;
        } else {
            let addr = self.operand_addr(am);
            let value = self.bus.read_byte(addr);
            let result = operation(self, value);
            self.bus.write_byte(addr, result);
        }
    }

    /// ASL. C = old bit 7; N, Z from result.
    fn perform_asl(&mut self, value: u8) -> u8 {
        let carry = value & 0x80 != 0;
        let result = value << 1;
        self.set_flags_shift(result, carry);
        result
    }

    /// LSR. C = old bit 0; N cleared, Z from result.
    fn perform_lsr(&mut self, value: u8) -> u8 {
        let carry = value & 0x01 != 0;
        let result = value >> 1;
        self.set_flags_shift(result, carry);
        result
    }

    /// ROL. Old C enters bit 0; C = old bit 7; N, Z from result.
    fn perform_rol(&mut self, value: u8) -> u8 {
        let carry = value & 0x80 != 0;
        let result = (value << 1) | u8::from(self.flag(StatusFlag::C));
        self.set_flags_shift(result, carry);
        result
    }

    /// ROR. Old C enters bit 7; C = old bit 0; N, Z from result.
    fn perform_ror(&mut self, value: u8) -> u8 {
        let carry = value & 0x01 != 0;
        let result = (value >> 1) | (u8::from(self.flag(StatusFlag::C)) << 7);
        self.set_flags_shift(result, carry);
        result
    }

    pub(crate) fn op_asl(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| cpu.perform_asl(value));
    }

    pub(crate) fn op_lsr(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| cpu.perform_lsr(value));
    }

    pub(crate) fn op_rol(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| cpu.perform_rol(value));
    }

    pub(crate) fn op_ror(&mut self, am: AddressingMode) {
        self.modify(am, |cpu, value| cpu.perform_ror(value));
    }
}
