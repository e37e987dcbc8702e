use super::{AddressingMode, Mos6502};

impl Mos6502 {
    /// LDA - load accumulator. Sets N, Z.
    pub(crate) fn op_lda(&mut self, am: AddressingMode) {
        let value = self.read_operand(am);
        self.a = value;
        self.set_nz(value);
    }

    /// LDX - load X register. Sets N, Z.
    pub(crate) fn op_ldx(&mut self, am: AddressingMode) {
        let value = self.read_operand(am);
        self.x = value;
        self.set_nz(value);
    }

    /// LDY - load Y register. Sets N, Z.
    pub(crate) fn op_ldy(&mut self, am: AddressingMode) {
        let value = self.read_operand(am);
        self.y = value;
        self.set_nz(value);
    }

    /// STA - store accumulator. No flags.
    pub(crate) fn op_sta(&mut self, am: AddressingMode) {
        let addr = self.operand_addr(am);
        self.bus.write_byte(addr, self.a);
    }

    /// STX - store X register. No flags.
    pub(crate) fn op_stx(&mut self, am: AddressingMode) {
        let addr = self.operand_addr(am);
        self.bus.write_byte(addr, self.x);
    }

    /// STY - store Y register. No flags.
    pub(crate) fn op_sty(&mut self, am: AddressingMode) {
        let addr = self.operand_addr(am);
        self.bus.write_byte(addr, self.y);
    }
}
