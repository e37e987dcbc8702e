use super::{AddressingMode, Mos6502, StatusFlag};
use crate::cpu::PendingInterrupt;

impl Mos6502 {
    // ---- Stack primitives ----
    // The stack lives in page 1, grows downward and wraps within the page.

    pub(crate) fn push(&mut self, value: u8) {
        self.bus.write_byte(0x0100 | self.s as u16, value);
        self.s = self.s.wrapping_sub(1);
    }

    pub(crate) fn pop(&mut self) -> u8 {
        self.s = self.s.wrapping_add(1);
        self.bus.read_byte(0x0100 | self.s as u16)
    }

    // ---- Stack instructions ----

    /// PHA - push accumulator.
    pub(crate) fn op_pha(&mut self) {
        let a = self.a;
        self.push(a);
    }

    /// PLA - pull accumulator. Sets N, Z.
    pub(crate) fn op_pla(&mut self) {
        self.a = self.pop();
        self.set_nz(self.a);
    }

    /// PHP - push processor status with B and bit 5 set.
    pub(crate) fn op_php(&mut self) {
        let flags = self.p | StatusFlag::B as u8 | StatusFlag::U as u8;
        self.push(flags);
    }

    /// PLP - pull processor status. B is cleared, bit 5 forced set.
    pub(crate) fn op_plp(&mut self) {
        let pulled = self.pop();
        self.p = (pulled | StatusFlag::U as u8) & !(StatusFlag::B as u8);
    }

    // ---- Subroutines and interrupt returns ----

    /// JSR - read the target, push the return address (the byte after the
    /// operand), jump.
    pub(crate) fn op_jsr(&mut self) {
        let target = self.operand_addr(AddressingMode::Absolute);
        self.push((self.pc >> 8) as u8);
        self.push(self.pc as u8);
        self.pc = target;
    }

    /// RTS - pop the return address, low byte first.
    pub(crate) fn op_rts(&mut self) {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        self.pc = lo | (hi << 8);
    }

    /// RTI - pop P, then the return address.
    pub(crate) fn op_rti(&mut self) {
        let pulled = self.pop();
        self.p = (pulled | StatusFlag::U as u8) & !(StatusFlag::B as u8);
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        self.pc = lo | (hi << 8);
    }

    // ---- BRK and interrupt dispatch ----

    /// BRK and the synthesized dispatch for RESET/NMI/IRQ.
    ///
    /// The software form (a BRK opcode fetched from code) pushes the
    /// address two past the opcode and pushes P with B set. Hardware
    /// interrupts — including a `Brk` raised from outside — push the
    /// unadvanced PC with B clear. RESET performs no real pushes; S moves
    /// as if it had. All forms set I and load PC from the source's vector.
    pub(crate) fn op_brk(&mut self) {
        let source = self.interrupt_source;
        if source == PendingInterrupt::Reset {
            self.s = self.s.wrapping_sub(3);
        } else {
            let from_code = self.brk_from_code;
            let return_addr = if from_code {
                // PC is one past the opcode; the return address skips the
                // padding byte as well
                self.pc.wrapping_add(1)
            } else {
                self.pc
            };
            self.push((return_addr >> 8) as u8);
            self.push(return_addr as u8);
            let mut flags = self.p | StatusFlag::U as u8;
            if from_code {
                flags |= StatusFlag::B as u8;
            } else {
                flags &= !(StatusFlag::B as u8);
            }
            self.push(flags);
        }

        self.set_flag(StatusFlag::I, true);

        let vector = match source {
            PendingInterrupt::Nmi => 0xFFFA,
            PendingInterrupt::Reset => 0xFFFC,
            _ => 0xFFFE,
        };
        self.pc = self.bus.read_word(vector);
    }
}
