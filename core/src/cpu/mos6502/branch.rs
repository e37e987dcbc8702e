use super::{Mos6502, StatusFlag};

impl Mos6502 {
    /// Conditional branches (relative mode). The condition is keyed by the
    /// instruction bits: flag N/V/C/Z, branch on clear then on set.
    ///
    /// A taken branch costs one extra cycle, and another when the target
    /// lies on a different page than the byte after the operand.
    pub(crate) fn exec_branch(&mut self, instruction: u8, cycles: &mut u8) {
        let taken = match instruction {
            0 => !self.flag(StatusFlag::N), // BPL
            1 => self.flag(StatusFlag::N),  // BMI
            2 => !self.flag(StatusFlag::V), // BVC
            3 => self.flag(StatusFlag::V),  // BVS
            4 => !self.flag(StatusFlag::C), // BCC
            5 => self.flag(StatusFlag::C),  // BCS
            6 => !self.flag(StatusFlag::Z), // BNE
            _ => self.flag(StatusFlag::Z),  // BEQ
        };
        if taken {
            *cycles += 1;
            let offset = self.bus.read_byte(self.pc) as i8;
            self.pc = self.pc.wrapping_add(1);
            let target = self.pc.wrapping_add(offset as u16);
            if (target ^ self.pc) & 0xFF00 != 0 {
                *cycles += 1;
            }
            self.pc = target;
        } else {
            self.pc = self.pc.wrapping_add(1);
        }
    }
}
