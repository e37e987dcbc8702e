mod alu;
mod branch;
mod load_store;
mod shift;
mod stack;
mod unary;

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::bus::MemoryBus;
use crate::cpu::{CpuControl, CpuThread, PendingInterrupt};

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum StatusFlag {
    C = 0x01, // Carry
    Z = 0x02, // Zero
    I = 0x04, // Interrupt Disable
    D = 0x08, // Decimal
    B = 0x10, // Break
    U = 0x20, // Unused (always 1)
    V = 0x40, // Overflow
    N = 0x80, // Negative
}

/// Operand addressing modes of the NMOS 6502.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    Accumulator,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    /// (zp,X)
    IndexedIndirect,
    /// (zp),Y
    IndirectIndexed,
}

/// Base cycle counts per opcode. Branch instructions add one cycle when
/// taken and another when the target is on a different page. Undefined
/// opcodes that halt the CPU carry 0.
#[rustfmt::skip]
const CYCLE_TABLE: [u8; 256] = [
    // 0  1  2  3  4  5  6  7  8  9  A  B  C  D  E  F
       7, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 4, 4, 6, 6, // 0x00
       3, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x10
       6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 4, 4, 6, 6, // 0x20
       2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x30
       6, 6, 0, 8, 3, 3, 5, 5, 3, 2, 2, 2, 3, 4, 6, 6, // 0x40
       3, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x50
       6, 6, 0, 8, 3, 3, 5, 5, 4, 2, 2, 2, 5, 4, 6, 6, // 0x60
       2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0x70
       2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0x80
       3, 6, 0, 6, 4, 4, 4, 4, 2, 5, 2, 5, 5, 5, 5, 5, // 0x90
       2, 6, 2, 6, 3, 3, 3, 3, 2, 2, 2, 2, 4, 4, 4, 4, // 0xA0
       2, 5, 0, 5, 4, 4, 4, 4, 2, 4, 2, 4, 4, 4, 4, 4, // 0xB0
       2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xC0
       3, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xD0
       2, 6, 2, 8, 3, 3, 5, 5, 2, 2, 2, 2, 4, 4, 6, 6, // 0xE0
       2, 5, 0, 8, 4, 4, 6, 6, 2, 4, 2, 7, 4, 4, 7, 7, // 0xF0
];

/// Undefined opcodes that jam the processor: the PC is rewound so the
/// same opcode refetches forever.
const KIL_OPCODES: [u8; 12] = [
    0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2,
];

/// Simulated cycle period, ~1 MHz.
const CYCLE_TIME: Duration = Duration::from_micros(1);

/// Register-file snapshot for state dumps and debugger views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: u8,
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={:02X} X={:02X} Y={:02X} S={:02X} PC={:04X} P={:02X}",
            self.a, self.x, self.y, self.s, self.pc, self.p
        )
    }
}

/// MOS 6502 instruction-set interpreter.
///
/// `step` executes one instruction: it consumes any pending interrupt at
/// the boundary, fetches and decodes the opcode through the conventional
/// group/instruction/mode bit-field split, applies the semantic action,
/// and then paces the host clock so each simulated cycle takes about one
/// microsecond.
pub struct Mos6502 {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: u8,

    bus: Arc<MemoryBus>,
    control: Arc<CpuControl>,
    /// Pacer baseline: the intended start of the current instruction.
    baseline: Option<Instant>,
    /// Interrupt being dispatched by the current instruction, if any.
    interrupt_source: PendingInterrupt,
    /// Whether the current BRK dispatch came from a fetched BRK opcode,
    /// as opposed to an interrupt raised from outside.
    brk_from_code: bool,
}

impl Mos6502 {
    /// Power-on state, with a RESET pending so the first step vectors
    /// through 0xFFFC.
    pub fn new(bus: Arc<MemoryBus>) -> Self {
        let cpu = Self {
            a: 0xAA,
            x: 0xC0,
            y: 0x00,
            s: 0xBB,
            pc: 0x0000,
            p: StatusFlag::U as u8 | StatusFlag::B as u8 | StatusFlag::I as u8 | StatusFlag::Z as u8,
            bus,
            control: Arc::new(CpuControl::new()),
            baseline: None,
            interrupt_source: PendingInterrupt::None,
            brk_from_code: false,
        };
        cpu.reset();
        cpu
    }

    pub fn bus(&self) -> &Arc<MemoryBus> {
        &self.bus
    }

    /// The shared control block, for callers that keep raising interrupts
    /// or stopping the CPU after the execution thread takes ownership.
    pub fn control(&self) -> Arc<CpuControl> {
        self.control.clone()
    }

    pub fn state(&self) -> CpuState {
        CpuState {
            a: self.a,
            x: self.x,
            y: self.y,
            s: self.s,
            pc: self.pc,
            p: self.p,
        }
    }

    /// Request a RESET at the next instruction boundary.
    pub fn reset(&self) {
        self.control.reset();
    }

    /// Request an IRQ; honored once the I flag is clear.
    pub fn irq(&self) {
        self.control.irq();
    }

    /// Request an NMI; honored at the next boundary.
    pub fn nmi(&self) {
        self.control.nmi();
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, flag: StatusFlag, set: bool) {
        if set {
            self.p |= flag as u8;
        } else {
            self.p &= !(flag as u8);
        }
    }

    #[inline]
    pub(crate) fn flag(&self, flag: StatusFlag) -> bool {
        self.p & flag as u8 != 0
    }

    /// Execute one instruction. Returns the cycle count charged for it.
    pub fn step(&mut self) -> u8 {
        let baseline = match self.baseline {
            Some(instant) => instant,
            None => {
                let now = Instant::now();
                self.baseline = Some(now);
                now
            }
        };

        // Instruction boundary: consume a pending interrupt unless it is
        // an IRQ masked by the I flag.
        let pending = self.control.pending();
        let masked = pending == PendingInterrupt::Irq && self.flag(StatusFlag::I);
        self.interrupt_source = if pending != PendingInterrupt::None && !masked {
            self.control.take_pending()
        } else {
            PendingInterrupt::None
        };

        let opcode = if self.interrupt_source == PendingInterrupt::None {
            let opcode = self.bus.read_byte(self.pc);
            self.pc = self.pc.wrapping_add(1);
            opcode
        } else {
            0x00 // synthesize a BRK-flavored dispatch
        };

        // A BRK opcode executed from code records itself as the interrupt
        // source; a synthesized dispatch keeps the source it was raised
        // with.
        self.brk_from_code = opcode == 0x00 && self.interrupt_source == PendingInterrupt::None;
        if self.brk_from_code {
            self.interrupt_source = PendingInterrupt::Brk;
        }

        let mut cycles = CYCLE_TABLE[opcode as usize];

        if KIL_OPCODES.contains(&opcode) {
            // Jam: refetch the same opcode forever.
            self.pc = self.pc.wrapping_sub(1);
        } else {
            let instruction = (opcode >> 5) & 0x07;
            let mode = (opcode >> 2) & 0x07;
            match opcode & 0x03 {
                0x00 => self.exec_group_zero(instruction, mode, &mut cycles),
                0x01 => self.exec_group_one(instruction, mode),
                0x02 => self.exec_group_two(instruction, mode),
                // Undocumented combined forms: treated as no-ops.
                _ => {}
            }
        }

        self.pace(baseline, cycles);
        cycles
    }

    /// Run the fetch-decode-execute-pace loop until the stop flag is
    /// raised, then hand the interpreter back.
    pub fn run(mut self) -> Self {
        self.control.clear_stopping();
        while !self.control.is_stopping() {
            self.step();
        }
        self
    }

    /// Spawn the execution thread.
    pub fn start(self) -> std::io::Result<CpuThread> {
        let control = self.control.clone();
        let handle = thread::Builder::new()
            .name("cpu".into())
            .spawn(move || self.run())?;
        Ok(CpuThread::new(control, handle))
    }

    /// Busy-wait until the instruction's intended completion time, then
    /// rebase there. Overruns advance the baseline without sleeping, so
    /// timing errors do not accumulate.
    fn pace(&mut self, baseline: Instant, cycles: u8) {
        let goal = baseline + CYCLE_TIME * cycles as u32;
        while Instant::now() < goal {
            std::hint::spin_loop();
        }
        self.baseline = Some(goal);
    }

    // ---- Operand addressing ----

    /// Read a zero-page pointer; the high byte wraps within page 0.
    fn read_word_zero_page(&self, zp: u8) -> u16 {
        let lo = self.bus.read_byte(zp as u16) as u16;
        let hi = self.bus.read_byte(zp.wrapping_add(1) as u16) as u16;
        lo | (hi << 8)
    }

    /// Resolve the effective address for `mode`, consuming operand bytes
    /// at PC. Not meaningful for `Accumulator`.
    pub(crate) fn operand_addr(&mut self, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                addr
            }
            AddressingMode::Accumulator => self.pc,
            AddressingMode::Absolute => {
                let addr = self.bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                addr
            }
            AddressingMode::AbsoluteX => {
                let base = self.bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                base.wrapping_add(self.x as u16)
            }
            AddressingMode::AbsoluteY => {
                let base = self.bus.read_word(self.pc);
                self.pc = self.pc.wrapping_add(2);
                base.wrapping_add(self.y as u16)
            }
            AddressingMode::ZeroPage => {
                let zp = self.bus.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
                zp as u16
            }
            AddressingMode::ZeroPageX => {
                let zp = self.bus.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
                zp.wrapping_add(self.x) as u16
            }
            AddressingMode::ZeroPageY => {
                let zp = self.bus.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
                zp.wrapping_add(self.y) as u16
            }
            AddressingMode::IndexedIndirect => {
                let zp = self.bus.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.read_word_zero_page(zp.wrapping_add(self.x))
            }
            AddressingMode::IndirectIndexed => {
                let zp = self.bus.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
                self.read_word_zero_page(zp).wrapping_add(self.y as u16)
            }
        }
    }

    /// Read the operand for `mode`.
    pub(crate) fn read_operand(&mut self, mode: AddressingMode) -> u8 {
        if mode == AddressingMode::Accumulator {
            self.a
        } else {
            let addr = self.operand_addr(mode);
            self.bus.read_byte(addr)
        }
    }

    // ---- Opcode group dispatch ----

    /// Group 01: the eight ALU/accumulator instructions across the eight
    /// common addressing modes.
    fn exec_group_one(&mut self, instruction: u8, mode: u8) {
        let am = match mode {
            0 => AddressingMode::IndexedIndirect,
            1 => AddressingMode::ZeroPage,
            2 => AddressingMode::Immediate,
            3 => AddressingMode::Absolute,
            4 => AddressingMode::IndirectIndexed,
            5 => AddressingMode::ZeroPageX,
            6 => AddressingMode::AbsoluteY,
            _ => AddressingMode::AbsoluteX,
        };
        match instruction {
            0 => self.op_ora(am),
            1 => self.op_and(am),
            2 => self.op_eor(am),
            3 => self.op_adc(am),
            4 => {
                // STA; the immediate form does not exist
                if am != AddressingMode::Immediate {
                    self.op_sta(am);
                }
            }
            5 => self.op_lda(am),
            6 => self.op_cmp(am),
            _ => self.op_sbc(am),
        }
    }

    /// Group 10: shifts, X-register loads/stores and the read-modify-write
    /// memory instructions, plus the implied forms sharing their columns.
    fn exec_group_two(&mut self, instruction: u8, mode: u8) {
        if mode == 2 && instruction >= 4 {
            match instruction {
                4 => {
                    // TXA
                    self.a = self.x;
                    self.set_nz(self.a);
                }
                5 => {
                    // TAX
                    self.x = self.a;
                    self.set_nz(self.x);
                }
                6 => {
                    // DEX
                    self.x = self.x.wrapping_sub(1);
                    self.set_nz(self.x);
                }
                _ => {} // NOP (0xEA)
            }
            return;
        }
        if mode == 6 {
            match instruction {
                // TXS; no flags
                4 => self.s = self.x,
                5 => {
                    // TSX
                    self.x = self.s;
                    self.set_nz(self.x);
                }
                _ => {}
            }
            return;
        }
        if mode == 4 || (mode == 0 && instruction != 5) {
            return; // no documented forms
        }
        let am = match mode {
            0 => AddressingMode::Immediate, // LDX #imm
            1 => AddressingMode::ZeroPage,
            2 => AddressingMode::Accumulator,
            3 => AddressingMode::Absolute,
            // STX and LDX index by Y in the zp,X column
            5 if instruction == 4 || instruction == 5 => AddressingMode::ZeroPageY,
            5 => AddressingMode::ZeroPageX,
            // LDX indexes by Y in the abs,X column
            7 if instruction == 5 => AddressingMode::AbsoluteY,
            _ => AddressingMode::AbsoluteX,
        };
        match instruction {
            0 => self.op_asl(am),
            1 => self.op_rol(am),
            2 => self.op_lsr(am),
            3 => self.op_ror(am),
            4 => {
                // STX; the abs,X column carries no store form
                if mode != 7 {
                    self.op_stx(am);
                }
            }
            5 => self.op_ldx(am),
            6 => self.op_dec(am),
            _ => self.op_inc(am),
        }
    }

    /// Group 00: control flow, stack, Y-register and flag instructions.
    fn exec_group_zero(&mut self, instruction: u8, mode: u8, cycles: &mut u8) {
        match mode {
            // Relative column: conditional branches keyed by instruction
            4 => self.exec_branch(instruction, cycles),
            // Implied 0x_8 column: stack pushes/pulls and Y/X counters
            2 => match instruction {
                0 => self.op_php(),
                1 => self.op_plp(),
                2 => self.op_pha(),
                3 => self.op_pla(),
                4 => {
                    // DEY
                    self.y = self.y.wrapping_sub(1);
                    self.set_nz(self.y);
                }
                5 => {
                    // TAY
                    self.y = self.a;
                    self.set_nz(self.y);
                }
                6 => {
                    // INY
                    self.y = self.y.wrapping_add(1);
                    self.set_nz(self.y);
                }
                _ => {
                    // INX
                    self.x = self.x.wrapping_add(1);
                    self.set_nz(self.x);
                }
            },
            // Implied 0x_8 column, high half: flag operations and TYA
            6 => match instruction {
                0 => self.set_flag(StatusFlag::C, false), // CLC
                1 => self.set_flag(StatusFlag::C, true),  // SEC
                2 => self.set_flag(StatusFlag::I, false), // CLI
                3 => self.set_flag(StatusFlag::I, true),  // SEI
                4 => {
                    // TYA
                    self.a = self.y;
                    self.set_nz(self.a);
                }
                5 => self.set_flag(StatusFlag::V, false), // CLV
                6 => self.set_flag(StatusFlag::D, false), // CLD
                _ => self.set_flag(StatusFlag::D, true),  // SED
            },
            _ => {
                let am = match mode {
                    0 => AddressingMode::Immediate,
                    1 => AddressingMode::ZeroPage,
                    3 => AddressingMode::Absolute,
                    5 => AddressingMode::ZeroPageX,
                    7 => AddressingMode::AbsoluteX,
                    _ => return,
                };
                match (instruction, mode) {
                    (0, 0) => self.op_brk(),
                    (1, 0) => self.op_jsr(),
                    (2, 0) => self.op_rti(),
                    (3, 0) => self.op_rts(),
                    (1, 1) | (1, 3) => self.op_bit(am),
                    (2, 3) => {
                        // JMP abs
                        self.pc = self.operand_addr(AddressingMode::Absolute);
                    }
                    (3, 3) => {
                        // JMP (abs); the pointer read does not reproduce
                        // the hardware page-wrap quirk
                        let pointer = self.operand_addr(AddressingMode::Absolute);
                        self.pc = self.bus.read_word(pointer);
                    }
                    (4, 1) | (4, 3) | (4, 5) => self.op_sty(am),
                    (5, _) => self.op_ldy(am),
                    (6, 0) | (6, 1) | (6, 3) => self.op_cpy(am),
                    (7, 0) | (7, 1) | (7, 3) => self.op_cpx(am),
                    _ => {}
                }
            }
        }
    }
}
