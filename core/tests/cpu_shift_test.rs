use crabapple_core::cpu::StatusFlag;

mod common;
use common::boot;

fn flag(p: u8, f: StatusFlag) -> bool {
    p & f as u8 != 0
}

#[test]
fn test_asl_accumulator() {
    // LDA #$81; ASL A -> 0x02, C=1
    let mut cpu = boot(0x0200, &[0xA9, 0x81, 0x0A]);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.a, 0x02);
    assert!(flag(cpu.p, StatusFlag::C));
    assert!(!flag(cpu.p, StatusFlag::N));
}

#[test]
fn test_asl_memory() {
    // ASL $40 where $40 = $40 -> $80, N=1, C=0
    let mut cpu = boot(0x0200, &[0x06, 0x40]);
    cpu.bus().write_byte(0x0040, 0x40);
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0x80);
    assert!(flag(cpu.p, StatusFlag::N));
    assert!(!flag(cpu.p, StatusFlag::C));
}

#[test]
fn test_lsr_accumulator() {
    // LDA #$01; LSR A -> 0x00, C=1, Z=1, N=0
    let mut cpu = boot(0x0200, &[0xA9, 0x01, 0x4A]);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.a, 0x00);
    assert!(flag(cpu.p, StatusFlag::C));
    assert!(flag(cpu.p, StatusFlag::Z));
    assert!(!flag(cpu.p, StatusFlag::N));
}

#[test]
fn test_rol_feeds_carry_into_bit0() {
    // SEC; LDA #$40; ROL A -> 0x81, C=0
    let mut cpu = boot(0x0200, &[0x38, 0xA9, 0x40, 0x2A]);
    cpu.step();
    cpu.step();
    cpu.step();
    assert_eq!(cpu.a, 0x81);
    assert!(!flag(cpu.p, StatusFlag::C));
    assert!(flag(cpu.p, StatusFlag::N));
}

#[test]
fn test_ror_feeds_carry_into_bit7() {
    // SEC; ROR $40 where $40 = $02 -> $81, C=0
    let mut cpu = boot(0x0200, &[0x38, 0x66, 0x40]);
    cpu.bus().write_byte(0x0040, 0x02);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0x81);
    assert!(!flag(cpu.p, StatusFlag::C));
}

#[test]
fn test_ror_ejects_bit0_into_carry() {
    // CLC; ROR $40 where $40 = $03 -> $01, C=1
    let mut cpu = boot(0x0200, &[0x18, 0x66, 0x40]);
    cpu.bus().write_byte(0x0040, 0x03);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0x01);
    assert!(flag(cpu.p, StatusFlag::C));
}

#[test]
fn test_inc_dec_memory() {
    // INC $40; INC $40; DEC $40 with $40 starting at $FE
    let mut cpu = boot(0x0200, &[0xE6, 0x40, 0xE6, 0x40, 0xC6, 0x40]);
    cpu.bus().write_byte(0x0040, 0xFE);
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0xFF);
    assert!(flag(cpu.p, StatusFlag::N));
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0x00);
    assert!(flag(cpu.p, StatusFlag::Z));
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x0040), 0xFF);
}

#[test]
fn test_asl_absolute_x() {
    // LDX #$02; ASL $1000,X
    let mut cpu = boot(0x0200, &[0xA2, 0x02, 0x1E, 0x00, 0x10]);
    cpu.bus().write_byte(0x1002, 0x21);
    cpu.step();
    cpu.step();
    assert_eq!(cpu.bus().read_byte(0x1002), 0x42);
}
