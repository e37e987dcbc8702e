use std::sync::Arc;

use crabapple_core::device::{MappedDevice, Pia6820};
use crabapple_core::peripheral::{AsciiKeyboard, Peripheral, VideoTerminal};

const KBD: u16 = 0xD010;
const KBD_CR: u16 = 0xD011;
const DSP: u16 = 0xD012;
const DSP_CR: u16 = 0xD013;

fn apple1_pia() -> (Pia6820, Arc<AsciiKeyboard>, Arc<VideoTerminal>) {
    let keyboard = Arc::new(AsciiKeyboard::new());
    let terminal = Arc::new(VideoTerminal::with_busy_interval(std::time::Duration::ZERO));
    let pia = Pia6820::new(
        0xD000,
        Some(keyboard.clone() as Arc<dyn Peripheral>),
        Some(terminal.clone() as Arc<dyn Peripheral>),
    );
    (pia, keyboard, terminal)
}

#[test]
fn test_reset_state() {
    let (pia, _, _) = apple1_pia();
    assert_eq!(pia.read_byte(KBD), 0x00); // DDRA (CRA.2 = 0)
    assert_eq!(pia.read_byte(KBD_CR), 0x00);
    assert_eq!(pia.read_byte(DSP), 0x00); // DDRB
    assert_eq!(pia.read_byte(DSP_CR), 0x00);
}

#[test]
fn test_window_and_mirroring() {
    let (pia, _, _) = apple1_pia();
    assert_eq!(pia.start_address(), 0xD000);
    assert_eq!(pia.size(), 2048);
    assert!(pia.contains(0xD000));
    assert!(pia.contains(0xD7FF));
    assert!(!pia.contains(0xD800));

    // Only the five low address bits decode: $D010 mirrors at $D030...
    pia.write_byte(0xD030, 0x5A); // DDRA
    assert_eq!(pia.read_byte(KBD), 0x5A);
    // ...and at $D790
    assert_eq!(pia.read_byte(0xD790), 0x5A);
}

#[test]
fn test_ddr_select_switches_register() {
    let (pia, _, _) = apple1_pia();
    pia.write_byte(KBD, 0x0F); // DDRA while CRA.2 = 0
    assert_eq!(pia.read_byte(KBD), 0x0F);
    pia.write_byte(KBD_CR, 0x04); // select data register
    // Data reads now go to the keyboard (nothing pressed -> 0)
    assert_eq!(pia.read_byte(KBD), 0x00);
    pia.write_byte(KBD_CR, 0x00);
    assert_eq!(pia.read_byte(KBD), 0x0F); // DDRA survived
}

#[test]
fn test_keypress_raises_irq1_and_data_read_clears_it() {
    let (pia, keyboard, _) = apple1_pia();
    pia.write_byte(KBD_CR, 0x04); // DDR-select = data, DDRA = 0 (all input)

    keyboard.keypress(b'A');
    // The CR read polls the latch and shows IRQ1
    assert_eq!(pia.read_byte(KBD_CR) & 0x80, 0x80);

    // Reading the data register returns the translated code and acks IRQ1
    assert_eq!(pia.read_byte(KBD), 0xC1); // 'A' | 0x80
    assert_eq!(pia.read_byte(KBD_CR) & 0x80, 0x00);
}

#[test]
fn test_data_read_masks_output_bits() {
    let (pia, keyboard, _) = apple1_pia();
    pia.write_byte(KBD, 0xF0); // DDRA: high nibble is output
    pia.write_byte(KBD_CR, 0x04);
    keyboard.keypress(b'A'); // 0xC1
    assert_eq!(pia.read_byte(KBD), 0xC1 & !0xF0);
}

#[test]
fn test_display_status_read_clears_keyboard_irq() {
    // Port B data reads acknowledge the port A strobe: the quirk the
    // monitor's DSP polling loop relies on.
    let (pia, keyboard, _) = apple1_pia();
    pia.write_byte(KBD_CR, 0x04);
    pia.write_byte(DSP_CR, 0x04);
    keyboard.keypress(b'X');
    assert_eq!(pia.read_byte(KBD_CR) & 0x80, 0x80);
    let _ = pia.read_byte(DSP);
    assert_eq!(pia.read_byte(KBD_CR) & 0x80, 0x00);
}

#[test]
fn test_cr_read_masks_cx1_control_bits() {
    let (pia, _, _) = apple1_pia();
    pia.write_byte(KBD_CR, 0x07); // DDR-select + Cx1 bits
    assert_eq!(pia.read_byte(KBD_CR) & 0x03, 0x00);
    assert_eq!(pia.read_byte(KBD_CR) & 0x04, 0x04);
}

#[test]
fn test_port_b_write_reaches_terminal_masked_by_ddrb() {
    let (pia, _, terminal) = apple1_pia();
    pia.write_byte(DSP, 0x7F); // DDRB: bit 7 input (ready line), rest output
    pia.write_byte(DSP_CR, 0x04);
    pia.write_byte(DSP, b'H' | 0x80); // high bit masked off by DDRB
    pia.write_byte(DSP, b'I');
    let snapshot = terminal.snapshot();
    assert_eq!(snapshot.grid[0][0], b'H');
    assert_eq!(snapshot.grid[0][1], b'I');
}

#[test]
fn test_port_b_status_while_ready() {
    let (pia, _, _) = apple1_pia();
    pia.write_byte(DSP, 0x7F);
    pia.write_byte(DSP_CR, 0x04);
    // Terminal ready: reads 0 in bit 7 (DDRB masks the rest anyway)
    assert_eq!(pia.read_byte(DSP) & 0x80, 0x00);
}

#[test]
fn test_pia_reset_clears_registers() {
    let (pia, _, _) = apple1_pia();
    pia.write_byte(KBD, 0xFF);
    pia.write_byte(KBD_CR, 0x04);
    pia.write_byte(DSP_CR, 0x04);
    pia.reset();
    assert_eq!(pia.read_byte(KBD), 0x00); // DDRA again, and zero
    assert_eq!(pia.read_byte(KBD_CR), 0x00);
    assert_eq!(pia.read_byte(DSP_CR), 0x00);
}
