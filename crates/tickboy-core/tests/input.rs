mod common;

use common::{machine, run_instruction};
use tickboy_core::input::Button;
use tickboy_core::interrupt::Interrupt;

#[test]
fn button_row_selection() {
    let mut gb = machine(&[]);
    gb.button(Button::Start, true);
    gb.button(Button::Left, true);

    assert_eq!(gb.mmu.read_byte(0xFF00), 0xFF);

    gb.mmu.write_byte(0xFF00, 0x10);
    assert_eq!(gb.mmu.read_byte(0xFF00), 0xD7);

    gb.mmu.write_byte(0xFF00, 0x20);
    assert_eq!(gb.mmu.read_byte(0xFF00), 0xED);

    gb.mmu.write_byte(0xFF00, 0x00);
    assert_eq!(gb.mmu.read_byte(0xFF00), 0xC5);
}

#[test]
fn press_on_selected_row_raises_joypad() {
    let mut gb = machine(&[]);
    gb.mmu.write_byte(0xFF00, 0x10);
    gb.mmu.interrupts.write_flags(0);

    gb.button(Button::Down, true);
    assert!(!gb.mmu.interrupts.is_requested(Interrupt::Joypad));

    gb.button(Button::A, true);
    assert!(gb.mmu.interrupts.is_requested(Interrupt::Joypad));

    gb.mmu.interrupts.write_flags(0);
    gb.button(Button::A, false);
    assert!(!gb.mmu.interrupts.is_requested(Interrupt::Joypad));
}

#[test]
fn selecting_a_held_row_raises_joypad() {
    let mut gb = machine(&[]);
    gb.button(Button::Up, true);
    gb.mmu.interrupts.write_flags(0);
    gb.mmu.write_byte(0xFF00, 0x20);
    assert!(gb.mmu.interrupts.is_requested(Interrupt::Joypad));
}

#[test]
fn press_wakes_stopped_cpu() {
    let mut gb = machine(&[0x10, 0x00, 0x3C]);
    let a = gb.cpu.a;
    run_instruction(&mut gb);
    assert!(gb.cpu.stopped);

    gb.button(Button::B, true);
    assert!(!gb.cpu.stopped);
    run_instruction(&mut gb);
    assert_eq!(gb.cpu.a, a.wrapping_add(1));
}
