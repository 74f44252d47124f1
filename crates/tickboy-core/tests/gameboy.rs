mod common;

use std::sync::atomic::AtomicBool;

use common::machine;
use tickboy_core::gameboy::RunExit;
use tickboy_core::ppu::{FRAME_CYCLES, Framebuffer};

#[test]
fn run_frame_is_one_frame_of_cycles() {
    let mut gb = machine(&[0x18, 0xFE]);
    gb.run_frame();
    assert_eq!(gb.cpu.cycles, FRAME_CYCLES as u64);
}

#[test]
fn run_stops_at_breakpoint() {
    // NOP; LD B,B; JR -2
    let mut gb = machine(&[0x00, 0x40, 0x18, 0xFE]);
    let cancel = AtomicBool::new(false);
    let mut frames = 0;
    let exit = gb.run(&mut |_: &Framebuffer| frames += 1, &cancel);
    assert_eq!(exit, RunExit::Breakpoint);
    assert_eq!(frames, 1);
}

#[test]
fn run_reports_lock_up() {
    let mut gb = machine(&[0xDD]);
    let cancel = AtomicBool::new(false);
    let exit = gb.run(&mut |_: &Framebuffer| {}, &cancel);
    assert_eq!(exit, RunExit::Locked);
}

#[test]
fn run_honours_cancellation() {
    let mut gb = machine(&[0x18, 0xFE]);
    let cancel = AtomicBool::new(true);
    let mut frames = 0;
    let exit = gb.run(&mut |_: &Framebuffer| frames += 1, &cancel);
    assert_eq!(exit, RunExit::Cancelled);
    assert_eq!(frames, 1);
}

#[test]
fn frames_delivered_with_lcd_on() {
    let mut gb = machine(&[0x18, 0xFE]);
    gb.mmu.write_byte(0xFF40, 0x91);
    for _ in 0..3 {
        gb.run_frame();
    }
    assert_eq!(gb.mmu.ppu.frames(), 3);
    assert_eq!(gb.framebuffer().len(), 160 * 144);
}
