mod common;

use common::{PROGRAM_START, machine, run_instruction, run_instructions};
use tickboy_core::cpu::ops::UNDEFINED_OPCODES;
use tickboy_core::gameboy::GameBoy;

const FLAG_Z: u8 = 0x80;
const FLAG_H: u8 = 0x20;
const FLAG_C: u8 = 0x10;

fn cycles_with(program: &[u8], setup: impl FnOnce(&mut GameBoy)) -> u64 {
    let mut gb = machine(program);
    gb.cpu.h = 0xC1;
    gb.cpu.l = 0x00;
    setup(&mut gb);
    run_instruction(&mut gb)
}

fn cycles(program: &[u8]) -> u64 {
    cycles_with(program, |_| {})
}

#[test]
fn stack_instruction_timing() {
    // RET, CALL a16, PUSH rr, POP rr, RST nn: 16, 24, 16, 12, 16 clocks
    assert_eq!(cycles(&[0xC9]) * 4, 16);
    assert_eq!(cycles(&[0xCD, 0x00, 0xC1]) * 4, 24);
    assert_eq!(cycles(&[0xC5]) * 4, 16);
    assert_eq!(cycles(&[0xC1]) * 4, 12);
    assert_eq!(cycles(&[0xFF]) * 4, 16);
}

#[test]
fn memory_operand_timing() {
    assert_eq!(cycles(&[0x00]), 1);
    assert_eq!(cycles(&[0x01, 0x34, 0x12]), 3);
    assert_eq!(cycles(&[0x36, 0x42]), 3);
    assert_eq!(cycles(&[0x34]), 3);
    assert_eq!(cycles(&[0x7E]), 2);
    assert_eq!(cycles(&[0x86]), 2);
    assert_eq!(cycles(&[0xEA, 0x00, 0xC1]), 4);
    assert_eq!(cycles(&[0xF0, 0x80]), 3);
    assert_eq!(cycles(&[0x08, 0x00, 0xC1]), 5);
    assert_eq!(cycles(&[0xE8, 0x01]), 4);
    assert_eq!(cycles(&[0xF8, 0x01]), 3);
    assert_eq!(cycles(&[0xF9]), 2);
    assert_eq!(cycles(&[0xE9]), 1);
    assert_eq!(cycles(&[0x09]), 2);
}

#[test]
fn prefixed_timing() {
    assert_eq!(cycles(&[0xCB, 0x11]), 2);
    assert_eq!(cycles(&[0xCB, 0x46]), 3);
    assert_eq!(cycles(&[0xCB, 0x06]), 4);
    assert_eq!(cycles(&[0xCB, 0xC6]), 4);
}

#[test]
fn conditional_branch_timing() {
    let taken = |gb: &mut GameBoy| gb.cpu.f = 0;
    let not_taken = |gb: &mut GameBoy| gb.cpu.f = FLAG_Z;

    // JR NZ
    assert_eq!(cycles_with(&[0x20, 0x02], taken), 3);
    assert_eq!(cycles_with(&[0x20, 0x02], not_taken), 2);
    // JP NZ
    assert_eq!(cycles_with(&[0xC2, 0x00, 0xC1], taken), 4);
    assert_eq!(cycles_with(&[0xC2, 0x00, 0xC1], not_taken), 3);
    // CALL NZ
    assert_eq!(cycles_with(&[0xC4, 0x00, 0xC1], taken), 6);
    assert_eq!(cycles_with(&[0xC4, 0x00, 0xC1], not_taken), 3);
    // RET NZ
    assert_eq!(cycles_with(&[0xC0], taken), 5);
    assert_eq!(cycles_with(&[0xC0], not_taken), 2);
}

#[test]
fn untaken_call_leaves_stack_alone() {
    let mut gb = machine(&[0xCC, 0x00, 0xC1]);
    gb.cpu.f = 0;
    run_instruction(&mut gb);
    assert_eq!(gb.cpu.pc, PROGRAM_START + 3);
    assert_eq!(gb.cpu.sp, 0xFFFE);
}

#[test]
fn every_opcode_keeps_low_flag_nibble_clear() {
    for op in 0..=0xFFu8 {
        if op == 0xCB {
            continue;
        }
        let mut gb = machine(&[op, 0x12, 0x34]);
        run_instruction(&mut gb);
        assert_eq!(gb.cpu.f & 0x0F, 0, "opcode {op:02X}");
        assert_eq!(gb.cpu.locked, UNDEFINED_OPCODES.contains(&op), "opcode {op:02X}");
    }
    for op in 0..=0xFFu8 {
        let mut gb = machine(&[0xCB, op]);
        gb.cpu.h = 0xC1;
        run_instruction(&mut gb);
        assert_eq!(gb.cpu.f & 0x0F, 0, "opcode CB {op:02X}");
        assert_eq!(gb.cpu.current_opcode(), Some(0xCB00 | op as u16));
    }
}

#[test]
fn swap_twice_is_identity() {
    let mut gb = machine(&[0xCB, 0x37, 0xCB, 0x37]);
    gb.cpu.a = 0x5A;
    run_instructions(&mut gb, 2);
    assert_eq!(gb.cpu.a, 0x5A);
    assert_eq!(gb.cpu.f, 0);

    let mut gb = machine(&[0xCB, 0x37, 0xCB, 0x37]);
    gb.cpu.a = 0x00;
    run_instructions(&mut gb, 2);
    assert_eq!(gb.cpu.f, FLAG_Z);
}

#[test]
fn rlc_eight_times_is_identity() {
    let mut gb = machine(&[0xCB, 0x00].repeat(8));
    gb.cpu.b = 0x81;
    run_instructions(&mut gb, 8);
    assert_eq!(gb.cpu.b, 0x81);
}

#[test]
fn push_pop_round_trips() {
    // PUSH BC; POP BC; PUSH DE; POP DE; PUSH HL; POP HL
    let mut gb = machine(&[0xC5, 0xC1, 0xD5, 0xD1, 0xE5, 0xE1]);
    gb.cpu.b = 0x12;
    gb.cpu.c = 0x34;
    gb.cpu.d = 0x56;
    gb.cpu.e = 0x78;
    gb.cpu.h = 0x9A;
    gb.cpu.l = 0xBC;
    run_instructions(&mut gb, 6);
    assert_eq!((gb.cpu.b, gb.cpu.c), (0x12, 0x34));
    assert_eq!((gb.cpu.d, gb.cpu.e), (0x56, 0x78));
    assert_eq!((gb.cpu.h, gb.cpu.l), (0x9A, 0xBC));
    assert_eq!(gb.cpu.sp, 0xFFFE);
}

#[test]
fn pop_af_clears_low_nibble() {
    // LD BC,$12FF; PUSH BC; POP AF
    let mut gb = machine(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    run_instructions(&mut gb, 3);
    assert_eq!(gb.cpu.a, 0x12);
    assert_eq!(gb.cpu.f, 0xF0);
}

#[test]
fn add_hl_preserves_zero() {
    let mut gb = machine(&[0x09]);
    gb.cpu.f = FLAG_Z;
    gb.cpu.h = 0xFF;
    gb.cpu.l = 0xFF;
    gb.cpu.b = 0x00;
    gb.cpu.c = 0x01;
    run_instruction(&mut gb);
    assert_eq!((gb.cpu.h, gb.cpu.l), (0x00, 0x00));
    assert_eq!(gb.cpu.f, FLAG_Z | FLAG_H | FLAG_C);

    let mut gb = machine(&[0x09]);
    gb.cpu.f = 0;
    gb.cpu.h = 0xFF;
    gb.cpu.l = 0xFF;
    gb.cpu.b = 0x00;
    gb.cpu.c = 0x01;
    run_instruction(&mut gb);
    assert_eq!(gb.cpu.f, FLAG_H | FLAG_C);
}

#[test]
fn scf_then_ccf_clears_carry() {
    let mut gb = machine(&[0x37, 0x3F]);
    gb.cpu.f = 0xF0;
    run_instructions(&mut gb, 2);
    assert_eq!(gb.cpu.f, FLAG_Z);
}

#[test]
fn daa_corrects_bcd_addition() {
    // LD A,$15; ADD A,$27; DAA
    let mut gb = machine(&[0x3E, 0x15, 0xC6, 0x27, 0x27]);
    run_instructions(&mut gb, 3);
    assert_eq!(gb.cpu.a, 0x42);
}

#[test]
fn load_with_increment() {
    // LD (HL+),A; LD A,(HL-)
    let mut gb = machine(&[0x22, 0x3A]);
    gb.cpu.a = 0x42;
    gb.cpu.h = 0xC1;
    gb.cpu.l = 0x00;
    gb.mmu.write_byte(0xC101, 0x99);
    run_instruction(&mut gb);
    assert_eq!(gb.mmu.read_byte(0xC100), 0x42);
    assert_eq!((gb.cpu.h, gb.cpu.l), (0xC1, 0x01));
    run_instruction(&mut gb);
    assert_eq!(gb.cpu.a, 0x99);
    assert_eq!((gb.cpu.h, gb.cpu.l), (0xC1, 0x00));
}

#[test]
fn read_modify_write_on_memory() {
    // INC (HL); SET 7,(HL); RES 0,(HL)
    let mut gb = machine(&[0x34, 0xCB, 0xFE, 0xCB, 0x86]);
    gb.cpu.h = 0xC1;
    gb.cpu.l = 0x00;
    gb.mmu.write_byte(0xC100, 0x0F);
    run_instructions(&mut gb, 3);
    assert_eq!(gb.mmu.read_byte(0xC100), 0x90);
}

#[test]
fn relative_jump_backwards() {
    let mut gb = machine(&[0x18, 0xFE]);
    assert_eq!(run_instruction(&mut gb), 3);
    assert_eq!(gb.cpu.pc, PROGRAM_START);
}

#[test]
fn restart_pushes_return_address() {
    let mut gb = machine(&[0xFF]);
    run_instruction(&mut gb);
    assert_eq!(gb.cpu.pc, 0x0038);
    assert_eq!(gb.cpu.sp, 0xFFFC);
    assert_eq!(gb.mmu.read_byte(0xFFFC), 0x01);
    assert_eq!(gb.mmu.read_byte(0xFFFD), 0xC0);
}

#[test]
fn call_then_return() {
    let mut gb = machine(&[0xCD, 0x00, 0xC1]);
    gb.mmu.write_byte(0xC100, 0xC9);
    run_instructions(&mut gb, 2);
    assert_eq!(gb.cpu.pc, PROGRAM_START + 3);
    assert_eq!(gb.cpu.sp, 0xFFFE);
}

#[test]
fn hl_from_sp_offset_flags() {
    let mut gb = machine(&[0xF8, 0xFF]);
    run_instruction(&mut gb);
    assert_eq!((gb.cpu.h, gb.cpu.l), (0xFF, 0xFD));
    assert_eq!(gb.cpu.f, FLAG_H | FLAG_C);
}

#[test]
fn ld_b_b_latches_breakpoint() {
    let mut gb = machine(&[0x40]);
    assert!(!gb.cpu.mooneye_breakpoint);
    run_instruction(&mut gb);
    assert!(gb.cpu.mooneye_breakpoint);
}

#[test]
fn stop_skips_padding_and_waits() {
    let mut gb = machine(&[0x10, 0x00, 0x3C]);
    run_instruction(&mut gb);
    assert!(gb.cpu.stopped);
    assert_eq!(gb.cpu.pc, PROGRAM_START + 2);
    for _ in 0..100 {
        gb.step();
    }
    assert_eq!(gb.cpu.pc, PROGRAM_START + 2);
}

#[test]
fn undefined_opcode_freezes_cpu() {
    let mut gb = machine(&[0xFD, 0x3C]);
    let a = gb.cpu.a;
    run_instruction(&mut gb);
    assert!(gb.cpu.locked);
    for _ in 0..100 {
        gb.step();
    }
    assert_eq!(gb.cpu.pc, PROGRAM_START + 1);
    assert_eq!(gb.cpu.a, a);
}

#[test]
fn debug_state_format() {
    let mut gb = machine(&[0x00]);
    run_instruction(&mut gb);
    assert_eq!(
        gb.cpu.debug_state(),
        "AF:01B0 BC:0013 DE:00D8 HL:014D PC:C001 SP:FFFE CY:1"
    );
}
