#![allow(dead_code)]

use tickboy_core::{cartridge::ROM_PAGE_SIZE, config::Config, gameboy::GameBoy};

pub const PROGRAM_START: u16 = 0xC000;

/// A machine with the LCD off, IF cleared and `program` copied to the start
/// of work RAM, with PC pointing at it.
pub fn machine(program: &[u8]) -> GameBoy {
    machine_with_config(program, Config::default())
}

pub fn machine_with_config(program: &[u8], config: Config) -> GameBoy {
    let mut gb = GameBoy::with_config(config);
    gb.mmu.write_byte(0xFF40, 0x00);
    gb.mmu.interrupts.write_flags(0x00);
    load_at(&mut gb, PROGRAM_START, program);
    gb.cpu.pc = PROGRAM_START;
    gb
}

pub fn load_at(gb: &mut GameBoy, addr: u16, bytes: &[u8]) {
    for (i, &b) in bytes.iter().enumerate() {
        gb.mmu.write_byte(addr + i as u16, b);
    }
}

/// Step until the CPU reaches the next instruction boundary and return the
/// number of M-cycles spent.
pub fn run_instruction(gb: &mut GameBoy) -> u64 {
    let start = gb.cpu.cycles;
    loop {
        gb.step();
        if gb.cpu.at_boundary() {
            return gb.cpu.cycles - start;
        }
    }
}

pub fn run_instructions(gb: &mut GameBoy, count: usize) {
    for _ in 0..count {
        run_instruction(gb);
    }
}

pub fn run_cycles(gb: &mut GameBoy, cycles: u64) {
    for _ in 0..cycles {
        gb.step();
    }
}

/// A ROM image with a valid header. The first byte of every page holds the
/// page number.
pub fn rom_image(cart_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
    let pages = 2usize << rom_code;
    let mut rom = vec![0u8; pages * ROM_PAGE_SIZE];
    for page in 0..pages {
        rom[page * ROM_PAGE_SIZE] = page as u8;
    }
    rom[0x0134..0x0138].copy_from_slice(b"TEST");
    rom[0x0147] = cart_type;
    rom[0x0148] = rom_code;
    rom[0x0149] = ram_code;
    rom
}
