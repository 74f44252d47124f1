mod alu;
pub mod ops;

use log::warn;
#[cfg(feature = "cpu-trace")]
use log::trace;

use crate::interrupt::Interrupt;
use crate::mmu::Mmu;
use ops::{Addr, Dst, Instruction, MicroOp, Reg8, Src, Target, Word, WordSrc, tables};

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub(crate) const FLAG_Z: u8 = 0x80; // Zero
pub(crate) const FLAG_N: u8 = 0x40; // Subtract
pub(crate) const FLAG_H: u8 = 0x20; // Half Carry
pub(crate) const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;
const BOOT_A: u8 = 0x01;
const BOOT_F: u8 = 0xB0;
const BOOT_B: u8 = 0x00;
const BOOT_C: u8 = 0x13;
const BOOT_D: u8 = 0x00;
const BOOT_E: u8 = 0xD8;
const BOOT_H: u8 = 0x01;
const BOOT_L: u8 = 0x4D;

const CB_PREFIX: u8 = 0xCB;

/// Operand bytes and scratch values carried between the steps of one
/// instruction.
#[derive(Debug, Default, Clone, Copy)]
struct Context {
    u8a: u8,
    u8b: u8,
    m8a: u8,
    m8b: u8,
    vector: u16,
}

#[derive(Clone, Copy)]
struct Cursor {
    opcode: Option<u16>,
    instr: &'static Instruction,
    step: usize,
    done: bool,
    /// The CB byte was fetched; the next cycle reads the second opcode byte.
    prefix: bool,
}

pub struct Cpu {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    /// Set by HALT with IME off and an interrupt already pending: the next
    /// opcode fetch does not advance PC.
    pub halt_bug: bool,
    /// Set after an undefined opcode. Only a reset clears it.
    pub locked: bool,
    /// Set when `LD B,B` executes.
    pub mooneye_breakpoint: bool,
    /// Elapsed M-cycles.
    pub cycles: u64,
    ime_pending: bool,
    ctx: Context,
    cursor: Cursor,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            a: BOOT_A,
            f: BOOT_F,
            b: BOOT_B,
            c: BOOT_C,
            d: BOOT_D,
            e: BOOT_E,
            h: BOOT_H,
            l: BOOT_L,
            sp: BOOT_SP,
            pc: BOOT_PC,
            ime: true,
            halted: false,
            stopped: false,
            halt_bug: false,
            locked: false,
            mooneye_breakpoint: false,
            cycles: 0,
            ime_pending: false,
            ctx: Context::default(),
            cursor: Cursor {
                opcode: None,
                instr: &tables().wake,
                step: 0,
                done: true,
                prefix: false,
            },
        }
    }

    /// Run one M-cycle. The caller advances the rest of the machine by the
    /// same cycle afterwards.
    pub fn step(&mut self, mmu: &mut Mmu) {
        self.cycles += 1;
        if self.locked || self.stopped {
            return;
        }
        if self.cursor.done {
            if self.cursor.prefix {
                self.fetch_prefixed(mmu);
            } else if !self.begin(mmu) {
                return;
            }
        }
        self.run_step(mmu);
    }

    /// Whether the next call to `step` starts a new instruction.
    pub fn at_boundary(&self) -> bool {
        self.cursor.done && !self.cursor.prefix
    }

    /// Opcode of the instruction in flight; prefixed opcodes are 0xCBxx.
    /// `None` while servicing an interrupt or waking from HALT.
    pub fn current_opcode(&self) -> Option<u16> {
        self.cursor.opcode
    }

    pub fn current_mnemonic(&self) -> &'static str {
        let instr: &'static Instruction = self.cursor.instr;
        &instr.mnemonic
    }

    /// Leave STOP mode.
    pub fn restart(&mut self) {
        self.stopped = false;
    }

    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} CY:{}",
            self.word(Word::Af),
            self.word(Word::Bc),
            self.word(Word::De),
            self.word(Word::Hl),
            self.pc,
            self.sp,
            self.cycles
        )
    }

    /// Pick what runs in this cycle: an interrupt, a wake-up, or the next
    /// opcode. Returns false when the CPU stays halted.
    fn begin(&mut self, mmu: &mut Mmu) -> bool {
        let pending = mmu.interrupts.pending();
        let t = tables();
        if self.halted {
            if pending == 0 {
                return false;
            }
            self.halted = false;
            let instr = if self.ime {
                &t.interrupt_from_halt
            } else {
                &t.wake
            };
            self.load(None, instr);
            return true;
        }
        if self.ime && pending != 0 {
            self.load(None, &t.interrupt);
            return true;
        }
        self.fetch(mmu);
        true
    }

    fn fetch(&mut self, mmu: &mut Mmu) {
        if self.ime_pending {
            self.ime_pending = false;
            self.ime = true;
        }
        let opcode = mmu.read_byte(self.pc);
        #[cfg(feature = "cpu-trace")]
        trace!("{:04X}: {}", self.pc, tables().primary[opcode as usize].mnemonic);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.pc = self.pc.wrapping_add(1);
        }
        self.load(Some(opcode as u16), &tables().primary[opcode as usize]);
        if opcode == CB_PREFIX {
            self.cursor.prefix = true;
        }
    }

    fn fetch_prefixed(&mut self, mmu: &mut Mmu) {
        let opcode = mmu.read_byte(self.pc);
        self.pc = self.pc.wrapping_add(1);
        self.load(
            Some(0xCB00 | opcode as u16),
            &tables().prefixed[opcode as usize],
        );
        // The CB fetch already spent the first step.
        self.cursor.step = 1;
    }

    fn load(&mut self, opcode: Option<u16>, instr: &'static Instruction) {
        self.ctx = Context::default();
        self.cursor = Cursor {
            opcode,
            instr,
            step: 0,
            done: false,
            prefix: false,
        };
    }

    fn run_step(&mut self, mmu: &mut Mmu) {
        let instr = self.cursor.instr;
        if let Some(ops) = instr.steps.get(self.cursor.step) {
            for &op in ops {
                self.exec(op, mmu);
            }
        }
        self.cursor.step += 1;
        if instr.finished(self.cursor.step, self.f) {
            self.cursor.done = true;
        }
    }

    fn exec(&mut self, op: MicroOp, mmu: &mut Mmu) {
        use MicroOp::*;
        match op {
            Nop => {}
            ReadParamA => {
                self.ctx.u8a = mmu.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            ReadParamB => {
                self.ctx.u8b = mmu.read_byte(self.pc);
                self.pc = self.pc.wrapping_add(1);
            }
            Read(addr, dst) => {
                let addr = self.address(addr);
                let val = mmu.read_byte(addr);
                match dst {
                    Dst::Reg(r) => self.set_reg(r, val),
                    Dst::MemA => self.ctx.m8a = val,
                    Dst::MemB => self.ctx.m8b = val,
                }
            }
            Write(addr, src) => {
                let addr = self.address(addr);
                let val = self.source(src);
                mmu.write_byte(addr, val);
            }
            Load(r, src) => {
                let val = self.source(src);
                self.set_reg(r, val);
            }
            LoadWord(w, src) => {
                let val = self.word_source(src);
                self.set_word(w, val);
            }
            Alu(op, src) => {
                let val = self.source(src);
                (self.a, self.f) = alu::alu(op, self.a, val, self.f);
            }
            Inc(target) => {
                let (val, f) = alu::inc8(self.target(target), self.f);
                self.set_target(target, val);
                self.f = f;
            }
            Dec(target) => {
                let (val, f) = alu::dec8(self.target(target), self.f);
                self.set_target(target, val);
                self.f = f;
            }
            IncWord(w) => self.set_word(w, self.word(w).wrapping_add(1)),
            DecWord(w) => self.set_word(w, self.word(w).wrapping_sub(1)),
            AddHl(w) => {
                let (hl, f) = alu::add_hl(self.word(Word::Hl), self.word(w), self.f);
                self.set_word(Word::Hl, hl);
                self.f = f;
            }
            AddSp => (self.sp, self.f) = alu::sp_offset(self.sp, self.ctx.u8a),
            LoadHlSp => {
                let (hl, f) = alu::sp_offset(self.sp, self.ctx.u8a);
                self.set_word(Word::Hl, hl);
                self.f = f;
            }
            RotateA(cb) => {
                let (a, f) = alu::prefixed(cb, self.a, self.f);
                self.a = a;
                self.f = f & !FLAG_Z;
            }
            Prefixed(cb, target) => {
                let (val, f) = alu::prefixed(cb, self.target(target), self.f);
                self.set_target(target, val);
                self.f = f;
            }
            Daa => (self.a, self.f) = alu::daa(self.a, self.f),
            Cpl => {
                self.a = !self.a;
                self.f |= FLAG_N | FLAG_H;
            }
            Scf => self.f = (self.f & FLAG_Z) | FLAG_C,
            Ccf => self.f = (self.f & (FLAG_Z | FLAG_C)) ^ FLAG_C,
            Jump(src) => self.pc = self.word_source(src),
            JumpRelative => {
                self.pc = self.pc.wrapping_add(self.ctx.u8a as i8 as i16 as u16);
            }
            Restart(vector) => self.pc = vector as u16,
            Di => {
                self.ime = false;
                self.ime_pending = false;
            }
            Ei => {
                if !self.ime {
                    self.ime_pending = true;
                }
            }
            Reti => {
                self.ime = true;
                self.ime_pending = false;
            }
            Halt => self.halt(mmu),
            Stop => {
                // STOP is two bytes; the second is ignored.
                self.pc = self.pc.wrapping_add(1);
                self.stopped = true;
            }
            Breakpoint => self.mooneye_breakpoint = true,
            Lock => {
                warn!(
                    "Undefined opcode {:02X} at {:04X}, CPU locked",
                    self.cursor.opcode.unwrap_or_default(),
                    self.pc.wrapping_sub(1)
                );
                self.locked = true;
            }
            InterruptEnter => {
                self.ime = false;
                self.ime_pending = false;
            }
            InterruptAck => {
                let lines = mmu.interrupts.pending();
                self.ctx.vector = match Interrupt::highest(lines) {
                    Some(irq) => {
                        mmu.interrupts.acknowledge(irq);
                        irq.vector()
                    }
                    None => 0x0000,
                };
            }
            InterruptJump => self.pc = self.ctx.vector,
        }
    }

    fn halt(&mut self, mmu: &Mmu) {
        if self.ime || mmu.interrupts.pending() == 0 {
            self.halted = true;
        } else {
            self.halt_bug = true;
        }
    }

    fn reg(&self, r: Reg8) -> u8 {
        match r {
            Reg8::A => self.a,
            Reg8::B => self.b,
            Reg8::C => self.c,
            Reg8::D => self.d,
            Reg8::E => self.e,
            Reg8::H => self.h,
            Reg8::L => self.l,
        }
    }

    fn set_reg(&mut self, r: Reg8, val: u8) {
        match r {
            Reg8::A => self.a = val,
            Reg8::B => self.b = val,
            Reg8::C => self.c = val,
            Reg8::D => self.d = val,
            Reg8::E => self.e = val,
            Reg8::H => self.h = val,
            Reg8::L => self.l = val,
        }
    }

    fn word(&self, w: Word) -> u16 {
        let pair = |hi: u8, lo: u8| u16::from_be_bytes([hi, lo]);
        match w {
            Word::Af => pair(self.a, self.f),
            Word::Bc => pair(self.b, self.c),
            Word::De => pair(self.d, self.e),
            Word::Hl => pair(self.h, self.l),
            Word::Sp => self.sp,
            Word::Pc => self.pc,
        }
    }

    fn set_word(&mut self, w: Word, val: u16) {
        let [hi, lo] = val.to_be_bytes();
        match w {
            Word::Af => {
                self.a = hi;
                self.f = lo & 0xF0;
            }
            Word::Bc => (self.b, self.c) = (hi, lo),
            Word::De => (self.d, self.e) = (hi, lo),
            Word::Hl => (self.h, self.l) = (hi, lo),
            Word::Sp => self.sp = val,
            Word::Pc => self.pc = val,
        }
    }

    fn address(&mut self, addr: Addr) -> u16 {
        let imm16 = u16::from_le_bytes([self.ctx.u8a, self.ctx.u8b]);
        match addr {
            Addr::Bc => self.word(Word::Bc),
            Addr::De => self.word(Word::De),
            Addr::Hl => self.word(Word::Hl),
            Addr::HlInc => {
                let hl = self.word(Word::Hl);
                self.set_word(Word::Hl, hl.wrapping_add(1));
                hl
            }
            Addr::HlDec => {
                let hl = self.word(Word::Hl);
                self.set_word(Word::Hl, hl.wrapping_sub(1));
                hl
            }
            Addr::Sp => self.sp,
            Addr::Imm16 => imm16,
            Addr::Imm16Next => imm16.wrapping_add(1),
            Addr::HighImm => 0xFF00 | self.ctx.u8a as u16,
            Addr::HighC => 0xFF00 | self.c as u16,
        }
    }

    fn source(&self, src: Src) -> u8 {
        match src {
            Src::Reg(r) => self.reg(r),
            Src::Imm => self.ctx.u8a,
            Src::Mem => self.ctx.m8a,
            Src::High(w) => (self.word(w) >> 8) as u8,
            Src::Low(w) => self.word(w) as u8,
        }
    }

    fn word_source(&self, src: WordSrc) -> u16 {
        match src {
            WordSrc::Imm16 => u16::from_le_bytes([self.ctx.u8a, self.ctx.u8b]),
            WordSrc::Mem16 => u16::from_le_bytes([self.ctx.m8a, self.ctx.m8b]),
            WordSrc::Hl => self.word(Word::Hl),
        }
    }

    fn target(&self, target: Target) -> u8 {
        match target {
            Target::Reg(r) => self.reg(r),
            Target::Mem => self.ctx.m8a,
        }
    }

    fn set_target(&mut self, target: Target, val: u8) {
        match target {
            Target::Reg(r) => self.set_reg(r, val),
            Target::Mem => self.ctx.m8a = val,
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_at(mmu: &mut Mmu, program: &[u8]) -> Cpu {
        for (i, &b) in program.iter().enumerate() {
            mmu.wram[i] = b;
        }
        let mut cpu = Cpu::new();
        cpu.pc = 0xC000;
        cpu
    }

    fn run_instruction(cpu: &mut Cpu, mmu: &mut Mmu) -> u64 {
        let start = cpu.cycles;
        loop {
            cpu.step(mmu);
            mmu.tick();
            if cpu.at_boundary() {
                return cpu.cycles - start;
            }
        }
    }

    #[test]
    fn power_on_registers() {
        let cpu = Cpu::new();
        assert_eq!(
            cpu.debug_state(),
            "AF:01B0 BC:0013 DE:00D8 HL:014D PC:0100 SP:FFFE CY:0"
        );
        assert!(cpu.ime);
    }

    #[test]
    fn pop_af_masks_low_nibble() {
        let mut mmu = Mmu::new();
        // LD BC,$12FF; PUSH BC; POP AF
        let mut cpu = cpu_at(&mut mmu, &[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
        for _ in 0..3 {
            run_instruction(&mut cpu, &mut mmu);
        }
        assert_eq!(cpu.a, 0x12);
        assert_eq!(cpu.f, 0xF0);
    }

    #[test]
    fn prefixed_instruction_reports_full_opcode() {
        let mut mmu = Mmu::new();
        // SWAP A
        let mut cpu = cpu_at(&mut mmu, &[0xCB, 0x37]);
        cpu.a = 0x5A;
        assert_eq!(run_instruction(&mut cpu, &mut mmu), 2);
        assert_eq!(cpu.current_opcode(), Some(0xCB37));
        assert_eq!(cpu.a, 0xA5);
        assert_eq!(cpu.pc, 0xC002);
    }

    #[test]
    fn undefined_opcode_locks() {
        let mut mmu = Mmu::new();
        let mut cpu = cpu_at(&mut mmu, &[0xD3, 0x00]);
        run_instruction(&mut cpu, &mut mmu);
        assert!(cpu.locked);
        let pc = cpu.pc;
        for _ in 0..10 {
            cpu.step(&mut mmu);
        }
        assert_eq!(cpu.pc, pc);
    }
}
