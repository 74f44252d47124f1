//! Opcode tables. Every instruction is a list of steps, one per M-cycle, and
//! each step is a short list of micro-ops executed in order.

use std::sync::OnceLock;

use super::{FLAG_C, FLAG_Z};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
}

/// 16-bit register views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Af,
    Bc,
    De,
    Hl,
    Sp,
    Pc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz,
    Z,
    Nc,
    C,
}

impl Cond {
    pub fn holds(self, flags: u8) -> bool {
        match self {
            Cond::Nz => flags & FLAG_Z == 0,
            Cond::Z => flags & FLAG_Z != 0,
            Cond::Nc => flags & FLAG_C == 0,
            Cond::C => flags & FLAG_C != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

/// Operations from the 0xCB page. The first eight also back the
/// accumulator rotates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbOp {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit(u8),
    Res(u8),
    Set(u8),
}

/// Memory operand address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addr {
    Bc,
    De,
    Hl,
    /// HL, then increment HL.
    HlInc,
    /// HL, then decrement HL.
    HlDec,
    Sp,
    /// Operand bytes u8b:u8a.
    Imm16,
    /// Operand bytes u8b:u8a, plus one.
    Imm16Next,
    /// 0xFF00 + u8a.
    HighImm,
    /// 0xFF00 + C.
    HighC,
}

/// Source of an 8-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Src {
    Reg(Reg8),
    /// Operand byte u8a.
    Imm,
    /// Scratch slot m8a.
    Mem,
    High(Word),
    Low(Word),
}

/// Destination of a byte read from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dst {
    Reg(Reg8),
    MemA,
    MemB,
}

/// Operand of an in-place 8-bit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Reg(Reg8),
    /// Scratch slot m8a, written back by a later micro-op.
    Mem,
}

/// Source of a 16-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordSrc {
    /// Operand bytes u8b:u8a.
    Imm16,
    /// Scratch slots m8b:m8a.
    Mem16,
    Hl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicroOp {
    Nop,
    ReadParamA,
    ReadParamB,
    Read(Addr, Dst),
    Write(Addr, Src),
    Load(Reg8, Src),
    LoadWord(Word, WordSrc),
    Alu(AluOp, Src),
    Inc(Target),
    Dec(Target),
    IncWord(Word),
    DecWord(Word),
    AddHl(Word),
    AddSp,
    LoadHlSp,
    RotateA(CbOp),
    Prefixed(CbOp, Target),
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jump(WordSrc),
    JumpRelative,
    Restart(u8),
    Di,
    Ei,
    Reti,
    Halt,
    Stop,
    Breakpoint,
    Lock,
    InterruptEnter,
    InterruptAck,
    InterruptJump,
}

/// When an instruction is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// After its last step.
    Length,
    /// Early, after `checkpoint` steps, when `cond` does not hold.
    Branch { checkpoint: u8, cond: Cond },
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub mnemonic: String,
    pub steps: Vec<Vec<MicroOp>>,
    pub finish: Finish,
}

impl Instruction {
    fn new(mnemonic: impl Into<String>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            steps: Vec::new(),
            finish: Finish::Length,
        }
    }

    fn step(mut self, ops: &[MicroOp]) -> Self {
        self.steps.push(ops.to_vec());
        self
    }

    /// A filler M-cycle; the opcode fetch occupies the first one.
    fn idle(self) -> Self {
        self.step(&[MicroOp::Nop])
    }

    fn branch(mut self, checkpoint: u8, cond: Cond) -> Self {
        self.finish = Finish::Branch { checkpoint, cond };
        self
    }

    /// Whether the instruction is over after `done` steps, given flags F.
    pub fn finished(&self, done: usize, flags: u8) -> bool {
        if done >= self.steps.len() {
            return true;
        }
        match self.finish {
            Finish::Length => false,
            Finish::Branch { checkpoint, cond } => {
                done == checkpoint as usize && !cond.holds(flags)
            }
        }
    }
}

pub struct OpcodeTables {
    pub primary: Vec<Instruction>,
    pub prefixed: Vec<Instruction>,
    /// Leaving HALT with IME off.
    pub wake: Instruction,
    pub interrupt: Instruction,
    /// Interrupt taken while halted: one extra M-cycle.
    pub interrupt_from_halt: Instruction,
}

pub fn tables() -> &'static OpcodeTables {
    static TABLES: OnceLock<OpcodeTables> = OnceLock::new();
    TABLES.get_or_init(OpcodeTables::build)
}

pub const UNDEFINED_OPCODES: [u8; 11] = [
    0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
];

const R8_NAMES: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const R16_NAMES: [&str; 4] = ["BC", "DE", "HL", "SP"];
const STACK_NAMES: [&str; 4] = ["BC", "DE", "HL", "AF"];
const COND_NAMES: [&str; 4] = ["NZ", "Z", "NC", "C"];
const ALU_NAMES: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];
const SHIFT_NAMES: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SWAP", "SRL"];

/// Register encoded in the low three bits of an opcode; `None` is (HL).
fn operand(bits: u8) -> Option<Reg8> {
    match bits & 0x07 {
        0 => Some(Reg8::B),
        1 => Some(Reg8::C),
        2 => Some(Reg8::D),
        3 => Some(Reg8::E),
        4 => Some(Reg8::H),
        5 => Some(Reg8::L),
        6 => None,
        _ => Some(Reg8::A),
    }
}

fn pair(bits: u8) -> Word {
    [Word::Bc, Word::De, Word::Hl, Word::Sp][(bits & 0x03) as usize]
}

fn stack_pair(bits: u8) -> Word {
    [Word::Bc, Word::De, Word::Hl, Word::Af][(bits & 0x03) as usize]
}

fn cond(bits: u8) -> Cond {
    [Cond::Nz, Cond::Z, Cond::Nc, Cond::C][(bits & 0x03) as usize]
}

fn alu_op(bits: u8) -> AluOp {
    use AluOp::*;
    [Add, Adc, Sub, Sbc, And, Xor, Or, Cp][(bits & 0x07) as usize]
}

fn shift_op(bits: u8) -> CbOp {
    use CbOp::*;
    [Rlc, Rrc, Rl, Rr, Sla, Sra, Swap, Srl][(bits & 0x07) as usize]
}

impl OpcodeTables {
    fn build() -> Self {
        use MicroOp::*;

        let interrupt = Instruction::new("INT")
            .step(&[InterruptEnter])
            .step(&[DecWord(Word::Sp)])
            .step(&[Write(Addr::Sp, Src::High(Word::Pc)), DecWord(Word::Sp)])
            .step(&[InterruptAck, Write(Addr::Sp, Src::Low(Word::Pc))])
            .step(&[InterruptJump]);
        let mut interrupt_from_halt = Instruction::new("INT (HALT)").idle();
        interrupt_from_halt.steps.extend(interrupt.steps.iter().cloned());

        Self {
            primary: (0..=255u8).map(primary).collect(),
            prefixed: (0..=255u8).map(prefixed).collect(),
            wake: Instruction::new("WAKE").idle(),
            interrupt,
            interrupt_from_halt,
        }
    }
}

/// CALL/RST tail: push PC high then low, then jump.
fn push_pc(instr: Instruction, jump: MicroOp) -> Instruction {
    use MicroOp::*;
    instr
        .step(&[DecWord(Word::Sp)])
        .step(&[Write(Addr::Sp, Src::High(Word::Pc)), DecWord(Word::Sp)])
        .step(&[Write(Addr::Sp, Src::Low(Word::Pc)), jump])
}

/// RET tail: pop into m8a/m8b.
fn pop_pc(instr: Instruction) -> Instruction {
    use MicroOp::*;
    instr
        .step(&[Read(Addr::Sp, Dst::MemA), IncWord(Word::Sp)])
        .step(&[Read(Addr::Sp, Dst::MemB), IncWord(Word::Sp)])
}

fn primary(op: u8) -> Instruction {
    use MicroOp::*;

    if UNDEFINED_OPCODES.contains(&op) {
        return Instruction::new(format!("DB ${op:02X}")).step(&[Lock]);
    }

    let y = (op >> 3) & 0x07;
    let p = (op >> 4) & 0x03;

    match op {
        0x00 => Instruction::new("NOP").idle(),
        0x01 | 0x11 | 0x21 | 0x31 => Instruction::new(format!("LD {},d16", R16_NAMES[p as usize]))
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB, LoadWord(pair(p), WordSrc::Imm16)]),
        0x02 | 0x12 | 0x22 | 0x32 => {
            let (addr, name) = indirect(p);
            Instruction::new(format!("LD ({name}),A"))
                .idle()
                .step(&[Write(addr, Src::Reg(Reg8::A))])
        }
        0x0A | 0x1A | 0x2A | 0x3A => {
            let (addr, name) = indirect(p);
            Instruction::new(format!("LD A,({name})"))
                .idle()
                .step(&[Read(addr, Dst::Reg(Reg8::A))])
        }
        0x03 | 0x13 | 0x23 | 0x33 => Instruction::new(format!("INC {}", R16_NAMES[p as usize]))
            .idle()
            .step(&[IncWord(pair(p))]),
        0x0B | 0x1B | 0x2B | 0x3B => Instruction::new(format!("DEC {}", R16_NAMES[p as usize]))
            .idle()
            .step(&[DecWord(pair(p))]),
        0x09 | 0x19 | 0x29 | 0x39 => {
            Instruction::new(format!("ADD HL,{}", R16_NAMES[p as usize]))
                .idle()
                .step(&[AddHl(pair(p))])
        }
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
            let name = format!("INC {}", R8_NAMES[y as usize]);
            match operand(y) {
                Some(r) => Instruction::new(name).step(&[Inc(Target::Reg(r))]),
                None => Instruction::new(name)
                    .idle()
                    .step(&[Read(Addr::Hl, Dst::MemA)])
                    .step(&[Inc(Target::Mem), Write(Addr::Hl, Src::Mem)]),
            }
        }
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
            let name = format!("DEC {}", R8_NAMES[y as usize]);
            match operand(y) {
                Some(r) => Instruction::new(name).step(&[Dec(Target::Reg(r))]),
                None => Instruction::new(name)
                    .idle()
                    .step(&[Read(Addr::Hl, Dst::MemA)])
                    .step(&[Dec(Target::Mem), Write(Addr::Hl, Src::Mem)]),
            }
        }
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
            let name = format!("LD {},d8", R8_NAMES[y as usize]);
            match operand(y) {
                Some(r) => Instruction::new(name)
                    .idle()
                    .step(&[ReadParamA, Load(r, Src::Imm)]),
                None => Instruction::new(name)
                    .idle()
                    .step(&[ReadParamA])
                    .step(&[Write(Addr::Hl, Src::Imm)]),
            }
        }
        0x07 => Instruction::new("RLCA").step(&[RotateA(CbOp::Rlc)]),
        0x0F => Instruction::new("RRCA").step(&[RotateA(CbOp::Rrc)]),
        0x17 => Instruction::new("RLA").step(&[RotateA(CbOp::Rl)]),
        0x1F => Instruction::new("RRA").step(&[RotateA(CbOp::Rr)]),
        0x08 => Instruction::new("LD (a16),SP")
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB])
            .step(&[Write(Addr::Imm16, Src::Low(Word::Sp))])
            .step(&[Write(Addr::Imm16Next, Src::High(Word::Sp))]),
        0x10 => Instruction::new("STOP").step(&[Stop]),
        0x18 => Instruction::new("JR r8")
            .idle()
            .step(&[ReadParamA])
            .step(&[JumpRelative]),
        0x20 | 0x28 | 0x30 | 0x38 => Instruction::new(format!("JR {},r8", COND_NAMES[(y & 3) as usize]))
            .idle()
            .step(&[ReadParamA])
            .step(&[JumpRelative])
            .branch(2, cond(y)),
        0x27 => Instruction::new("DAA").step(&[Daa]),
        0x2F => Instruction::new("CPL").step(&[Cpl]),
        0x37 => Instruction::new("SCF").step(&[Scf]),
        0x3F => Instruction::new("CCF").step(&[Ccf]),
        0x76 => Instruction::new("HALT").step(&[Halt]),
        0x40 => Instruction::new("LD B,B").step(&[Breakpoint]),
        0x40..=0x7F => {
            let name = format!("LD {},{}", R8_NAMES[y as usize], R8_NAMES[(op & 7) as usize]);
            match (operand(y), operand(op)) {
                (Some(dst), Some(src)) => Instruction::new(name).step(&[Load(dst, Src::Reg(src))]),
                (Some(dst), None) => Instruction::new(name)
                    .idle()
                    .step(&[Read(Addr::Hl, Dst::Reg(dst))]),
                (None, Some(src)) => Instruction::new(name)
                    .idle()
                    .step(&[Write(Addr::Hl, Src::Reg(src))]),
                (None, None) => unreachable!("0x76 is HALT"),
            }
        }
        0x80..=0xBF => {
            let alu = alu_op(y);
            let name = format!("{}{}", ALU_NAMES[y as usize], R8_NAMES[(op & 7) as usize]);
            match operand(op) {
                Some(src) => Instruction::new(name).step(&[Alu(alu, Src::Reg(src))]),
                None => Instruction::new(name)
                    .idle()
                    .step(&[Read(Addr::Hl, Dst::MemA), Alu(alu, Src::Mem)]),
            }
        }
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            Instruction::new(format!("{}d8", ALU_NAMES[y as usize]))
                .idle()
                .step(&[ReadParamA, Alu(alu_op(y), Src::Imm)])
        }
        0xC0 | 0xC8 | 0xD0 | 0xD8 => {
            let ret = Instruction::new(format!("RET {}", COND_NAMES[(y & 3) as usize]))
                .idle()
                .idle();
            pop_pc(ret).step(&[Jump(WordSrc::Mem16)]).branch(2, cond(y))
        }
        0xC9 => pop_pc(Instruction::new("RET").idle()).step(&[Jump(WordSrc::Mem16)]),
        0xD9 => pop_pc(Instruction::new("RETI").idle()).step(&[Jump(WordSrc::Mem16), Reti]),
        0xC1 | 0xD1 | 0xE1 | 0xF1 => {
            Instruction::new(format!("POP {}", STACK_NAMES[p as usize]))
                .idle()
                .step(&[Read(Addr::Sp, Dst::MemA), IncWord(Word::Sp)])
                .step(&[
                    Read(Addr::Sp, Dst::MemB),
                    IncWord(Word::Sp),
                    LoadWord(stack_pair(p), WordSrc::Mem16),
                ])
        }
        0xC5 | 0xD5 | 0xE5 | 0xF5 => {
            let rr = stack_pair(p);
            Instruction::new(format!("PUSH {}", STACK_NAMES[p as usize]))
                .idle()
                .step(&[DecWord(Word::Sp)])
                .step(&[Write(Addr::Sp, Src::High(rr)), DecWord(Word::Sp)])
                .step(&[Write(Addr::Sp, Src::Low(rr))])
        }
        0xC3 => Instruction::new("JP a16")
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB])
            .step(&[Jump(WordSrc::Imm16)]),
        0xC2 | 0xCA | 0xD2 | 0xDA => Instruction::new(format!("JP {},a16", COND_NAMES[(y & 3) as usize]))
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB])
            .step(&[Jump(WordSrc::Imm16)])
            .branch(3, cond(y)),
        0xCD => {
            let call = Instruction::new("CALL a16")
                .idle()
                .step(&[ReadParamA])
                .step(&[ReadParamB]);
            push_pc(call, Jump(WordSrc::Imm16))
        }
        0xC4 | 0xCC | 0xD4 | 0xDC => {
            let call = Instruction::new(format!("CALL {},a16", COND_NAMES[(y & 3) as usize]))
                .idle()
                .step(&[ReadParamA])
                .step(&[ReadParamB]);
            push_pc(call, Jump(WordSrc::Imm16)).branch(3, cond(y))
        }
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            let vector = y * 8;
            push_pc(Instruction::new(format!("RST {vector:02X}H")).idle(), Restart(vector))
        }
        0xCB => Instruction::new("PREFIX CB").idle(),
        0xE0 => Instruction::new("LDH (a8),A")
            .idle()
            .step(&[ReadParamA])
            .step(&[Write(Addr::HighImm, Src::Reg(Reg8::A))]),
        0xF0 => Instruction::new("LDH A,(a8)")
            .idle()
            .step(&[ReadParamA])
            .step(&[Read(Addr::HighImm, Dst::Reg(Reg8::A))]),
        0xE2 => Instruction::new("LD (C),A")
            .idle()
            .step(&[Write(Addr::HighC, Src::Reg(Reg8::A))]),
        0xF2 => Instruction::new("LD A,(C)")
            .idle()
            .step(&[Read(Addr::HighC, Dst::Reg(Reg8::A))]),
        0xEA => Instruction::new("LD (a16),A")
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB])
            .step(&[Write(Addr::Imm16, Src::Reg(Reg8::A))]),
        0xFA => Instruction::new("LD A,(a16)")
            .idle()
            .step(&[ReadParamA])
            .step(&[ReadParamB])
            .step(&[Read(Addr::Imm16, Dst::Reg(Reg8::A))]),
        0xE8 => Instruction::new("ADD SP,r8")
            .idle()
            .step(&[ReadParamA])
            .idle()
            .step(&[AddSp]),
        0xF8 => Instruction::new("LD HL,SP+r8")
            .idle()
            .step(&[ReadParamA])
            .step(&[LoadHlSp]),
        0xE9 => Instruction::new("JP HL").step(&[Jump(WordSrc::Hl)]),
        0xF9 => Instruction::new("LD SP,HL")
            .idle()
            .step(&[LoadWord(Word::Sp, WordSrc::Hl)]),
        0xF3 => Instruction::new("DI").step(&[Di]),
        0xFB => Instruction::new("EI").step(&[Ei]),
        _ => unreachable!("opcode {op:#04X} is covered above"),
    }
}

fn indirect(p: u8) -> (Addr, &'static str) {
    match p {
        0 => (Addr::Bc, "BC"),
        1 => (Addr::De, "DE"),
        2 => (Addr::HlInc, "HL+"),
        _ => (Addr::HlDec, "HL-"),
    }
}

fn prefixed(op: u8) -> Instruction {
    use MicroOp::*;

    let bit = (op >> 3) & 0x07;
    let (cb, name) = match op >> 6 {
        0 => (shift_op(bit), SHIFT_NAMES[bit as usize].to_string()),
        1 => (CbOp::Bit(bit), format!("BIT {bit},")),
        2 => (CbOp::Res(bit), format!("RES {bit},")),
        _ => (CbOp::Set(bit), format!("SET {bit},")),
    };
    let name = if op >> 6 == 0 {
        format!("{name} {}", R8_NAMES[(op & 7) as usize])
    } else {
        format!("{name}{}", R8_NAMES[(op & 7) as usize])
    };

    match operand(op) {
        Some(r) => Instruction::new(name).idle().step(&[Prefixed(cb, Target::Reg(r))]),
        None if matches!(cb, CbOp::Bit(_)) => Instruction::new(name)
            .idle()
            .idle()
            .step(&[Read(Addr::Hl, Dst::MemA), Prefixed(cb, Target::Mem)]),
        None => Instruction::new(name)
            .idle()
            .idle()
            .step(&[Read(Addr::Hl, Dst::MemA)])
            .step(&[Prefixed(cb, Target::Mem), Write(Addr::Hl, Src::Mem)]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycles(instr: &Instruction) -> usize {
        instr.steps.len()
    }

    #[test]
    fn stack_instruction_lengths() {
        let t = tables();
        assert_eq!(cycles(&t.primary[0xC9]), 4);
        assert_eq!(cycles(&t.primary[0xCD]), 6);
        assert_eq!(cycles(&t.primary[0xC5]), 4);
        assert_eq!(cycles(&t.primary[0xC1]), 3);
        assert_eq!(cycles(&t.primary[0xFF]), 4);
        assert_eq!(cycles(&t.interrupt), 5);
        assert_eq!(cycles(&t.interrupt_from_halt), 6);
        assert_eq!(cycles(&t.wake), 1);
    }

    #[test]
    fn prefixed_hl_forms_take_extra_cycles() {
        let t = tables();
        assert_eq!(cycles(&t.prefixed[0x00]), 2);
        assert_eq!(cycles(&t.prefixed[0x46]), 3);
        assert_eq!(cycles(&t.prefixed[0x06]), 4);
        assert_eq!(cycles(&t.prefixed[0xFE]), 4);
    }

    #[test]
    fn branches_exit_at_checkpoint() {
        let t = tables();
        let jr_nz = &t.primary[0x20];
        assert!(jr_nz.finished(2, FLAG_Z));
        assert!(!jr_nz.finished(2, 0));
        assert!(jr_nz.finished(3, 0));
    }

    #[test]
    fn mnemonics() {
        let t = tables();
        assert_eq!(t.primary[0x7E].mnemonic, "LD A,(HL)");
        assert_eq!(t.primary[0xAF].mnemonic, "XOR A");
        assert_eq!(t.primary[0xEF].mnemonic, "RST 28H");
        assert_eq!(t.prefixed[0x37].mnemonic, "SWAP A");
        assert_eq!(t.prefixed[0x7C].mnemonic, "BIT 7,H");
        assert_eq!(t.primary[0xDD].mnemonic, "DB $DD");
    }
}
