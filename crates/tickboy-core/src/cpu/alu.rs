use super::ops::{AluOp, CbOp};
use super::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

fn zero(val: u8) -> u8 {
    if val == 0 { FLAG_Z } else { 0 }
}

/// Eight-bit arithmetic on the accumulator. Returns (A, F); CP leaves A as is.
pub fn alu(op: AluOp, a: u8, val: u8, f: u8) -> (u8, u8) {
    let carry = u8::from(f & FLAG_C != 0);
    match op {
        AluOp::Add | AluOp::Adc => {
            let c = if op == AluOp::Adc { carry } else { 0 };
            let sum = a as u16 + val as u16 + c as u16;
            let r = sum as u8;
            let mut flags = zero(r);
            if (a & 0x0F) + (val & 0x0F) + c > 0x0F {
                flags |= FLAG_H;
            }
            if sum > 0xFF {
                flags |= FLAG_C;
            }
            (r, flags)
        }
        AluOp::Sub | AluOp::Sbc | AluOp::Cp => {
            let c = if op == AluOp::Sbc { carry } else { 0 };
            let r = a.wrapping_sub(val).wrapping_sub(c);
            let mut flags = zero(r) | FLAG_N;
            if (a & 0x0F) < (val & 0x0F) + c {
                flags |= FLAG_H;
            }
            if (a as u16) < val as u16 + c as u16 {
                flags |= FLAG_C;
            }
            if op == AluOp::Cp { (a, flags) } else { (r, flags) }
        }
        AluOp::And => {
            let r = a & val;
            (r, zero(r) | FLAG_H)
        }
        AluOp::Xor => {
            let r = a ^ val;
            (r, zero(r))
        }
        AluOp::Or => {
            let r = a | val;
            (r, zero(r))
        }
    }
}

pub fn inc8(val: u8, f: u8) -> (u8, u8) {
    let r = val.wrapping_add(1);
    let mut flags = zero(r) | (f & FLAG_C);
    if val & 0x0F == 0x0F {
        flags |= FLAG_H;
    }
    (r, flags)
}

pub fn dec8(val: u8, f: u8) -> (u8, u8) {
    let r = val.wrapping_sub(1);
    let mut flags = zero(r) | FLAG_N | (f & FLAG_C);
    if val & 0x0F == 0 {
        flags |= FLAG_H;
    }
    (r, flags)
}

/// ADD HL,rr: Z is preserved, H and C come from bits 11 and 15.
pub fn add_hl(hl: u16, val: u16, f: u8) -> (u16, u8) {
    let (r, carry) = hl.overflowing_add(val);
    let mut flags = f & FLAG_Z;
    if (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF {
        flags |= FLAG_H;
    }
    if carry {
        flags |= FLAG_C;
    }
    (r, flags)
}

/// SP plus a signed offset, as used by ADD SP,r8 and LD HL,SP+r8. H and C
/// are computed from the unsigned add of the low byte.
pub fn sp_offset(sp: u16, offset: u8) -> (u16, u8) {
    let r = sp.wrapping_add(offset as i8 as i16 as u16);
    let mut flags = 0;
    if (sp & 0x0F) + (offset as u16 & 0x0F) > 0x0F {
        flags |= FLAG_H;
    }
    if (sp & 0xFF) + offset as u16 > 0xFF {
        flags |= FLAG_C;
    }
    (r, flags)
}

/// A 0xCB-page operation on `val`. BIT leaves the value untouched and RES/SET
/// leave the flags untouched.
pub fn prefixed(op: CbOp, val: u8, f: u8) -> (u8, u8) {
    let carry_in = f & FLAG_C != 0;
    let (r, carry_out) = match op {
        CbOp::Rlc => (val.rotate_left(1), val & 0x80 != 0),
        CbOp::Rrc => (val.rotate_right(1), val & 0x01 != 0),
        CbOp::Rl => ((val << 1) | u8::from(carry_in), val & 0x80 != 0),
        CbOp::Rr => ((val >> 1) | (u8::from(carry_in) << 7), val & 0x01 != 0),
        CbOp::Sla => (val << 1, val & 0x80 != 0),
        CbOp::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
        CbOp::Swap => (val.rotate_left(4), false),
        CbOp::Srl => (val >> 1, val & 0x01 != 0),
        CbOp::Bit(bit) => {
            let flags = zero(val & (1 << bit)) | FLAG_H | (f & FLAG_C);
            return (val, flags);
        }
        CbOp::Res(bit) => return (val & !(1 << bit), f),
        CbOp::Set(bit) => return (val | (1 << bit), f),
    };
    let flags = zero(r) | if carry_out { FLAG_C } else { 0 };
    (r, flags)
}

/// Decimal adjust after an 8-bit add or subtract.
pub fn daa(a: u8, f: u8) -> (u8, u8) {
    let mut adjust = 0u8;
    let mut carry = false;
    if f & FLAG_N == 0 {
        if f & FLAG_C != 0 || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        if f & FLAG_H != 0 || a & 0x0F > 0x09 {
            adjust |= 0x06;
        }
        let r = a.wrapping_add(adjust);
        (r, zero(r) | if carry { FLAG_C } else { 0 })
    } else {
        if f & FLAG_C != 0 {
            adjust |= 0x60;
            carry = true;
        }
        if f & FLAG_H != 0 {
            adjust |= 0x06;
        }
        let r = a.wrapping_sub(adjust);
        (r, zero(r) | FLAG_N | if carry { FLAG_C } else { 0 })
    }
}
