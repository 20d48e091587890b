//! ALU operations for the Z80.
//!
//! Every function is pure: it takes the operands (and the incoming F where
//! some bits survive) and returns the new value with the new flags.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use crate::decode::{AluOp, ShiftOp};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::tables::{daa_index, tables};

/// Result of an ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// Result of a 16-bit ALU operation with flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult16 {
    pub value: u16,
    pub flags: u8,
}

/// Add two bytes with optional carry.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let result16 = u16::from(a) + u16::from(b) + u16::from(carry);
    let result = result16 as u8;

    let overflow = ((a ^ result) & (b ^ result) & 0x80) >> 5;
    let flags = ((a ^ b ^ result) & HF)
        | overflow
        | ((result16 >> 8) as u8 & CF)
        | tables().zero_sign_xy[usize::from(result)];

    AluResult { value: result, flags }
}

/// Subtract two bytes with optional borrow.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let result16 = u16::from(a)
        .wrapping_sub(u16::from(b))
        .wrapping_sub(u16::from(carry));
    let result = result16 as u8;

    let overflow = ((b ^ a) & (result ^ a) & 0x80) >> 5;
    let flags = NF
        | ((a ^ b ^ result) & HF)
        | overflow
        | ((result16 >> 8) as u8 & CF)
        | tables().zero_sign_xy[usize::from(result)];

    AluResult { value: result, flags }
}

/// Compare: flags of `a - b`, with bits 3/5 taken from the operand.
#[must_use]
pub fn cp8(a: u8, b: u8) -> u8 {
    let diff = sub8(a, b, false);
    let zs = tables().zero_sign[usize::from(diff.value)];
    (diff.flags & !(SF | ZF | YF | XF)) | zs | (b & (YF | XF))
}

/// AND: H is always set.
#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: tables().zero_sign_parity[usize::from(value)] | HF }
}

#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: tables().zero_sign_parity[usize::from(value)] }
}

#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: tables().zero_sign_parity[usize::from(value)] }
}

/// One of the eight accumulator operations. `CP` leaves `a` unchanged.
#[must_use]
pub fn alu(op: AluOp, a: u8, b: u8, f: u8) -> AluResult {
    let carry = f & CF != 0;
    match op {
        AluOp::Add => add8(a, b, false),
        AluOp::Adc => add8(a, b, carry),
        AluOp::Sub => sub8(a, b, false),
        AluOp::Sbc => sub8(a, b, carry),
        AluOp::And => and8(a, b),
        AluOp::Xor => xor8(a, b),
        AluOp::Or => or8(a, b),
        AluOp::Cp => AluResult { value: a, flags: cp8(a, b) },
    }
}

/// Increment; carry is preserved.
#[must_use]
pub fn inc8(value: u8, f: u8) -> AluResult {
    let result = value.wrapping_add(1);
    let mut flags = (f & CF) | tables().zero_sign_xy[usize::from(result)];
    if result & 0x0F == 0 {
        flags |= HF;
    }
    if result == 0x80 {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// Decrement; carry is preserved.
#[must_use]
pub fn dec8(value: u8, f: u8) -> AluResult {
    let result = value.wrapping_sub(1);
    let mut flags = (f & CF) | NF | tables().zero_sign_xy[usize::from(result)];
    if value & 0x0F == 0 {
        flags |= HF;
    }
    if value == 0x80 {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// `NEG`: `0 - a`.
#[must_use]
pub fn neg8(a: u8) -> AluResult {
    let result = 0u8.wrapping_sub(a);
    let mut flags = NF | tables().zero_sign_xy[usize::from(result)];
    if a == 0x80 {
        flags |= PF;
    }
    if a != 0 {
        flags |= CF;
    }
    if a & 0x0F != 0 {
        flags |= HF;
    }
    AluResult { value: result, flags }
}

/// `DAA` via the correction table. Returns the new `A` and `F`.
#[must_use]
pub fn daa(a: u8, f: u8) -> AluResult {
    let af = tables().daa[daa_index(a, f)];
    AluResult { value: (af >> 8) as u8, flags: af as u8 }
}

/// The CB-prefixed rotate and shift group. P/V is parity.
#[must_use]
pub fn shift(op: ShiftOp, value: u8, f: u8) -> AluResult {
    let carry_in = f & CF;
    let (result, carry) = match op {
        ShiftOp::Rlc => (value.rotate_left(1), value >> 7),
        ShiftOp::Rrc => (value.rotate_right(1), value & 1),
        ShiftOp::Rl => ((value << 1) | carry_in, value >> 7),
        ShiftOp::Rr => ((value >> 1) | (carry_in << 7), value & 1),
        ShiftOp::Sla => (value << 1, value >> 7),
        ShiftOp::Sra => ((value >> 1) | (value & 0x80), value & 1),
        ShiftOp::Sll => ((value << 1) | 1, value >> 7),
        ShiftOp::Srl => (value >> 1, value & 1),
    };
    AluResult { value: result, flags: carry | tables().zero_sign_parity[usize::from(result)] }
}

/// The accumulator-only rotates (`RLCA`, `RRCA`, `RLA`, `RRA`).
///
/// S, Z and P/V survive; bits 3/5 come from the new accumulator.
#[must_use]
pub fn shift_a(op: ShiftOp, a: u8, f: u8) -> AluResult {
    let rotated = shift(op, a, f);
    let flags = (f & (SF | ZF | PF)) | (rotated.flags & CF) | (rotated.value & (YF | XF));
    AluResult { value: rotated.value, flags }
}

/// `BIT n` on a value already fetched. Bits 3/5 follow the tested result.
#[must_use]
pub fn bit(n: u8, value: u8, f: u8) -> u8 {
    (f & CF) | HF | tables().zero_sign_parity[usize::from(value & (1 << n))]
}

/// `ADD HL,rr` (and the index forms). S, Z and P/V survive.
#[must_use]
pub fn add16(a: u16, b: u16, f: u8) -> AluResult16 {
    let result32 = u32::from(a) + u32::from(b);
    let result = result32 as u16;
    let flags = (f & (SF | ZF | PF))
        | (((a ^ b ^ result) >> 8) as u8 & HF)
        | ((result32 >> 16) as u8 & CF)
        | ((result >> 8) as u8 & (YF | XF));
    AluResult16 { value: result, flags }
}

/// `ADC HL,rr`
#[must_use]
pub fn adc16(a: u16, b: u16, f: u8) -> AluResult16 {
    let result32 = u32::from(a) + u32::from(b) + u32::from(f & CF);
    let result = result32 as u16;
    let overflow = (((a ^ result) & (b ^ result) & 0x8000) >> 13) as u8;
    AluResult16 { value: result, flags: wide_flags(a, b, result, result32, overflow) }
}

/// `SBC HL,rr`
#[must_use]
pub fn sbc16(a: u16, b: u16, f: u8) -> AluResult16 {
    let result32 = u32::from(a)
        .wrapping_sub(u32::from(b))
        .wrapping_sub(u32::from(f & CF));
    let result = result32 as u16;
    let overflow = (((b ^ a) & (result ^ a) & 0x8000) >> 13) as u8;
    AluResult16 { value: result, flags: NF | wide_flags(a, b, result, result32, overflow) }
}

fn wide_flags(a: u16, b: u16, result: u16, result32: u32, overflow: u8) -> u8 {
    let mut flags = overflow
        | (((a ^ b ^ result) >> 8) as u8 & HF)
        | ((result32 >> 16) as u8 & CF)
        | ((result >> 8) as u8 & (SF | YF | XF));
    if result == 0 {
        flags |= ZF;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sets_overflow_on_sign_change() {
        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, SF | HF | PF);
    }

    #[test]
    fn add_with_carry_out() {
        let r = add8(0xFF, 0x00, true);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | HF | CF);
    }

    #[test]
    fn sub_borrow_and_half_borrow() {
        let r = sub8(0x10, 0x01, false);
        assert_eq!(r.value, 0x0F);
        assert_eq!(r.flags, NF | HF | XF);

        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_eq!(r.flags & (CF | SF | NF), CF | SF | NF);
    }

    #[test]
    fn cp_takes_undocumented_bits_from_operand() {
        let f = cp8(0x00, 0x28);
        assert_eq!(f & (YF | XF), YF | XF);
        assert_eq!(f & CF, CF);
        let f = cp8(0x42, 0x42);
        assert_eq!(f & (ZF | NF), ZF | NF);
    }

    #[test]
    fn inc_dec_keep_carry() {
        let r = inc8(0x7F, CF);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags, CF | SF | HF | PF);

        let r = dec8(0x01, 0);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | NF);

        let r = dec8(0x80, CF);
        assert_eq!(r.value, 0x7F);
        assert_eq!(r.flags, CF | NF | HF | PF | YF | XF);
    }

    #[test]
    fn neg_of_0x80_overflows() {
        let r = neg8(0x80);
        assert_eq!(r.value, 0x80);
        assert_eq!(r.flags & (PF | CF | NF | SF), PF | CF | NF | SF);
        let r = neg8(0x00);
        assert_eq!(r.flags, NF | ZF);
    }

    #[test]
    fn logic_parity() {
        assert_eq!(and8(0xF0, 0x0F).flags, ZF | PF | HF);
        assert_eq!(xor8(0xFF, 0x01).flags, SF | YF | XF);
        assert_eq!(or8(0x00, 0x03).flags, PF);
    }

    #[test]
    fn sll_shifts_in_one() {
        let r = shift(ShiftOp::Sll, 0x80, 0);
        assert_eq!(r.value, 0x01);
        assert_eq!(r.flags, CF);
    }

    #[test]
    fn rla_keeps_sign_zero_parity() {
        let r = shift_a(ShiftOp::Rl, 0x80, ZF | PF | SF);
        assert_eq!(r.value, 0x00);
        assert_eq!(r.flags, ZF | PF | SF | CF);
    }

    #[test]
    fn bit_reports_zero_for_clear_bit() {
        let f = bit(7, 0x7F, CF);
        assert_eq!(f, CF | HF | ZF | PF);
        let f = bit(7, 0x80, 0);
        assert_eq!(f, HF | SF);
    }

    #[test]
    fn wide_add_and_subtract() {
        let r = add16(0x0FFF, 0x0001, SF | ZF | PF | NF);
        assert_eq!(r.value, 0x1000);
        assert_eq!(r.flags, SF | ZF | PF | HF);

        let r = sbc16(0x0000, 0x0001, 0);
        assert_eq!(r.value, 0xFFFF);
        assert_eq!(r.flags & (SF | CF | NF | ZF), SF | CF | NF);

        let r = adc16(0x7FFF, 0x0000, CF);
        assert_eq!(r.value, 0x8000);
        assert_eq!(r.flags & (PF | SF), PF | SF);
    }
}
