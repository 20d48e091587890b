//! DD/FD-prefixed instructions, including DDCB/FDCB.
//!
//! One handler serves both prefixes; [`Index`] says whether IX or IY stands
//! in for HL.

#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.

use super::{Index, Z80};
use crate::alu;
use crate::bus::Z80Bus;
use crate::decode::{CB, CbKind, CbOp, INDEXED, Op, Operand};
use crate::flags::{CpuFlags, XF, YF};

impl Z80 {
    pub(super) fn execute_indexed<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, index: Index) {
        let opcode = bus.read_opcode_second_byte(self.regs.pc);
        match INDEXED[usize::from(opcode)] {
            // The prefix acts as a NOP and the next call starts afresh at the
            // following byte, so the check bit must stay clear.
            Op::IgnorePrefix => {
                self.regs.inc_r(1);
                self.flags.remove(CpuFlags::CHECK_INTERRUPT);
                self.advance(1);
            }
            Op::PrefixCb => {
                self.regs.inc_r(2);
                self.flags.insert(CpuFlags::CHECK_INTERRUPT);
                self.execute_indexed_cb(bus, index);
            }
            op => {
                self.regs.inc_r(2);
                self.flags.insert(CpuFlags::CHECK_INTERRUPT);
                self.execute(bus, op, index);
            }
        }
    }

    /// `DD CB d op` / `FD CB d op`.
    ///
    /// Only (IX+d) is operated on. For everything except BIT, a non-(HL)
    /// register field also receives a copy of the result.
    fn execute_indexed_cb<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, index: Index) {
        let pc = self.regs.pc;
        let d = bus.read_opcode_byte(pc, 2) as i8;
        let addr = self.index_value(index).wrapping_add_signed(i16::from(d));
        let opcode = bus.read_opcode_byte(pc, 3);
        bus.update_cycles(2);

        let CbOp { kind, operand } = CB[usize::from(opcode)];
        let value = bus.read_memory(addr);
        if let CbKind::Bit(n) = kind {
            // X and Y come from the high byte of the effective address.
            let f = alu::bit(n, value, self.regs.f);
            self.regs.f = (f & !(YF | XF)) | ((addr >> 8) as u8 & (YF | XF));
            bus.update_cycles(1);
        } else {
            let result = self.bit_op(kind, value);
            if let Operand::Reg(reg) = operand {
                self.set_reg8(reg, Index::Hl, result);
            }
            bus.update_cycles(1);
            bus.write_memory(addr, result);
        }
        self.advance(4);
    }
}
