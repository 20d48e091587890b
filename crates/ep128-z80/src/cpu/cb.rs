//! CB-prefixed rotates, shifts and bit operations.

use super::{Index, Z80};
use crate::alu;
use crate::bus::Z80Bus;
use crate::decode::{CB, CbKind, CbOp, Operand};
use crate::flags::CpuFlags;

impl Z80 {
    pub(super) fn execute_cb<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let opcode = bus.read_opcode_second_byte(self.regs.pc);
        self.regs.inc_r(2);
        self.flags.insert(CpuFlags::CHECK_INTERRUPT);

        let CbOp { kind, operand } = CB[usize::from(opcode)];
        match (kind, operand) {
            (CbKind::Bit(n), Operand::Reg(reg)) => {
                self.regs.f = alu::bit(n, self.reg8(reg, Index::Hl), self.regs.f);
            }
            (CbKind::Bit(n), Operand::Mem) => {
                let value = bus.read_memory(self.regs.hl());
                self.regs.f = alu::bit(n, value, self.regs.f);
                bus.update_cycles(1);
            }
            (_, Operand::Reg(reg)) => {
                let value = self.bit_op(kind, self.reg8(reg, Index::Hl));
                self.set_reg8(reg, Index::Hl, value);
            }
            (_, Operand::Mem) => {
                let addr = self.regs.hl();
                let value = bus.read_memory(addr);
                let value = self.bit_op(kind, value);
                bus.update_cycles(1);
                bus.write_memory(addr, value);
            }
        }
        self.advance(2);
    }

    /// Apply a rotate/shift/RES/SET, updating F for the shifts.
    pub(super) fn bit_op(&mut self, kind: CbKind, value: u8) -> u8 {
        match kind {
            CbKind::Shift(op) => {
                let result = alu::shift(op, value, self.regs.f);
                self.regs.f = result.flags;
                result.value
            }
            CbKind::Res(n) => value & !(1 << n),
            CbKind::Set(n) => value | (1 << n),
            CbKind::Bit(_) => value,
        }
    }
}
