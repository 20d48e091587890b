//! Unprefixed instructions, and their DD/FD forms.
//!
//! Operands are read at fixed offsets from the opcode's PC and PC is
//! advanced once the instruction is done. Under DD/FD every offset after the
//! opcode moves up by one, and (IX+d) adds the displacement byte.

#![allow(clippy::cast_possible_wrap)] // Intentional i8 casts for displacements.

use log::error;

use super::{Index, Z80};
use crate::alu;
use crate::bus::Z80Bus;
use crate::decode::{AluOp, Op, Operand};
use crate::flags::{CF, CpuFlags, HF, NF, PF, SF, XF, YF, ZF};

impl Z80 {
    /// Execute a decoded operation. R and the interrupt check bit have
    /// already been dealt with by the caller.
    pub(super) fn execute<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, op: Op, index: Index) {
        let pc = self.regs.pc;
        let prefix = index.prefix_len();
        // Length of a (HL)/(IX+d) form: the displacement exists only with a prefix.
        let mem_len = 1 + prefix * 2;

        match op {
            Op::Nop => self.advance(1),

            // === 8-bit loads ===
            Op::Ld(Operand::Reg(dst), Operand::Reg(src)) => {
                let value = self.reg8(src, index);
                self.set_reg8(dst, index, value);
                self.advance(1 + prefix);
            }
            Op::Ld(Operand::Reg(dst), Operand::Mem) => {
                let addr = self.operand_address(bus, index);
                let value = bus.read_memory(addr);
                // The register side is always the real H/L here.
                self.set_reg8(dst, Index::Hl, value);
                self.advance(mem_len);
            }
            Op::Ld(Operand::Mem, Operand::Reg(src)) => {
                let addr = self.operand_address(bus, index);
                let value = self.reg8(src, Index::Hl);
                bus.write_memory(addr, value);
                self.advance(mem_len);
            }
            Op::Halt => self.flags.insert(CpuFlags::HALTED),
            Op::LdImm(Operand::Reg(reg)) => {
                let value = bus.read_opcode_byte(pc, 1 + prefix);
                self.set_reg8(reg, index, value);
                self.advance(2 + prefix);
            }
            Op::LdImm(Operand::Mem) => {
                let addr = match index {
                    Index::Hl => self.regs.hl(),
                    Index::Ix | Index::Iy => {
                        let d = bus.read_opcode_byte(pc, 2) as i8;
                        self.index_value(index).wrapping_add_signed(i16::from(d))
                    }
                };
                let value = bus.read_opcode_byte(pc, 1 + prefix * 2);
                if prefix != 0 {
                    bus.update_cycles(2);
                }
                bus.write_memory(addr, value);
                self.advance(2 + prefix * 2);
            }
            Op::StoreAIndirect(pair) => {
                bus.write_memory(self.pair(pair, Index::Hl), self.regs.a);
                self.advance(1);
            }
            Op::LoadAIndirect(pair) => {
                self.regs.a = bus.read_memory(self.pair(pair, Index::Hl));
                self.advance(1);
            }
            Op::StoreAAbsolute => {
                let addr = bus.read_opcode_word(pc, 1);
                bus.write_memory(addr, self.regs.a);
                self.advance(3);
            }
            Op::LoadAAbsolute => {
                let addr = bus.read_opcode_word(pc, 1);
                self.regs.a = bus.read_memory(addr);
                self.advance(3);
            }

            // === 16-bit loads ===
            Op::LdPairImm(pair) => {
                let value = bus.read_opcode_word(pc, 1 + prefix);
                self.set_pair(pair, index, value);
                self.advance(3 + prefix);
            }
            Op::StoreHlAbsolute => {
                let addr = bus.read_opcode_word(pc, 1 + prefix);
                bus.write_memory_word(addr, self.index_value(index));
                self.advance(3 + prefix);
            }
            Op::LoadHlAbsolute => {
                let addr = bus.read_opcode_word(pc, 1 + prefix);
                let value = bus.read_memory_word(addr);
                self.set_index_value(index, value);
                self.advance(3 + prefix);
            }
            Op::LdSpHl => {
                self.regs.sp = self.index_value(index);
                bus.update_cycles(2);
                self.advance(1 + prefix);
            }
            Op::Push(pair) => {
                self.push(bus, self.stack_pair(pair, index));
                self.advance(1 + prefix);
            }
            Op::Pop(pair) => {
                let value = self.pop(bus);
                self.set_stack_pair(pair, index, value);
                self.advance(1 + prefix);
            }

            // === Exchanges ===
            Op::ExAfAf => {
                self.regs.exchange_af();
                self.advance(1);
            }
            Op::Exx => {
                self.regs.exchange_pairs();
                self.advance(1);
            }
            Op::ExDeHl => {
                let de = self.regs.de();
                self.regs.set_de(self.regs.hl());
                self.regs.set_hl(de);
                self.advance(1);
            }
            Op::ExSpHl => {
                let value = self.pop(bus);
                self.push(bus, self.index_value(index));
                self.set_index_value(index, value);
                bus.update_cycles(2);
                self.advance(1 + prefix);
            }

            // === 8-bit arithmetic ===
            Op::Alu(alu_op, Operand::Reg(reg)) => {
                let value = self.reg8(reg, index);
                self.alu_a(alu_op, value);
                self.advance(1 + prefix);
            }
            Op::Alu(alu_op, Operand::Mem) => {
                let addr = self.operand_address(bus, index);
                let value = bus.read_memory(addr);
                self.alu_a(alu_op, value);
                self.advance(mem_len);
            }
            Op::AluImm(alu_op) => {
                let value = bus.read_opcode_byte(pc, 1);
                self.alu_a(alu_op, value);
                self.advance(2);
            }
            Op::Inc(Operand::Reg(reg)) => {
                let result = alu::inc8(self.reg8(reg, index), self.regs.f);
                self.set_reg8(reg, index, result.value);
                self.regs.f = result.flags;
                self.advance(1 + prefix);
            }
            Op::Dec(Operand::Reg(reg)) => {
                let result = alu::dec8(self.reg8(reg, index), self.regs.f);
                self.set_reg8(reg, index, result.value);
                self.regs.f = result.flags;
                self.advance(1 + prefix);
            }
            Op::Inc(Operand::Mem) | Op::Dec(Operand::Mem) => {
                let addr = self.operand_address(bus, index);
                let value = bus.read_memory(addr);
                let result = if matches!(op, Op::Inc(_)) {
                    alu::inc8(value, self.regs.f)
                } else {
                    alu::dec8(value, self.regs.f)
                };
                self.regs.f = result.flags;
                bus.update_cycles(1);
                bus.write_memory(addr, result.value);
                self.advance(mem_len);
            }
            Op::Daa => {
                let result = alu::daa(self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
                self.advance(1);
            }
            Op::Cpl => {
                self.regs.a = !self.regs.a;
                self.regs.f =
                    (self.regs.f & (SF | ZF | PF | CF)) | (self.regs.a & (YF | XF)) | NF | HF;
                self.advance(1);
            }
            Op::Scf => {
                self.regs.f = (self.regs.f & (SF | ZF | PF)) | CF | (self.regs.a & (YF | XF));
                self.advance(1);
            }
            Op::Ccf => {
                let mut f = self.regs.f & (SF | ZF | PF | CF);
                // Old carry moves to H.
                f |= (f & CF) << 4;
                f |= self.regs.a & (YF | XF);
                self.regs.f = f ^ CF;
                self.advance(1);
            }
            Op::RotateA(shift_op) => {
                let result = alu::shift_a(shift_op, self.regs.a, self.regs.f);
                self.regs.a = result.value;
                self.regs.f = result.flags;
                self.advance(1);
            }

            // === 16-bit arithmetic ===
            Op::AddHl(pair) => {
                let result = alu::add16(
                    self.index_value(index),
                    self.pair(pair, index),
                    self.regs.f,
                );
                self.set_index_value(index, result.value);
                self.regs.f = result.flags;
                bus.update_cycles(7);
                self.advance(1 + prefix);
            }
            Op::IncPair(pair) => {
                let value = self.pair(pair, index).wrapping_add(1);
                self.set_pair(pair, index, value);
                bus.update_cycles(2);
                self.advance(1 + prefix);
            }
            Op::DecPair(pair) => {
                let value = self.pair(pair, index).wrapping_sub(1);
                self.set_pair(pair, index, value);
                bus.update_cycles(2);
                self.advance(1 + prefix);
            }

            // === Jumps, calls and returns ===
            Op::Jp => self.regs.pc = bus.read_opcode_word(pc, 1),
            Op::JpCond(cond) => {
                let target = bus.read_opcode_word(pc, 1);
                if self.condition(cond) {
                    self.regs.pc = target;
                } else {
                    self.advance(3);
                }
            }
            Op::JpHl => self.regs.pc = self.index_value(index),
            Op::Jr => self.jump_relative(bus),
            Op::JrCond(cond) => {
                if self.condition(cond) {
                    self.jump_relative(bus);
                } else {
                    bus.read_opcode_byte(pc, 1);
                    self.advance(2);
                }
            }
            Op::Djnz => {
                bus.update_cycles(1);
                self.regs.b = self.regs.b.wrapping_sub(1);
                if self.regs.b == 0 {
                    bus.read_opcode_byte(pc, 1);
                    self.advance(2);
                } else {
                    self.jump_relative(bus);
                }
            }
            Op::Call => {
                let target = bus.read_opcode_word(pc, 1);
                self.push(bus, pc.wrapping_add(3));
                self.regs.pc = target;
            }
            Op::CallCond(cond) => {
                let target = bus.read_opcode_word(pc, 1);
                if self.condition(cond) {
                    self.push(bus, pc.wrapping_add(3));
                    self.regs.pc = target;
                } else {
                    self.advance(3);
                }
            }
            Op::Ret => self.regs.pc = self.pop(bus),
            Op::RetCond(cond) => {
                bus.update_cycles(1);
                if self.condition(cond) {
                    self.regs.pc = self.pop(bus);
                } else {
                    self.advance(1);
                }
            }
            Op::Rst(target) => {
                self.push(bus, pc.wrapping_add(1));
                self.regs.pc = u16::from(target);
            }

            // === I/O and interrupt control ===
            Op::OutImmA => {
                let n = bus.read_opcode_byte(pc, 1);
                bus.do_out(u16::from_be_bytes([self.regs.a, n]), self.regs.a);
                self.advance(2);
            }
            Op::InAImm => {
                let n = bus.read_opcode_byte(pc, 1);
                self.regs.a = bus.do_in(u16::from_be_bytes([self.regs.a, n]));
                self.advance(2);
            }
            Op::Di => {
                self.regs.iff1 = false;
                self.regs.iff2 = false;
                self.flags.remove(CpuFlags::CHECK_INTERRUPT);
                self.advance(1);
            }
            Op::Ei => {
                self.regs.iff1 = true;
                self.regs.iff2 = true;
                self.flags.remove(CpuFlags::CHECK_INTERRUPT);
                self.advance(1);
            }

            // 0x76 decodes as Halt and the dispatchers peel off prefixes, so
            // these only show up if the tables and dispatch disagree.
            Op::Ld(Operand::Mem, Operand::Mem)
            | Op::PrefixCb
            | Op::PrefixDd
            | Op::PrefixEd
            | Op::PrefixFd
            | Op::IgnorePrefix => {
                error!("{op:?} at PC={pc:04X} reached the instruction executor");
                self.advance(1);
            }
        }
    }

    /// `JR e`: displacement at PC+1, relative to the next instruction.
    fn jump_relative<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let e = bus.read_opcode_byte(self.regs.pc, 1) as i8;
        bus.update_cycles(5);
        self.regs.pc = self.regs.pc.wrapping_add(2).wrapping_add_signed(i16::from(e));
    }

    fn alu_a(&mut self, op: AluOp, value: u8) {
        let result = alu::alu(op, self.regs.a, value, self.regs.f);
        self.regs.a = result.value;
        self.regs.f = result.flags;
    }
}
