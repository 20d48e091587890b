//! ED-prefixed instructions.

use super::{Index, Z80};
use crate::alu;
use crate::bus::Z80Bus;
use crate::decode::{BlockKind, BlockOp, ED, EdOp};
use crate::flags::{CF, CpuFlags, HF, NF, PF, SF, XF, ZF};
use crate::tables::tables;

impl Z80 {
    pub(super) fn execute_ed<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let pc = self.regs.pc;
        let opcode = bus.read_opcode_second_byte(pc);
        self.regs.inc_r(2);
        self.flags.insert(CpuFlags::CHECK_INTERRUPT);

        match ED[usize::from(opcode)] {
            EdOp::Nop => self.advance(2),
            EdOp::InC(reg) => {
                let value = bus.do_in(self.regs.bc());
                self.regs.f = (self.regs.f & CF) | tables().zero_sign_parity[usize::from(value)];
                if let Some(reg) = reg {
                    self.set_reg8(reg, Index::Hl, value);
                }
                self.advance(2);
            }
            EdOp::OutC(reg) => {
                let value = reg.map_or(self.config.model.out_c_zero_value(), |reg| {
                    self.reg8(reg, Index::Hl)
                });
                bus.do_out(self.regs.bc(), value);
                self.advance(2);
            }
            EdOp::SbcHl(pair) => {
                let result = alu::sbc16(self.regs.hl(), self.pair(pair, Index::Hl), self.regs.f);
                self.regs.set_hl(result.value);
                self.regs.f = result.flags;
                bus.update_cycles(7);
                self.advance(2);
            }
            EdOp::AdcHl(pair) => {
                let result = alu::adc16(self.regs.hl(), self.pair(pair, Index::Hl), self.regs.f);
                self.regs.set_hl(result.value);
                self.regs.f = result.flags;
                bus.update_cycles(7);
                self.advance(2);
            }
            EdOp::StorePairAbsolute(pair) => {
                let addr = bus.read_opcode_word(pc, 2);
                bus.write_memory_word(addr, self.pair(pair, Index::Hl));
                self.advance(4);
            }
            EdOp::LoadPairAbsolute(pair) => {
                let addr = bus.read_opcode_word(pc, 2);
                let value = bus.read_memory_word(addr);
                self.set_pair(pair, Index::Hl, value);
                self.advance(4);
            }
            EdOp::Neg => {
                let result = alu::neg8(self.regs.a);
                self.regs.a = result.value;
                self.regs.f = result.flags;
                self.advance(2);
            }
            EdOp::Retn => {
                self.regs.iff1 = self.regs.iff2;
                self.regs.pc = self.pop(bus);
            }
            EdOp::Im(mode) => {
                self.regs.im = mode;
                self.advance(2);
            }
            EdOp::LdIA => {
                self.regs.i = self.regs.a;
                bus.update_cycles(1);
                self.advance(2);
            }
            EdOp::LdRA => {
                self.regs.r = self.regs.a;
                bus.update_cycles(1);
                self.advance(2);
            }
            EdOp::LdAI => self.ld_a_ir(bus, self.regs.i),
            EdOp::LdAR => self.ld_a_ir(bus, self.regs.r),
            EdOp::Rrd => {
                let addr = self.regs.hl();
                let value = bus.read_memory(addr);
                bus.update_cycles(4);
                bus.write_memory(addr, (value >> 4) | (self.regs.a << 4));
                self.regs.a = (self.regs.a & 0xF0) | (value & 0x0F);
                self.regs.f = (self.regs.f & CF) | tables().zero_sign_parity[usize::from(self.regs.a)];
                self.advance(2);
            }
            EdOp::Rld => {
                let addr = self.regs.hl();
                let value = bus.read_memory(addr);
                bus.update_cycles(4);
                bus.write_memory(addr, (value << 4) | (self.regs.a & 0x0F));
                self.regs.a = (self.regs.a & 0xF0) | (value >> 4);
                self.regs.f = (self.regs.f & CF) | tables().zero_sign_parity[usize::from(self.regs.a)];
                self.advance(2);
            }
            EdOp::Block(block) => match block.kind {
                BlockKind::Ld => self.block_ld(bus, block),
                BlockKind::Cp => self.block_cp(bus, block),
                BlockKind::In => self.block_in(bus, block),
                BlockKind::Out => self.block_out(bus, block),
            },
            EdOp::TapePatch => {
                bus.tape_patch(&mut self.regs);
                self.advance(2);
            }
        }
    }

    /// `LD A,I` / `LD A,R`: P/V reports IFF2.
    fn ld_a_ir<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, value: u8) {
        self.regs.a = value;
        let iff2 = if self.regs.iff2 { PF } else { 0 };
        self.regs.f = (self.regs.f & CF) | iff2 | tables().zero_sign_xy[usize::from(value)];
        bus.update_cycles(1);
        self.advance(2);
        self.ld_a_ir_interrupt_check(bus);
    }

    fn step_hl(&mut self, decrement: bool) {
        let hl = self.regs.hl();
        self.regs
            .set_hl(if decrement { hl.wrapping_sub(1) } else { hl.wrapping_add(1) });
    }

    /// `LDI`, `LDD`, `LDIR`, `LDDR`
    fn block_ld<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, block: BlockOp) {
        let value = bus.read_memory(self.regs.hl());
        bus.write_memory(self.regs.de(), value);
        self.step_hl(block.decrement);
        let de = self.regs.de();
        self.regs
            .set_de(if block.decrement { de.wrapping_sub(1) } else { de.wrapping_add(1) });
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let n = value.wrapping_add(self.regs.a);
        let mut f = (self.regs.f & (CF | ZF | SF)) | (n & XF) | ((n & 0x02) << 4);
        if bc != 0 {
            f |= PF;
        }
        self.regs.f = f;

        if block.repeat && bc != 0 {
            bus.update_cycles(7);
        } else {
            bus.update_cycles(2);
            self.advance(2);
        }
    }

    /// `CPI`, `CPD`, `CPIR`, `CPDR`
    fn block_cp<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, block: BlockOp) {
        let value = bus.read_memory(self.regs.hl());
        self.step_hl(block.decrement);
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let diff = self.regs.a.wrapping_sub(value);
        let mut f = (self.regs.f & CF) | NF | tables().zero_sign[usize::from(diff)];
        if bc != 0 {
            f |= PF;
        }
        f |= (value ^ self.regs.a ^ diff) & HF;
        let n = diff.wrapping_sub(u8::from(f & HF != 0));
        f |= (n & XF) | ((n & 0x02) << 4);
        self.regs.f = f;

        if block.repeat && f & (PF | ZF) == PF {
            bus.update_cycles(10);
        } else {
            bus.update_cycles(5);
            self.advance(2);
        }
    }

    /// `INI`, `IND`, `INIR`, `INDR`
    fn block_in<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, block: BlockOp) {
        bus.update_cycles(1);
        let value = bus.do_in(self.regs.bc());
        bus.write_memory(self.regs.hl(), value);
        self.step_hl(block.decrement);
        self.regs.b = self.regs.b.wrapping_sub(1);

        let c = if block.decrement {
            self.regs.c.wrapping_sub(1)
        } else {
            self.regs.c.wrapping_add(1)
        };
        let sum = u16::from(value) + u16::from(c);
        self.io_block_flags(value, sum);
        self.repeat_io(bus, block);
    }

    /// `OUTI`, `OUTD`, `OTIR`, `OTDR`
    fn block_out<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, block: BlockOp) {
        bus.update_cycles(1);
        let value = bus.read_memory(self.regs.hl());
        self.step_hl(block.decrement);
        self.regs.b = self.regs.b.wrapping_sub(1);

        let sum = u16::from(value) + u16::from(self.regs.l);
        self.io_block_flags(value, sum);
        // B is already decremented when it reaches the address bus.
        bus.do_out(self.regs.bc(), value);
        self.repeat_io(bus, block);
    }

    fn io_block_flags(&mut self, value: u8, sum: u16) {
        let t = tables();
        let b = self.regs.b;
        let mut f = t.zero_sign_xy[usize::from(b)] | ((value & 0x80) >> 6);
        if sum > 0xFF {
            f |= HF | CF;
        }
        f |= t.parity[usize::from((sum as u8 & 0x07) ^ b)];
        self.regs.f = f;
    }

    fn repeat_io<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, block: BlockOp) {
        if block.repeat && self.regs.f & ZF == 0 {
            bus.update_cycles(5);
        } else {
            self.advance(2);
        }
    }
}
