//! Z80 CPU core with per-instruction execution.
//!
//! One call to [`Z80::execute_instruction`] runs a whole instruction, prefixes
//! included, and then services whatever became due at the boundary: a
//! deferred PC override, an NMI or a maskable interrupt.

#![allow(clippy::cast_possible_truncation)] // Intentional truncation for low byte extraction.

use ep128_core::{Cpu, Observable, Value};
use log::{debug, trace};

use crate::bus::{InterruptRequests, Z80Bus};
use crate::config::Z80Config;
use crate::decode::{Cond, MAIN, Op, Pair, Reg8, StackPair};
use crate::flags::{CF, CpuFlags, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

mod cb;
mod ed;
mod execute;
mod indexed;

/// Register standing in for HL in the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

impl Index {
    /// Extra opcode bytes in front of the base instruction.
    const fn prefix_len(self) -> u16 {
        match self {
            Self::Hl => 0,
            Self::Ix | Self::Iy => 1,
        }
    }
}

/// Z80 CPU.
///
/// The CPU does not own the bus. Instead, the bus is passed to
/// [`Z80::execute_instruction`] so the host can share it with the video and
/// sound chips and charge its own wait states.
pub struct Z80 {
    /// Architectural registers.
    pub(crate) regs: Registers,
    /// Interrupt, halt and override state.
    pub(crate) flags: CpuFlags,
    /// Target of a pending PC override.
    pub(crate) new_pc: Option<u16>,
    config: Z80Config,
}

impl Z80 {
    /// Create an NMOS Z80 in its reset state.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Z80Config::default())
    }

    #[must_use]
    pub fn with_config(config: Z80Config) -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            flags: CpuFlags::empty(),
            new_pc: None,
            config,
        };
        cpu.reset();
        cpu
    }

    #[must_use]
    pub const fn config(&self) -> Z80Config {
        self.config
    }

    /// Fetch, decode and execute one instruction, then check for interrupts.
    pub fn execute_instruction<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let opcode = bus.read_opcode_first_byte(self.regs.pc);
        match MAIN[usize::from(opcode)] {
            Op::PrefixCb => self.execute_cb(bus),
            Op::PrefixEd => self.execute_ed(bus),
            Op::PrefixDd => self.execute_indexed(bus, Index::Ix),
            Op::PrefixFd => self.execute_indexed(bus, Index::Iy),
            op => {
                self.regs.inc_r(1);
                self.flags.insert(CpuFlags::CHECK_INTERRUPT);
                self.execute(bus, op, Index::Hl);
            }
        }
        self.check_interrupts(bus);
    }

    /// Power-on state: PC, I, R, IM and both IFFs cleared, IX/IY all ones.
    ///
    /// The other registers keep their contents, except that Z is set.
    pub fn reset(&mut self) {
        debug!("Z80 reset");
        self.regs.pc = 0;
        self.regs.i = 0;
        self.regs.r = 0;
        self.regs.im = 0;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.ix = 0xFFFF;
        self.regs.iy = 0xFFFF;
        self.regs.f |= ZF;
        self.flags = CpuFlags::empty();
        self.new_pc = None;
    }

    /// Returns the current program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Returns a copy of all registers.
    #[must_use]
    pub const fn registers(&self) -> Registers {
        self.regs
    }

    /// Returns true while HALT is executing.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.flags.contains(CpuFlags::HALTED)
    }

    /// Internal control state.
    #[must_use]
    pub const fn cpu_flags(&self) -> CpuFlags {
        self.flags
    }

    /// Assert the maskable interrupt line.
    pub fn trigger_interrupt(&mut self) {
        self.flags
            .insert(CpuFlags::INTERRUPT_LINE | CpuFlags::INTERRUPT_PENDING);
    }

    /// Release the maskable interrupt line.
    pub fn clear_interrupt(&mut self) {
        self.flags
            .remove(CpuFlags::INTERRUPT_LINE | CpuFlags::INTERRUPT_PENDING);
    }

    /// Latch an NMI. It is taken at the next instruction boundary.
    pub fn trigger_nmi(&mut self) {
        self.flags.insert(CpuFlags::NMI);
    }

    /// Low byte placed on the data bus during a mode 2 acknowledge.
    pub fn set_vector_base(&mut self, base: u8) {
        self.regs.vector_base = base;
    }

    /// Request a jump to `address` at the next instruction boundary.
    ///
    /// Asking for the current PC cancels any earlier request. Applying the
    /// override also ends HALT.
    pub fn set_program_counter(&mut self, address: u16) {
        if address == self.regs.pc {
            self.flags.remove(CpuFlags::SET_PC);
            self.new_pc = None;
        } else {
            self.new_pc = Some(address);
            self.flags.insert(CpuFlags::SET_PC);
        }
    }

    /// PC as the host will see it once pending overrides are applied.
    #[must_use]
    pub fn program_counter(&self) -> u16 {
        self.new_pc.unwrap_or(self.regs.pc)
    }

    #[must_use]
    pub const fn a(&self) -> u8 {
        self.regs.a
    }

    #[must_use]
    pub const fn f(&self) -> u8 {
        self.regs.f
    }

    #[must_use]
    pub const fn bc(&self) -> u16 {
        self.regs.bc()
    }

    #[must_use]
    pub const fn de(&self) -> u16 {
        self.regs.de()
    }

    #[must_use]
    pub const fn hl(&self) -> u16 {
        self.regs.hl()
    }

    #[must_use]
    pub const fn sp(&self) -> u16 {
        self.regs.sp
    }

    #[must_use]
    pub const fn ix(&self) -> u16 {
        self.regs.ix
    }

    #[must_use]
    pub const fn iy(&self) -> u16 {
        self.regs.iy
    }

    /// Set PC directly, skipping the deferred override.
    #[cfg(feature = "test-utils")]
    pub fn set_pc(&mut self, value: u16) {
        self.regs.pc = value;
    }

    /// Set SP directly.
    #[cfg(feature = "test-utils")]
    pub fn set_sp(&mut self, value: u16) {
        self.regs.sp = value;
    }

    /// Mutable register access for test setup.
    #[cfg(feature = "test-utils")]
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

// Operand helpers shared by the executors.
impl Z80 {
    fn advance(&mut self, bytes: u16) {
        self.regs.pc = self.regs.pc.wrapping_add(bytes);
    }

    fn index_value(&self, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    fn set_index_value(&mut self, index: Index, value: u16) {
        match index {
            Index::Hl => self.regs.set_hl(value),
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// Read an 8-bit register; H and L name the index halves under DD/FD.
    fn reg8(&self, reg: Reg8, index: Index) -> u8 {
        match reg {
            Reg8::A => self.regs.a,
            Reg8::B => self.regs.b,
            Reg8::C => self.regs.c,
            Reg8::D => self.regs.d,
            Reg8::E => self.regs.e,
            Reg8::H => (self.index_value(index) >> 8) as u8,
            Reg8::L => self.index_value(index) as u8,
        }
    }

    fn set_reg8(&mut self, reg: Reg8, index: Index, value: u8) {
        match reg {
            Reg8::A => self.regs.a = value,
            Reg8::B => self.regs.b = value,
            Reg8::C => self.regs.c = value,
            Reg8::D => self.regs.d = value,
            Reg8::E => self.regs.e = value,
            Reg8::H => {
                let low = self.index_value(index) & 0x00FF;
                self.set_index_value(index, (u16::from(value) << 8) | low);
            }
            Reg8::L => {
                let high = self.index_value(index) & 0xFF00;
                self.set_index_value(index, high | u16::from(value));
            }
        }
    }

    fn pair(&self, pair: Pair, index: Index) -> u16 {
        match pair {
            Pair::Bc => self.regs.bc(),
            Pair::De => self.regs.de(),
            Pair::Hl => self.index_value(index),
            Pair::Sp => self.regs.sp,
        }
    }

    fn set_pair(&mut self, pair: Pair, index: Index, value: u16) {
        match pair {
            Pair::Bc => self.regs.set_bc(value),
            Pair::De => self.regs.set_de(value),
            Pair::Hl => self.set_index_value(index, value),
            Pair::Sp => self.regs.sp = value,
        }
    }

    fn stack_pair(&self, pair: StackPair, index: Index) -> u16 {
        match pair {
            StackPair::Bc => self.regs.bc(),
            StackPair::De => self.regs.de(),
            StackPair::Hl => self.index_value(index),
            StackPair::Af => self.regs.af(),
        }
    }

    fn set_stack_pair(&mut self, pair: StackPair, index: Index, value: u16) {
        match pair {
            StackPair::Bc => self.regs.set_bc(value),
            StackPair::De => self.regs.set_de(value),
            StackPair::Hl => self.set_index_value(index, value),
            StackPair::Af => self.regs.set_af(value),
        }
    }

    /// Evaluate condition code.
    fn condition(&self, cond: Cond) -> bool {
        let f = self.regs.f;
        match cond {
            Cond::Nz => f & ZF == 0,
            Cond::Z => f & ZF != 0,
            Cond::Nc => f & CF == 0,
            Cond::C => f & CF != 0,
            Cond::Po => f & PF == 0,
            Cond::Pe => f & PF != 0,
            Cond::P => f & SF == 0,
            Cond::M => f & SF != 0,
        }
    }

    /// One internal cycle, then high byte at SP-1 and low byte at SP-2.
    fn push<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, value: u16) {
        bus.update_cycles(1);
        let [low, high] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        bus.write_memory(self.regs.sp.wrapping_add(1), high);
        bus.write_memory(self.regs.sp, low);
    }

    fn pop<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let value = bus.read_memory_word(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        value
    }

    /// Address of the memory operand: HL, or IX/IY plus the displacement
    /// byte (which costs five extra cycles to add).
    fn operand_address<B: Z80Bus + ?Sized>(&mut self, bus: &mut B, index: Index) -> u16 {
        match index {
            Index::Hl => self.regs.hl(),
            Index::Ix | Index::Iy => {
                let d = bus.read_opcode_byte(self.regs.pc, 2) as i8;
                bus.update_cycles(5);
                self.index_value(index).wrapping_add_signed(i16::from(d))
            }
        }
    }
}

// Interrupt and halt handling.
impl Z80 {
    fn leave_halt(&mut self) {
        if self.flags.contains(CpuFlags::HALTED) {
            self.flags.remove(CpuFlags::HALTED);
            self.advance(1);
        }
    }

    /// Latch whatever the host raised during the instruction.
    fn poll_interrupt_requests<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        let requests = bus.interrupt_requests();
        if requests.contains(InterruptRequests::INT) {
            self.trigger_interrupt();
        }
        if requests.contains(InterruptRequests::NMI) {
            self.trigger_nmi();
        }
    }

    fn check_interrupts<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        self.poll_interrupt_requests(bus);
        if !self.flags.intersects(CpuFlags::SERVICE) {
            return;
        }
        if self.flags.intersects(CpuFlags::NMI | CpuFlags::SET_PC) {
            self.service_nmi(bus);
        } else if self.regs.iff1 && self.flags.contains(CpuFlags::CHECK_INTERRUPT) {
            self.accept_interrupt(bus);
        }
    }

    /// Apply a pending PC override, then take a pending NMI on top of it.
    fn service_nmi<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        if self.flags.contains(CpuFlags::SET_PC) {
            if let Some(target) = self.new_pc.take() {
                debug!("PC override {:04X} -> {target:04X}", self.regs.pc);
                self.regs.pc = target;
            }
            self.flags.remove(CpuFlags::SET_PC | CpuFlags::HALTED);
            if !self.flags.contains(CpuFlags::NMI) {
                return;
            }
        }

        self.flags.remove(CpuFlags::NMI);
        self.leave_halt();
        debug!("NMI at PC={:04X}", self.regs.pc);
        self.regs.iff1 = false;
        bus.update_cycles(4);
        self.push(bus, self.regs.pc);
        self.regs.pc = 0x0066;
    }

    /// Accept a maskable interrupt in the current mode.
    fn accept_interrupt<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.leave_halt();
        bus.acknowledge_interrupt();

        match self.regs.im {
            // Mode 0 would execute an opcode from the data bus; not emulated.
            0 => trace!("IM 0 interrupt at PC={:04X} ignored", self.regs.pc),
            1 => {
                trace!("IM 1 interrupt at PC={:04X}", self.regs.pc);
                bus.update_cycles(6);
                self.push(bus, self.regs.pc);
                self.regs.pc = 0x0038;
            }
            _ => {
                let vector = u16::from_be_bytes([self.regs.i, self.regs.vector_base]);
                trace!("IM 2 interrupt at PC={:04X}, vector {vector:04X}", self.regs.pc);
                bus.update_cycles(6);
                self.push(bus, self.regs.pc);
                self.regs.pc = bus.read_memory_word(vector);
            }
        }
    }

    /// NMOS parts lose P/V when an interrupt lands during `LD A,I`/`LD A,R`.
    fn ld_a_ir_interrupt_check<B: Z80Bus + ?Sized>(&mut self, bus: &mut B) {
        if !self.config.model.has_ld_a_ir_quirk() || self.regs.f & PF == 0 {
            return;
        }
        self.poll_interrupt_requests(bus);
        if self.flags.contains(CpuFlags::INTERRUPT_PENDING)
            && !self.flags.intersects(CpuFlags::NMI | CpuFlags::SET_PC)
            && self.regs.iff1
        {
            self.accept_interrupt(bus);
        }
        if !self.regs.iff2 {
            self.regs.f &= !PF;
        }
    }
}

impl<B: Z80Bus + ?Sized> Cpu<B> for Z80 {
    type Registers = Registers;

    fn execute_instruction(&mut self, bus: &mut B) {
        Z80::execute_instruction(self, bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        Z80::is_halted(self)
    }

    fn interrupt(&mut self) {
        self.trigger_interrupt();
    }

    fn nmi(&mut self) {
        self.trigger_nmi();
    }

    fn reset(&mut self) {
        Z80::reset(self);
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate registers
    "a'", "f'", "b'", "c'", "d'", "e'", "h'", "l'",
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r", "r7",
    // Flags (individual)
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im", "vector_base", "nmi_pending", "int_pending",
    // CPU state
    "halted", "pending_pc",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let r = &self.regs;
        match path {
            // Main registers
            "a" => Some(r.a.into()),
            "f" => Some(r.f.into()),
            "b" => Some(r.b.into()),
            "c" => Some(r.c.into()),
            "d" => Some(r.d.into()),
            "e" => Some(r.e.into()),
            "h" => Some(r.h.into()),
            "l" => Some(r.l.into()),

            // Register pairs
            "af" => Some(r.af().into()),
            "bc" => Some(r.bc().into()),
            "de" => Some(r.de().into()),
            "hl" => Some(r.hl().into()),

            // Alternate registers
            "a'" => Some(r.a_alt.into()),
            "f'" => Some(r.f_alt.into()),
            "b'" => Some(r.b_alt.into()),
            "c'" => Some(r.c_alt.into()),
            "d'" => Some(r.d_alt.into()),
            "e'" => Some(r.e_alt.into()),
            "h'" => Some(r.h_alt.into()),
            "l'" => Some(r.l_alt.into()),
            "af'" => Some(r.af_alt().into()),
            "bc'" => Some(r.bc_alt().into()),
            "de'" => Some(r.de_alt().into()),
            "hl'" => Some(r.hl_alt().into()),

            // Index registers
            "ix" => Some(r.ix.into()),
            "iy" => Some(r.iy.into()),
            "ixh" => Some(((r.ix >> 8) as u8).into()),
            "ixl" => Some((r.ix as u8).into()),
            "iyh" => Some(((r.iy >> 8) as u8).into()),
            "iyl" => Some((r.iy as u8).into()),

            // Other registers
            "sp" => Some(r.sp.into()),
            "pc" => Some(r.pc.into()),
            "i" => Some(r.i.into()),
            "r" => Some(r.r.into()),
            "r7" => Some((r.r & 0x80 != 0).into()),

            // Individual flags
            "flags.s" => Some((r.f & SF != 0).into()),
            "flags.z" => Some((r.f & ZF != 0).into()),
            "flags.y" => Some((r.f & YF != 0).into()),
            "flags.h" => Some((r.f & HF != 0).into()),
            "flags.x" => Some((r.f & XF != 0).into()),
            "flags.p" => Some((r.f & PF != 0).into()),
            "flags.n" => Some((r.f & NF != 0).into()),
            "flags.c" => Some((r.f & CF != 0).into()),

            // Interrupt state
            "iff1" => Some(r.iff1.into()),
            "iff2" => Some(r.iff2.into()),
            "im" => Some(r.im.into()),
            "vector_base" => Some(r.vector_base.into()),
            "nmi_pending" => Some(self.flags.contains(CpuFlags::NMI).into()),
            "int_pending" => Some(self.flags.contains(CpuFlags::INTERRUPT_PENDING).into()),

            // CPU state
            "halted" => Some(self.is_halted().into()),
            "pending_pc" => Some(self.new_pc.map_or(-1, i32::from).into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}
