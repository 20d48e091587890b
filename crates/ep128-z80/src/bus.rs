//! Timed bus contract between the Z80 and its host.

use bitflags::bitflags;
use ep128_core::{IoBus, SimpleBus};

use crate::registers::Registers;

bitflags! {
    /// Interrupts raised by the host while an instruction was running.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InterruptRequests: u8 {
        /// Assert the maskable interrupt line.
        const INT = 0x01;
        /// Latch a non-maskable interrupt.
        const NMI = 0x02;
    }
}

/// Host side of the Z80: memory, ports and the system clock.
///
/// Every access the CPU makes goes through one of these methods, and every
/// method charges its cycles through [`Z80Bus::update_cycles`]. The defaults
/// give plain Z80 timing; hosts override individual methods to add wait
/// states or to tell opcode fetches apart from data reads (for execute
/// breakpoints, say).
///
/// `update_cycles` may be re-entrant: a host can use it to run video and
/// audio up to the current point, which in turn may call back into the bus.
/// The CPU never starts another instruction from inside a callback. Devices
/// that raise an interrupt from there report it through
/// [`Z80Bus::interrupt_requests`], which the CPU polls at the end of the same
/// instruction.
pub trait Z80Bus: IoBus {
    /// Advance the system clock by `cycles` CPU cycles.
    fn update_cycles(&mut self, cycles: u32);

    /// Data read (3 cycles).
    fn read_memory(&mut self, address: u16) -> u8 {
        self.update_cycles(3);
        self.read(address)
    }

    /// Data write (3 cycles).
    fn write_memory(&mut self, address: u16, value: u8) {
        self.update_cycles(3);
        self.write(address, value);
    }

    /// Little-endian word read, low byte first (6 cycles).
    fn read_memory_word(&mut self, address: u16) -> u16 {
        let low = self.read_memory(address);
        let high = self.read_memory(address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Little-endian word write, low byte first (6 cycles).
    fn write_memory_word(&mut self, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_memory(address, low);
        self.write_memory(address.wrapping_add(1), high);
    }

    /// Port read (4 cycles).
    fn do_in(&mut self, port: u16) -> u8 {
        self.update_cycles(4);
        self.read_io(port)
    }

    /// Port write (4 cycles).
    fn do_out(&mut self, port: u16, value: u8) {
        self.update_cycles(4);
        self.write_io(port, value);
    }

    /// M1 fetch of the first opcode byte (4 cycles).
    fn read_opcode_first_byte(&mut self, pc: u16) -> u8 {
        self.update_cycles(1);
        self.read_memory(pc)
    }

    /// M1 fetch of the byte after a prefix (4 cycles).
    fn read_opcode_second_byte(&mut self, pc: u16) -> u8 {
        self.update_cycles(1);
        self.read_memory(pc.wrapping_add(1))
    }

    /// Operand or displacement byte at `pc + offset` (3 cycles).
    fn read_opcode_byte(&mut self, pc: u16, offset: u16) -> u8 {
        self.read_memory(pc.wrapping_add(offset))
    }

    /// Operand word at `pc + offset` (6 cycles).
    fn read_opcode_word(&mut self, pc: u16, offset: u16) -> u16 {
        self.read_memory_word(pc.wrapping_add(offset))
    }

    /// Take the interrupts raised since the last poll.
    ///
    /// Polled once per instruction boundary, before the CPU decides whether to
    /// service anything. Requests are consumed: `INT` raises the line as
    /// [`Z80::trigger_interrupt`](crate::Z80::trigger_interrupt) does, and it
    /// stays raised until the host calls `clear_interrupt`.
    fn interrupt_requests(&mut self) -> InterruptRequests {
        InterruptRequests::empty()
    }

    /// Called once for every maskable interrupt the CPU accepts.
    fn acknowledge_interrupt(&mut self) {}

    /// Called by the `ED FE` trap opcode with full register access.
    ///
    /// Tape loaders use it to replace ROM routines; the CPU then carries on
    /// after the two opcode bytes.
    fn tape_patch(&mut self, _regs: &mut Registers) {}
}

impl Z80Bus for SimpleBus {
    fn update_cycles(&mut self, cycles: u32) {
        self.add_cycles(cycles);
    }
}
