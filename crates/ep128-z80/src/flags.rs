//! Z80 flag register bits and the internal control bit-set.

use bitflags::bitflags;

/// Sign flag (bit 7) - set if result is negative.
pub const SF: u8 = 0b1000_0000;

/// Zero flag (bit 6) - set if result is zero.
pub const ZF: u8 = 0b0100_0000;

/// Undocumented flag (bit 5) - copy of bit 5 of result.
pub const YF: u8 = 0b0010_0000;

/// Half-carry flag (bit 4) - carry from bit 3 to bit 4.
pub const HF: u8 = 0b0001_0000;

/// Undocumented flag (bit 3) - copy of bit 3 of result.
pub const XF: u8 = 0b0000_1000;

/// Parity/Overflow flag (bit 2) - parity or overflow depending on instruction.
pub const PF: u8 = 0b0000_0100;

/// Add/Subtract flag (bit 1) - set if last operation was subtraction.
pub const NF: u8 = 0b0000_0010;

/// Carry flag (bit 0) - carry out of bit 7.
pub const CF: u8 = 0b0000_0001;

bitflags! {
    /// Control state evaluated at instruction boundaries.
    ///
    /// The numeric values are part of the snapshot format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CpuFlags: u32 {
        /// The instruction just executed allows a maskable interrupt after it.
        const CHECK_INTERRUPT = 0x01;
        /// A maskable interrupt is waiting to be serviced.
        const INTERRUPT_PENDING = 0x02;
        /// HALT is executing. PC stays on the HALT opcode.
        const HALTED = 0x04;
        /// The host holds the maskable interrupt line low.
        const INTERRUPT_LINE = 0x08;
        /// A non-maskable interrupt is latched.
        const NMI = 0x10;
        /// A program counter override waits for the next boundary.
        const SET_PC = 0x20;
    }
}

impl CpuFlags {
    /// Bits written to and accepted from a snapshot.
    pub const PERSISTENT: Self = Self::INTERRUPT_PENDING
        .union(Self::HALTED)
        .union(Self::INTERRUPT_LINE)
        .union(Self::NMI)
        .union(Self::SET_PC);

    /// Bits that force the boundary check to look closer.
    pub(crate) const SERVICE: Self = Self::INTERRUPT_PENDING.union(Self::NMI).union(Self::SET_PC);
}

#[cfg(test)]
mod tests {
    use super::CpuFlags;

    #[test]
    fn persistent_mask_excludes_check_bit() {
        assert_eq!(CpuFlags::PERSISTENT.bits(), 0x3E);
        assert!(!CpuFlags::PERSISTENT.contains(CpuFlags::CHECK_INTERRUPT));
    }
}
