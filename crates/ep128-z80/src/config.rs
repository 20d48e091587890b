//! CPU configuration.

/// Silicon variant being emulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Z80Model {
    /// NMOS part, as fitted to the Enterprise.
    #[default]
    Nmos,
    /// CMOS part (Z84C00).
    Cmos,
}

impl Z80Model {
    /// Byte driven by the undocumented `OUT (C),0`.
    #[must_use]
    pub const fn out_c_zero_value(self) -> u8 {
        match self {
            Self::Nmos => 0x00,
            Self::Cmos => 0xFF,
        }
    }

    /// Whether an interrupt arriving during `LD A,I`/`LD A,R` clears P/V.
    #[must_use]
    pub const fn has_ld_a_ir_quirk(self) -> bool {
        matches!(self, Self::Nmos)
    }
}

/// Configuration for a [`Z80`](crate::Z80) instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Z80Config {
    pub model: Z80Model,
}
