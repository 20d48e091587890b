//! Z80 interpreter for the Enterprise 128.
//!
//! Each call to `execute_instruction()` runs one complete instruction and
//! reports its timing to the host through [`Z80Bus`]. Undocumented opcodes
//! and flags are emulated; interrupt mode 0 is not.

mod alu;
mod bus;
mod config;
mod cpu;
mod decode;
mod flags;
mod registers;
mod snapshot;
mod tables;

pub use bus::{InterruptRequests, Z80Bus};
pub use config::{Z80Config, Z80Model};
pub use cpu::Z80;
pub use flags::{CF, CpuFlags, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
pub use snapshot::{SnapshotError, SnapshotVersion};
pub use tables::{Tables, daa_index, tables};
