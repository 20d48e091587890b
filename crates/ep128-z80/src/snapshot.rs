//! Register file snapshots.
//!
//! A snapshot is a flat big-endian buffer: a 4-byte version tag followed by
//! every register in a fixed order. Three layouts exist:
//!
//! | Version      | Scratch byte | Pending PC |
//! |--------------|--------------|------------|
//! | `0x01000000` | yes          | no         |
//! | `0x01000001` | yes          | yes        |
//! | `0x01000002` | no           | yes        |
//!
//! The scratch byte and the 4-byte displacement scratch field are always
//! written as zero and skipped on load. The host wraps the buffer in its own
//! container format.

use std::fmt;

use log::{debug, warn};

use crate::Z80;
use crate::flags::CpuFlags;
use crate::registers::Registers;

/// Snapshot layout versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotVersion {
    /// First layout, no pending PC override.
    V0,
    /// Adds the pending PC override.
    V1,
    /// Drops the scratch byte.
    V2,
}

impl SnapshotVersion {
    /// Layout written by [`Z80::save_state`].
    pub const CURRENT: Self = Self::V2;

    #[must_use]
    pub const fn tag(self) -> u32 {
        match self {
            Self::V0 => 0x0100_0000,
            Self::V1 => 0x0100_0001,
            Self::V2 => 0x0100_0002,
        }
    }

    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0x0100_0000 => Some(Self::V0),
            0x0100_0001 => Some(Self::V1),
            0x0100_0002 => Some(Self::V2),
            _ => None,
        }
    }

    const fn has_scratch_byte(self) -> bool {
        !matches!(self, Self::V2)
    }

    const fn has_pending_pc(self) -> bool {
        !matches!(self, Self::V0)
    }

    /// Total buffer length, tag included.
    #[must_use]
    pub const fn encoded_len(self) -> usize {
        // tag, PC, AF..HL, SP, IX, IY, alternates, I, R
        let mut len = 4 + 2 + 8 + 2 + 2 + 2 + 8 + 2;
        // displacement scratch, IFF1, IFF2, R bit 7, IM
        len += 4 + 4;
        if self.has_scratch_byte() {
            len += 1;
        }
        // vector base, control flags
        len += 1 + 4;
        if self.has_pending_pc() {
            len += 4;
        }
        len
    }
}

/// Error returned when a snapshot cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnsupportedVersion(u32),
    Truncated { expected: usize, actual: usize },
    TrailingBytes { expected: usize, actual: usize },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion(tag) => {
                write!(f, "unsupported Z80 snapshot version {tag:#010X}")
            }
            Self::Truncated { expected, actual } => write!(
                f,
                "truncated Z80 snapshot: {actual} bytes (expected {expected})"
            ),
            Self::TrailingBytes { expected, actual } => write!(
                f,
                "Z80 snapshot too long: {actual} bytes (expected {expected})"
            ),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Big-endian field reader over a buffer whose length is already checked.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn u8(&mut self) -> u8 {
        let value = self.data[self.pos];
        self.pos += 1;
        value
    }

    fn u16(&mut self) -> u16 {
        u16::from_be_bytes([self.u8(), self.u8()])
    }

    fn u32(&mut self) -> u32 {
        u32::from_be_bytes([self.u8(), self.u8(), self.u8(), self.u8()])
    }
}

impl Z80 {
    /// Serialize the register file in the current layout.
    #[must_use]
    pub fn save_state(&self) -> Vec<u8> {
        self.save_state_version(SnapshotVersion::CURRENT)
    }

    /// Serialize the register file in any supported layout.
    #[must_use]
    pub fn save_state_version(&self, version: SnapshotVersion) -> Vec<u8> {
        let r = &self.regs;
        let mut out = Vec::with_capacity(version.encoded_len());

        out.extend_from_slice(&version.tag().to_be_bytes());
        for word in [
            r.pc,
            r.af(),
            r.bc(),
            r.de(),
            r.hl(),
            r.sp,
            r.ix,
            r.iy,
            r.af_alt(),
            r.bc_alt(),
            r.de_alt(),
            r.hl_alt(),
        ] {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out.push(r.i);
        out.push(r.r & 0x7F);
        out.extend_from_slice(&0u32.to_be_bytes());
        out.push(u8::from(r.iff1));
        out.push(u8::from(r.iff2));
        out.push(r.r & 0x80);
        out.push(r.im);
        if version.has_scratch_byte() {
            out.push(0);
        }
        out.push(r.vector_base);
        out.extend_from_slice(&(self.flags & CpuFlags::PERSISTENT).bits().to_be_bytes());
        if version.has_pending_pc() {
            let pending = self.new_pc.map_or(-1, i32::from);
            out.extend_from_slice(&pending.to_be_bytes());
        }

        debug!("Z80 snapshot saved ({} bytes, version {:#010X})", out.len(), version.tag());
        out
    }

    /// Restore the register file from a snapshot.
    ///
    /// The CPU is reset first, so it is left in its reset state if the
    /// buffer is rejected.
    pub fn load_state(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        self.regs = Registers::default();
        self.reset();

        // Every length check happens before the first field is stored.
        let result = self.read_state(data);
        match &result {
            Ok(()) => debug!("Z80 snapshot loaded ({} bytes)", data.len()),
            Err(err) => warn!("Z80 snapshot rejected: {err}"),
        }
        result
    }

    fn read_state(&mut self, data: &[u8]) -> Result<(), SnapshotError> {
        let Some(tag_bytes) = data.first_chunk::<4>() else {
            return Err(SnapshotError::Truncated { expected: 4, actual: data.len() });
        };
        let tag = u32::from_be_bytes(*tag_bytes);
        let version = SnapshotVersion::from_tag(tag).ok_or(SnapshotError::UnsupportedVersion(tag))?;

        let expected = version.encoded_len();
        if data.len() < expected {
            return Err(SnapshotError::Truncated { expected, actual: data.len() });
        }
        if data.len() > expected {
            return Err(SnapshotError::TrailingBytes { expected, actual: data.len() });
        }

        let mut rd = Reader::new(&data[4..]);
        let r = &mut self.regs;
        r.pc = rd.u16();
        r.set_af(rd.u16());
        r.set_bc(rd.u16());
        r.set_de(rd.u16());
        r.set_hl(rd.u16());
        r.sp = rd.u16();
        r.ix = rd.u16();
        r.iy = rd.u16();
        r.set_af_alt(rd.u16());
        r.set_bc_alt(rd.u16());
        r.set_de_alt(rd.u16());
        r.set_hl_alt(rd.u16());
        r.i = rd.u8();
        let counter = rd.u8() & 0x7F;
        let _displacement = rd.u32();
        r.iff1 = rd.u8() != 0;
        r.iff2 = rd.u8() != 0;
        r.r = (rd.u8() & 0x80) | counter;
        r.im = rd.u8();
        if version.has_scratch_byte() {
            let _scratch = rd.u8();
        }
        r.vector_base = rd.u8();
        self.flags = CpuFlags::from_bits_truncate(rd.u32()) & CpuFlags::PERSISTENT;

        self.new_pc = None;
        if version.has_pending_pc() {
            let pending = rd.u32() as i32;
            if pending >= 0 && self.flags.contains(CpuFlags::SET_PC) {
                self.new_pc = Some((pending & 0xFFFF) as u16);
            }
        }
        if self.new_pc.is_none() {
            self.flags.remove(CpuFlags::SET_PC);
        }
        Ok(())
    }
}
