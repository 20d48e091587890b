//! Memory and I/O bus interface.

/// Memory bus interface.
///
/// Accesses are untimed. A CPU-specific bus contract layers cycle costs on
/// top, so the host can decide per access class how long each one takes.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// I/O port interface.
///
/// The Z80 drives all sixteen address lines during a port cycle, so ports are
/// addressed with `u16` even though most Enterprise hardware decodes only
/// the low byte.
pub trait IoBus: Bus {
    /// Read a byte from an I/O port.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to an I/O port.
    fn write_io(&mut self, port: u16, value: u8);
}
