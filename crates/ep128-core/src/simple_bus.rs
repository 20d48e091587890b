//! Flat reference host.

use std::collections::HashMap;

use crate::{Bus, IoBus, Observable, Ticks, Value};

/// 64 KiB of flat RAM, a port map and a cycle counter.
///
/// No paging, no contention. Used by tests and tools that need a host
/// without the rest of the machine. Port reads return the value set with
/// [`SimpleBus::set_port`], or `0xFF` for an undriven port. Port writes are
/// recorded in order.
pub struct SimpleBus {
    ram: Vec<u8>,
    io_read_values: HashMap<u16, u8>,
    io_writes: Vec<(u16, u8)>,
    cycles: Ticks,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
            io_read_values: HashMap::new(),
            io_writes: Vec::new(),
            cycles: Ticks::ZERO,
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64K.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[usize::from(addr)] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read RAM without charging any cycles.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    /// Write RAM without charging any cycles.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    /// Little-endian word at `address`.
    #[must_use]
    pub fn peek_word(&self, address: u16) -> u16 {
        u16::from_le_bytes([self.peek(address), self.peek(address.wrapping_add(1))])
    }

    /// Value returned by subsequent reads of `port`.
    pub fn set_port(&mut self, port: u16, value: u8) {
        self.io_read_values.insert(port, value);
    }

    /// Every port write so far, oldest first.
    #[must_use]
    pub fn port_writes(&self) -> &[(u16, u8)] {
        &self.io_writes
    }

    /// Advance the cycle counter.
    pub fn add_cycles(&mut self, cycles: u32) {
        self.cycles += cycles;
    }

    /// Cycles charged since construction or the last [`SimpleBus::take_cycles`].
    #[must_use]
    pub fn cycles(&self) -> Ticks {
        self.cycles
    }

    /// Return the cycle count and restart it from zero.
    pub fn take_cycles(&mut self) -> Ticks {
        std::mem::take(&mut self.cycles)
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

impl IoBus for SimpleBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.io_read_values.get(&port).copied().unwrap_or(0xFF)
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.io_writes.push((port, value));
    }
}

const SIMPLE_BUS_QUERY_PATHS: &[&str] = &["cycles", "port_writes"];

impl Observable for SimpleBus {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "cycles" => Some(self.cycles.get().into()),
            "port_writes" => Some((self.io_writes.len() as u64).into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        SIMPLE_BUS_QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = SimpleBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }

    #[test]
    fn undriven_port_reads_ff() {
        let mut bus = SimpleBus::new();
        assert_eq!(bus.read_io(0x00B5), 0xFF);
        bus.set_port(0x00B5, 0x3F);
        assert_eq!(bus.read_io(0x00B5), 0x3F);
    }

    #[test]
    fn take_cycles_restarts_count() {
        let mut bus = SimpleBus::new();
        bus.add_cycles(4);
        bus.add_cycles(7);
        assert_eq!(bus.take_cycles(), Ticks::new(11));
        assert_eq!(bus.query("cycles"), Some(Value::U64(0)));
    }
}
