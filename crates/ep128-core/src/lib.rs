//! Core traits and types for the Enterprise 128 emulator.
//!
//! The CPU sees the rest of the machine only through the bus traits defined
//! here. Paging, video, audio and tape all live behind them.

mod bus;
mod cpu;
mod observable;
mod simple_bus;
mod ticks;

pub use bus::{Bus, IoBus};
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use simple_bus::SimpleBus;
pub use ticks::Ticks;
