//! CPU core trait.

/// A CPU core that runs one whole instruction per call.
///
/// The bus is passed in, not owned, so it can be shared with the video and
/// audio chips. Timing is reported to the bus as a side effect of the
/// accesses an instruction makes; the CPU keeps no clock of its own.
pub trait Cpu<B: ?Sized> {
    /// The type used for register inspection.
    type Registers;

    /// Execute one instruction, then service whatever interrupt became due.
    fn execute_instruction(&mut self, bus: &mut B);

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true while the CPU is executing HALT.
    fn is_halted(&self) -> bool;

    /// Raise the maskable interrupt line.
    ///
    /// The request stays asserted until the host lowers it again; whether
    /// and when it is accepted is up to the CPU.
    fn interrupt(&mut self);

    /// Request a non-maskable interrupt.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
