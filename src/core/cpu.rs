//! Integration contract for the Z80 execution engine.
//!
//! The core does not interpret instructions itself. Any Z80 implementation can
//! drive the calculator as long as it implements [`CpuEngine`] and routes every
//! memory and port access through the [`CpuBus`] it is handed for the duration
//! of an [`CpuEngine::execute_cycles`] call.

use std::io::{self, BufRead, Write};

/// Callbacks the CPU engine invokes while executing.
pub trait CpuBus {
    /// Memory read (opcode fetches included).
    fn read_memory(&mut self, addr: u16) -> u8;

    /// Memory write.
    fn write_memory(&mut self, addr: u16, value: u8);

    /// `IN` from an I/O port.
    fn read_port(&mut self, port: u16) -> u8;

    /// `OUT` to an I/O port. `pc` is the address of the instruction doing the write.
    fn write_port(&mut self, port: u16, value: u8, pc: u16);

    /// Called once the engine accepted a maskable interrupt.
    fn irq_acknowledge(&mut self) {}

    /// Called once the engine accepted a non-maskable interrupt.
    fn nmi_acknowledge(&mut self) {}
}

/// A pluggable Z80 engine.
///
/// On accepting an IRQ the engine must deassert its own interrupt line before
/// calling [`CpuBus::irq_acknowledge`]; same for the NMI line.
pub trait CpuEngine {
    /// Power-on reset of the register file.
    fn reset(&mut self);

    /// Run for (at least) `cycles` T-states.
    fn execute_cycles(&mut self, cycles: u32, bus: &mut dyn CpuBus);

    fn pc(&self) -> u16;
    fn set_pc(&mut self, pc: u16);

    /// Level of the maskable interrupt line.
    fn interrupt(&self) -> bool;
    fn set_interrupt(&mut self, asserted: bool);
    fn set_nmi(&mut self, asserted: bool);

    fn set_iff(&mut self, iff1: bool, iff2: bool);
    fn set_interrupt_mode(&mut self, mode: u8);

    /// Named registers and flags, for debuggers.
    fn registers(&self) -> Vec<(&'static str, u32)>;

    /// Writes a self-delimited `[Z80]` .. `[/Z80]` block.
    fn save_state_text(&self, writer: &mut dyn Write) -> io::Result<()>;

    /// Reads the block written by `save_state_text`. The `[Z80]` line itself
    /// has already been consumed by the caller.
    fn load_state_text(&mut self, reader: &mut dyn BufRead) -> io::Result<()>;
}
