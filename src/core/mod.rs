//! Hardware components of the TI-83, one module per chip or subsystem.

pub mod comm;
pub mod config;
pub mod cpu;
pub mod keyboard;
pub mod lcd;
pub mod link;
pub mod memory;
pub mod savestate;
pub mod system;
