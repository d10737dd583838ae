//! Deterministic TI-83 emulation core.
//!
//! The crate models everything around the Z80: memory mapping, the port
//! table, the display controller, the keypad matrix and the link port. The
//! Z80 itself is supplied by the host through [`CpuEngine`].

pub mod core;

pub use crate::core::comm::CoreComm;
pub use crate::core::config::{ConfigError, GameInfo};
pub use crate::core::cpu::{CpuBus, CpuEngine};
pub use crate::core::keyboard::{Buttons, Controller, TI83_CONTROLLER};
pub use crate::core::link::{TransferError, TransferResult};
pub use crate::core::memory::{Endian, MemoryDomain, MemoryDomainList};
pub use crate::core::savestate::{StateError, StateResult};
pub use crate::core::system::Ti83;

/// Core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds a machine with no per-title options and no host hooks.
pub fn create_system(rom: Vec<u8>, cpu: Box<dyn CpuEngine>) -> Result<Ti83, ConfigError> {
    Ti83::new(rom, cpu, &GameInfo::default(), CoreComm::new())
}
