//! TI-83 address space and I/O ports.
//! Fixed ROM page 0, one switchable ROM window and 32 KiB of RAM.

pub mod bus;
pub mod domain;

pub use bus::Hardware;
pub use domain::{peek, poke, DomainTarget, Endian, MemoryDomain, MemoryDomainList};

/// Size of one ROM page and of each 16 KiB window.
pub const ROM_PAGE_SIZE: usize = 0x4000;

/// Start of the switchable ROM window.
pub const ROM_WINDOW_START: u16 = 0x4000;

/// Start of RAM.
pub const RAM_START: u16 = 0x8000;

/// RAM size (0x8000-0xFFFF).
pub const RAM_SIZE: usize = 0x8000;

/// Name of the RAM domain exported to tools.
pub const MAIN_RAM_DOMAIN: &str = "Main RAM";
