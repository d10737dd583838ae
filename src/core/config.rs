//! Per-title configuration and boot entry point detection.

use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

/// Game database option holding the boot PC as bare hex (e.g. `"6CE"`).
pub const INIT_PC_OPTION: &str = "initPC";

/// Little-endian dword found at the boot entry point of known ROM revisions.
const BOOT_SIGNATURE: u32 = 0x04D3_163E;

/// Known entry points, tried in order.
const BOOT_SIGNATURE_OFFSETS: [u16; 2] = [0x06CE, 0x06F6];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initPC option is not a 16-bit hex value: {0:?}")]
    InvalidInitPc(String),
    #[error("ROM image is empty")]
    EmptyRom,
}

/// Game database entry for the loaded ROM, as supplied by the host.
#[derive(Debug, Clone, Default)]
pub struct GameInfo {
    pub name: String,
    pub hash: String,
    pub options: HashMap<String, String>,
}

impl GameInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option_value(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Boot PC override from the database, if any.
    pub fn init_pc(&self) -> Result<Option<u16>, ConfigError> {
        match self.option_value(INIT_PC_OPTION) {
            None => Ok(None),
            Some(raw) => {
                let trimmed = raw.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                u16::from_str_radix(digits, 16)
                    .map(Some)
                    .map_err(|_| ConfigError::InvalidInitPc(raw.to_string()))
            }
        }
    }
}

/// Scans the ROM for the boot signature at the known entry points.
pub fn detect_init_pc(rom: &[u8]) -> Option<u16> {
    BOOT_SIGNATURE_OFFSETS.iter().copied().find(|&offset| {
        let start = offset as usize;
        rom.get(start..start + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) == BOOT_SIGNATURE)
            .unwrap_or(false)
    })
}

/// Chooses the initial PC: database override first, then signature scan, then 0.
pub fn resolve_init_pc(game: &GameInfo, rom: &[u8]) -> Result<u16, ConfigError> {
    if let Some(pc) = game.init_pc()? {
        info!("Using initPC {:04X} from game database ({})", pc, game.name);
        return Ok(pc);
    }
    match detect_init_pc(rom) {
        Some(pc) => {
            info!("Boot signature found, initPC {:04X}", pc);
            Ok(pc)
        }
        None => {
            debug!("No initPC override or boot signature, starting at 0000");
            Ok(0)
        }
    }
}
