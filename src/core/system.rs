//! The TI-83 machine: CPU engine, bus and frame scheduling.

use std::fs;
use std::path::Path;

use log::info;

use crate::core::comm::CoreComm;
use crate::core::config::{resolve_init_pc, ConfigError, GameInfo};
use crate::core::cpu::CpuEngine;
use crate::core::keyboard::{Buttons, ControllerDefinition, TI83_CONTROLLER};
use crate::core::lcd::{LCD_HEIGHT, LCD_WIDTH};
use crate::core::link::{LinkPort, TransferResult};
use crate::core::memory::{
    peek, poke, DomainTarget, Endian, Hardware, MemoryDomain, MemoryDomainList, MAIN_RAM_DOMAIN,
    RAM_SIZE,
};

pub const SYSTEM_ID: &str = "TI83";

/// T-states per burst; one interrupt is raised after each.
pub const CYCLES_PER_BURST: u32 = 10_000;
pub const BURSTS_PER_FRAME: u32 = 5;

/// Stereo sample frames produced per emulated frame (44.1 kHz / 60).
pub const SAMPLES_PER_FRAME: usize = 735;

pub const VIRTUAL_WIDTH: usize = LCD_WIDTH;
pub const VIRTUAL_HEIGHT: usize = LCD_HEIGHT;
pub const BUFFER_WIDTH: usize = LCD_WIDTH;
pub const BUFFER_HEIGHT: usize = LCD_HEIGHT;
pub const BACKGROUND_COLOR: u32 = 0;

pub struct Ti83 {
    pub(crate) cpu: Box<dyn CpuEngine>,
    pub(crate) hw: Hardware,
    pub(crate) start_pc: u16,
    pub(crate) frame: i32,
    pub(crate) lag_count: i32,
    pub(crate) is_lag: bool,
    domains: MemoryDomainList,
}

impl std::fmt::Debug for Ti83 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ti83")
            .field("start_pc", &self.start_pc)
            .field("frame", &self.frame)
            .field("lag_count", &self.lag_count)
            .field("is_lag", &self.is_lag)
            .field("hw", &self.hw)
            .finish_non_exhaustive()
    }
}

impl Ti83 {
    /// Builds a machine around `rom` and hard-resets it.
    ///
    /// The boot PC comes from the `initPC` option of `game`, or from the
    /// boot signature scan when the option is absent.
    pub fn new(
        rom: Vec<u8>,
        cpu: Box<dyn CpuEngine>,
        game: &GameInfo,
        comm: CoreComm,
    ) -> Result<Self, ConfigError> {
        let start_pc = resolve_init_pc(game, &rom)?;
        let hw = Hardware::new(rom, comm)?;
        let domains = MemoryDomainList::new(vec![MemoryDomain::new(
            MAIN_RAM_DOMAIN,
            RAM_SIZE,
            Endian::Little,
            DomainTarget::MainRam,
        )]);

        let mut machine = Self {
            cpu,
            hw,
            start_pc,
            frame: 0,
            lag_count: 0,
            is_lag: false,
            domains,
        };
        machine.hard_reset();
        info!("TI-83 core created, start PC {:04X}", start_pc);
        Ok(machine)
    }

    pub fn hard_reset(&mut self) {
        self.cpu.reset();
        self.hw.reset();
        self.cpu.set_pc(self.start_pc);
        self.cpu.set_iff(false, false);
        self.cpu.set_interrupt_mode(2);
        info!("hard reset");
    }

    /// Runs one frame with `buttons` held.
    pub fn frame_advance(&mut self, buttons: Buttons) {
        self.hw.set_buttons(buttons);
        self.hw.lagged = true;

        for _ in 0..BURSTS_PER_FRAME {
            self.hw.sample_on_key();
            self.cpu.execute_cycles(CYCLES_PER_BURST, &mut self.hw);
            self.cpu.set_interrupt(true);
        }

        self.frame = self.frame.wrapping_add(1);
        if self.hw.lagged {
            self.lag_count = self.lag_count.wrapping_add(1);
            self.is_lag = true;
        } else {
            self.is_lag = false;
        }
    }

    pub fn frame(&self) -> i32 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.frame = frame;
    }

    pub fn lag_count(&self) -> i32 {
        self.lag_count
    }

    pub fn set_lag_count(&mut self, lag_count: i32) {
        self.lag_count = lag_count;
    }

    pub fn is_lag_frame(&self) -> bool {
        self.is_lag
    }

    pub fn reset_counters(&mut self) {
        self.frame = 0;
        self.lag_count = 0;
        self.is_lag = false;
    }

    pub fn start_pc(&self) -> u16 {
        self.start_pc
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hw
    }

    pub fn link(&self) -> &LinkPort {
        self.hw.link()
    }

    pub fn controller_definition(&self) -> &'static ControllerDefinition {
        &TI83_CONTROLLER
    }

    /// Current display contents, ARGB, row-major.
    pub fn video_buffer(&self) -> Vec<u32> {
        self.hw.lcd().render()
    }

    /// Display contents as native-endian bytes, four per pixel.
    pub fn video_buffer_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.video_buffer()).to_vec()
    }

    /// One frame of interleaved stereo samples; this machine has no sound.
    pub fn sync_sound(&self) -> Vec<i16> {
        vec![0; SAMPLES_PER_FRAME * 2]
    }

    pub fn cpu_flags_and_registers(&self) -> Vec<(&'static str, u32)> {
        self.cpu.registers()
    }

    pub fn memory_domains(&self) -> &MemoryDomainList {
        &self.domains
    }

    /// Reads a byte through a named domain. Unknown names read as `None`.
    pub fn peek_domain(&self, name: &str, addr: u32) -> Option<u8> {
        let domain = self.domains.get(name)?;
        match domain.target {
            DomainTarget::MainRam => Some(peek(domain, self.hw.ram(), addr)),
        }
    }

    /// Writes a byte through a named domain. Returns `false` for unknown names.
    pub fn poke_domain(&mut self, name: &str, addr: u32, value: u8) -> bool {
        let Some(domain) = self.domains.get(name) else {
            return false;
        };
        match domain.target {
            DomainTarget::MainRam => poke(domain, self.hw.ram_mut(), addr, value),
        }
        true
    }

    /// Queues a variable file on the link port.
    pub fn send_file(&mut self, bytes: Vec<u8>, verify: bool) -> TransferResult<()> {
        self.hw.link_mut().send_file(bytes, verify)
    }

    pub fn send_file_from_path<P: AsRef<Path>>(&mut self, path: P, verify: bool) -> TransferResult<()> {
        let bytes = fs::read(path.as_ref())?;
        info!("link: loading {}", path.as_ref().display());
        self.send_file(bytes, verify)
    }

    pub fn read_save_ram(&self) -> Option<Vec<u8>> {
        None
    }

    pub fn store_save_ram(&mut self, _data: &[u8]) {}

    pub fn clear_save_ram(&mut self) {}

    pub fn save_ram_modified(&self) -> bool {
        false
    }

    pub fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    pub fn board_name(&self) -> Option<&'static str> {
        None
    }

    pub fn deterministic_emulation(&self) -> bool {
        true
    }
}
