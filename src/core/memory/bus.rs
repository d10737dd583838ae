//! Memory and port dispatcher, called by the CPU engine on every access.

use log::{debug, info, warn};

use crate::core::comm::CoreComm;
use crate::core::config::ConfigError;
use crate::core::cpu::CpuBus;
use crate::core::keyboard::{Buttons, Controller, Keypad};
use crate::core::lcd::Lcd;
use crate::core::link::LinkPort;
use crate::core::memory::{RAM_SIZE, RAM_START, ROM_PAGE_SIZE, ROM_WINDOW_START};

cfg_if::cfg_if! {
    if #[cfg(feature = "trace-bus")] {
        macro_rules! bus_trace {
            ($($arg:tt)*) => { log::trace!(target: "ti83::bus", $($arg)*) };
        }
    } else {
        macro_rules! bus_trace {
            ($($arg:tt)*) => {};
        }
    }
}

pub const PORT_LINK: u8 = 0x00;
pub const PORT_KEYPAD: u8 = 0x01;
pub const PORT_ROM_PAGE: u8 = 0x02;
pub const PORT_STATUS: u8 = 0x03;
pub const PORT_UNUSED: u8 = 0x04;
pub const PORT_LCD_CONTROL: u8 = 0x10;
pub const PORT_LCD_DATA: u8 = 0x11;

bitflags::bitflags! {
    /// Port 3 read value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusBits: u8 {
        /// ON is held and its interrupt is armed.
        const ON_ARMED    = 0x01;
        const LINK_IDLE   = 0x02;
        const ON_RELEASED = 0x08;
    }
}

/// Everything the CPU can reach: ROM, RAM and the peripherals behind ports.
#[derive(Debug)]
pub struct Hardware {
    pub(crate) rom: Vec<u8>,
    pub(crate) ram: Vec<u8>,
    pub(crate) rom_page_low3: u8,
    pub(crate) rom_page_high: u8,
    /// Interrupt mask bit for the ON key (port 3 bit 0).
    pub(crate) mask_on: u8,
    /// ON state sampled at the start of each burst.
    pub(crate) on_pressed: bool,
    pub(crate) keypad: Keypad,
    pub(crate) lcd: Lcd,
    pub(crate) link: LinkPort,
    pub(crate) buttons: Buttons,
    pub(crate) comm: CoreComm,
    /// Cleared whenever the keypad port is touched.
    pub(crate) lagged: bool,
}

impl Hardware {
    /// Takes ownership of the ROM image. Images that are not a whole number
    /// of pages are padded with 0xFF.
    pub fn new(mut rom: Vec<u8>, comm: CoreComm) -> Result<Self, ConfigError> {
        if rom.is_empty() {
            return Err(ConfigError::EmptyRom);
        }
        if rom.len() % ROM_PAGE_SIZE != 0 {
            warn!(
                "ROM size {:#X} is not a multiple of {:#X}, padding",
                rom.len(),
                ROM_PAGE_SIZE
            );
            let padded = rom.len().div_ceil(ROM_PAGE_SIZE) * ROM_PAGE_SIZE;
            rom.resize(padded, 0xFF);
        }
        info!("ROM loaded: {} pages", rom.len() / ROM_PAGE_SIZE);

        Ok(Self {
            rom,
            ram: vec![0xFF; RAM_SIZE],
            rom_page_low3: 0,
            rom_page_high: 0,
            mask_on: 1,
            on_pressed: false,
            keypad: Keypad::new(),
            lcd: Lcd::new(),
            link: LinkPort::new(),
            buttons: Buttons::empty(),
            comm,
            lagged: false,
        })
    }

    /// Power-on register state. VRAM and ROM are kept.
    pub fn reset(&mut self) {
        self.ram.fill(0xFF);
        self.rom_page_low3 = 0;
        self.rom_page_high = 0;
        self.mask_on = 1;
        self.on_pressed = false;
        self.keypad.set_mask(0);
        self.lcd.reset();
        self.link.reset();
    }

    pub fn rom_pages(&self) -> usize {
        self.rom.len() / ROM_PAGE_SIZE
    }

    /// Page mapped at 0x4000-0x7FFF.
    pub fn rom_page(&self) -> usize {
        let page = (self.rom_page_low3 | (self.rom_page_high << 3)) as usize;
        page % self.rom_pages()
    }

    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut [u8] {
        &mut self.ram
    }

    pub fn lcd(&self) -> &Lcd {
        &self.lcd
    }

    pub fn link(&self) -> &LinkPort {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut LinkPort {
        &mut self.link
    }

    pub fn buttons(&self) -> Buttons {
        self.buttons
    }

    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.buttons = buttons;
    }

    /// Latches the ON key for the coming burst.
    pub(crate) fn sample_on_key(&mut self) {
        self.on_pressed = self.buttons.is_pressed("ON");
    }

    fn read_rom(&self, addr: u16) -> u8 {
        let offset = if addr < ROM_WINDOW_START {
            addr as usize
        } else {
            self.rom_page() * ROM_PAGE_SIZE + (addr - ROM_WINDOW_START) as usize
        };
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    fn link_port_value(&mut self) -> u8 {
        self.link.update();
        (self.rom_page_high << 4) | (self.link.state() << 2) | self.link.output()
    }

    fn status_port_value(&self) -> u8 {
        let mut status = if self.on_pressed {
            StatusBits::from_bits_truncate(self.mask_on & 1)
        } else {
            StatusBits::ON_RELEASED
        };
        status.set(StatusBits::LINK_IDLE, !self.link.is_active());
        status.bits()
    }
}

impl CpuBus for Hardware {
    fn read_memory(&mut self, addr: u16) -> u8 {
        self.comm.call_read(addr);
        if addr < RAM_START {
            self.read_rom(addr)
        } else {
            self.ram[(addr - RAM_START) as usize]
        }
    }

    fn write_memory(&mut self, addr: u16, value: u8) {
        self.comm.call_write(addr);
        if addr >= RAM_START {
            self.ram[(addr - RAM_START) as usize] = value;
        } else {
            bus_trace!("write to ROM {:04X} = {:02X} ignored", addr, value);
        }
    }

    fn read_port(&mut self, port: u16) -> u8 {
        let value = match port as u8 {
            PORT_LINK => self.link_port_value(),
            PORT_KEYPAD => {
                self.comm.call_input_poll();
                self.lagged = false;
                self.keypad.read(&self.buttons)
            }
            PORT_ROM_PAGE => self.rom_page_low3,
            PORT_STATUS => self.status_port_value(),
            PORT_UNUSED => 0xFF,
            PORT_LCD_CONTROL => 0xFF,
            PORT_LCD_DATA => self.lcd.read_data(),
            _ => 0xFF,
        };
        bus_trace!("in  {:02X} -> {:02X}", port as u8, value);
        value
    }

    fn write_port(&mut self, port: u16, value: u8, pc: u16) {
        bus_trace!("out {:02X} <- {:02X} (pc {:04X})", port as u8, value, pc);
        match port as u8 {
            PORT_LINK => {
                self.rom_page_high = (value >> 4) & 1;
                self.link.set_output(value);
                if self.link.is_active() {
                    // Boot code in page 0 drives the lines without a peer.
                    if pc < ROM_WINDOW_START {
                        return;
                    }
                    self.link.update();
                }
            }
            PORT_KEYPAD => {
                self.lagged = false;
                self.keypad.set_mask(value);
            }
            PORT_ROM_PAGE => {
                self.rom_page_low3 = value & 7;
                debug!("ROM page select {}", self.rom_page());
            }
            PORT_STATUS => self.mask_on = value & 1,
            PORT_LCD_CONTROL => self.lcd.write_control(value),
            PORT_LCD_DATA => self.lcd.write_data(value),
            _ => {}
        }
    }

    fn irq_acknowledge(&mut self) {
        self.comm.call_interrupt();
    }

    fn nmi_acknowledge(&mut self) {
        self.comm.call_interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// ROM where every byte holds its page number.
    fn paged_rom(pages: usize) -> Vec<u8> {
        (0..pages)
            .flat_map(|p| std::iter::repeat(p as u8).take(ROM_PAGE_SIZE))
            .collect()
    }

    fn hardware(pages: usize) -> Hardware {
        Hardware::new(paged_rom(pages), CoreComm::new()).unwrap()
    }

    #[test]
    fn test_rom_window_follows_page_registers() {
        let mut hw = hardware(16);
        assert_eq!(hw.read_memory(0x4000), 0);

        hw.write_port(PORT_ROM_PAGE as u16, 0x05, 0x8000);
        assert_eq!(hw.read_memory(0x4000), 5);
        assert_eq!(hw.read_port(PORT_ROM_PAGE as u16), 5);

        hw.write_port(PORT_LINK as u16, 0x10, 0x8000);
        assert_eq!(hw.read_memory(0x7FFF), 13);
        assert_eq!(hw.read_memory(0x0000), 0);
    }

    #[test]
    fn test_rom_page_wraps_page_count() {
        let mut hw = hardware(4);
        hw.write_port(PORT_ROM_PAGE as u16, 0x06, 0x8000);
        assert_eq!(hw.rom_page(), 2);
        assert_eq!(hw.read_memory(0x4123), 2);
    }

    #[test]
    fn test_rom_is_read_only() {
        let mut hw = hardware(2);
        hw.write_memory(0x0010, 0xAA);
        hw.write_memory(0x4010, 0xAA);
        assert_eq!(hw.read_memory(0x0010), 0);
        assert_eq!(hw.read_memory(0x4010), 0);
    }

    #[test]
    fn test_short_rom_is_padded() {
        let hw = Hardware::new(vec![0x00; 0x5000], CoreComm::new()).unwrap();
        assert_eq!(hw.rom_pages(), 2);
        assert_eq!(hw.rom[0x7FFF], 0xFF);
        assert!(matches!(
            Hardware::new(Vec::new(), CoreComm::new()),
            Err(ConfigError::EmptyRom)
        ));
    }

    #[test]
    fn test_hooks_fire_for_rom_and_ram() {
        let reads = Rc::new(RefCell::new(Vec::new()));
        let writes = Rc::new(RefCell::new(Vec::new()));
        let r = reads.clone();
        let w = writes.clone();
        let comm = CoreComm::new()
            .with_read_hook(move |a| r.borrow_mut().push(a))
            .with_write_hook(move |a| w.borrow_mut().push(a));
        let mut hw = Hardware::new(paged_rom(1), comm).unwrap();

        hw.read_memory(0x0100);
        hw.read_memory(0x9000);
        hw.write_memory(0x0200, 1);
        hw.write_memory(0xC000, 1);

        assert_eq!(*reads.borrow(), vec![0x0100, 0x9000]);
        assert_eq!(*writes.borrow(), vec![0x0200, 0xC000]);
    }

    #[test]
    fn test_interrupt_acknowledge_calls_hook() {
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let comm = CoreComm::new().with_interrupt_hook(move || *c.borrow_mut() += 1);
        let mut hw = Hardware::new(paged_rom(1), comm).unwrap();

        hw.irq_acknowledge();
        assert_eq!(*calls.borrow(), 1);
        hw.nmi_acknowledge();
        assert_eq!(*calls.borrow(), 2);

        // Without a hook both acknowledges are silent.
        let mut hw = hardware(1);
        hw.irq_acknowledge();
        hw.nmi_acknowledge();
    }

    #[test]
    fn test_keypad_port_clears_lag_and_polls() {
        let polls = Rc::new(RefCell::new(0));
        let p = polls.clone();
        let comm = CoreComm::new().with_input_poll_hook(move || *p.borrow_mut() += 1);
        let mut hw = Hardware::new(paged_rom(1), comm).unwrap();
        hw.set_buttons(Buttons::ENTER);

        hw.lagged = true;
        hw.write_port(PORT_KEYPAD as u16, 0xFD, 0x8000);
        assert!(!hw.lagged);

        hw.lagged = true;
        assert_eq!(hw.read_port(PORT_KEYPAD as u16), 0xFE);
        assert!(!hw.lagged);
        assert_eq!(*polls.borrow(), 1);
    }

    #[test]
    fn test_status_port() {
        let mut hw = hardware(1);
        assert_eq!(hw.read_port(PORT_STATUS as u16), 0x08 | 0x02);

        hw.set_buttons(Buttons::ON);
        hw.sample_on_key();
        assert_eq!(hw.read_port(PORT_STATUS as u16), 0x01 | 0x02);

        hw.write_port(PORT_STATUS as u16, 0xFE, 0x8000);
        assert_eq!(hw.read_port(PORT_STATUS as u16), 0x02);

        hw.link.set_active(true);
        assert_eq!(hw.read_port(PORT_STATUS as u16), 0x00);
    }

    #[test]
    fn test_unmapped_ports() {
        let mut hw = hardware(1);
        for port in [0x04u16, 0x05, 0x10, 0x20, 0xFF] {
            assert_eq!(hw.read_port(port), 0xFF);
        }
        let before = hw.ram.clone();
        hw.write_port(0x20, 0x55, 0x8000);
        assert_eq!(hw.ram, before);
    }

    #[test]
    fn test_link_port_value() {
        let mut hw = hardware(1);
        hw.write_port(PORT_LINK as u16, 0x11, 0x8000);
        // High page bit, lines idle except our own pull on line 0.
        assert_eq!(hw.read_port(PORT_LINK as u16), 0x10 | (0x02 << 2) | 0x01);
    }

    #[test]
    fn test_link_write_from_page_zero_skips_tick() {
        let file = crate::core::link::container::build(0x05, "A", &[1]);
        let mut hw = hardware(1);
        hw.link.send_file(file, true).unwrap();

        // First read starts the first bit.
        hw.read_port(PORT_LINK as u16);
        let input = hw.link.input();
        assert_ne!(input, 0);

        // Acknowledge from page 0: output latched, no step taken.
        hw.write_port(PORT_LINK as u16, input ^ 3, 0x1000);
        assert_eq!(hw.link.output(), input ^ 3);
        assert_eq!(hw.link.input(), input);

        // Same write from RAM advances past the wait.
        hw.write_port(PORT_LINK as u16, input ^ 3, 0x9000);
        hw.read_port(PORT_LINK as u16);
        assert_eq!(hw.link.input(), 0);
    }

    #[test]
    fn test_lcd_ports() {
        let mut hw = hardware(1);
        hw.write_port(PORT_LCD_CONTROL as u16, 0x01, 0x8000);
        hw.write_port(PORT_LCD_CONTROL as u16, 0x05, 0x8000);
        hw.write_port(PORT_LCD_DATA as u16, 0x81, 0x8000);
        assert_eq!(hw.lcd.vram()[0], 0x81);
        assert_eq!(hw.read_port(PORT_LCD_CONTROL as u16), 0xFF);
    }

    #[test]
    fn test_reset_keeps_vram() {
        let mut hw = hardware(2);
        hw.write_port(PORT_LCD_CONTROL as u16, 0x01, 0x8000);
        hw.write_port(PORT_LCD_DATA as u16, 0x42, 0x8000);
        hw.write_port(PORT_ROM_PAGE as u16, 1, 0x8000);
        hw.write_memory(0x8000, 0);
        hw.reset();
        assert_eq!(hw.rom_page(), 0);
        assert_eq!(hw.ram[0], 0xFF);
        assert_eq!(hw.lcd.mode(), 0);
        assert_eq!(hw.lcd.vram()[0], 0x42);
        assert_eq!(hw.mask_on, 1);
    }

    proptest! {
        #[test]
        fn page_zero_ignores_mapping(low in any::<u8>(), high in any::<u8>(), addr in 0u16..0x4000) {
            let mut hw = hardware(8);
            hw.write_port(PORT_ROM_PAGE as u16, low, 0x8000);
            hw.write_port(PORT_LINK as u16, high & 0xFC, 0x8000);
            prop_assert_eq!(hw.read_memory(addr), 0);
        }

        #[test]
        fn ram_round_trip(addr in 0x8000u16..=0xFFFF, value in any::<u8>()) {
            let mut hw = hardware(1);
            hw.write_memory(addr, value);
            prop_assert_eq!(hw.read_memory(addr), value);
        }
    }
}
