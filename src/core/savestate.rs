//! Save states.
//!
//! The text form is a `[TI83]` .. `[/TI83]` block of `key value` lines with
//! the CPU engine's own `[Z80]` block nested inside. Buffers are upper-case
//! hex, booleans are `True`/`False`. The binary form carries nothing for this
//! machine.
//!
//! A link transfer in progress (queued bytes, pending stage, open file) is
//! not part of the state.

use std::io::{self, BufRead, Write};

use log::{debug, warn};
use num_traits::Num;
use thiserror::Error;

use crate::core::lcd::AutoMove;
use crate::core::system::Ti83;

const BLOCK_START: &str = "[TI83]";
const BLOCK_END: &str = "[/TI83]";
const CPU_BLOCK_START: &str = "[Z80]";

#[derive(Debug, Error)]
pub enum StateError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("state ended before [/TI83]")]
    UnexpectedEof,
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("invalid hex data for {key}")]
    InvalidHex { key: String },
    #[error("{key}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
}

pub type StateResult<T> = Result<T, StateError>;

fn write_hex(writer: &mut dyn Write, data: &[u8]) -> io::Result<()> {
    for byte in data {
        write!(writer, "{:02X}", byte)?;
    }
    Ok(())
}

fn parse_num<T: Num>(key: &str, value: Option<&str>) -> StateResult<T> {
    let raw = value.unwrap_or("");
    T::from_str_radix(raw, 10).map_err(|_| StateError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

fn parse_bool(key: &str, value: Option<&str>) -> StateResult<bool> {
    match value {
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(StateError::InvalidValue {
            key: key.to_string(),
            value: other.unwrap_or("").to_string(),
        }),
    }
}

/// Decodes hex into `dest`, which must match the encoded length exactly.
fn parse_hex(key: &str, value: Option<&str>, dest: &mut [u8]) -> StateResult<()> {
    let raw = value.unwrap_or("");
    if !raw.is_ascii() || raw.len() % 2 != 0 {
        return Err(StateError::InvalidHex { key: key.to_string() });
    }
    if raw.len() / 2 != dest.len() {
        return Err(StateError::SizeMismatch {
            key: key.to_string(),
            expected: dest.len(),
            actual: raw.len() / 2,
        });
    }
    for (i, byte) in dest.iter_mut().enumerate() {
        *byte = <u8 as Num>::from_str_radix(&raw[i * 2..i * 2 + 2], 16)
            .map_err(|_| StateError::InvalidHex { key: key.to_string() })?;
    }
    Ok(())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

impl Ti83 {
    pub fn save_state_text(&self, writer: &mut dyn Write) -> io::Result<()> {
        let hw = &self.hw;
        writeln!(writer, "{}", BLOCK_START)?;
        writeln!(writer)?;
        writeln!(writer, "Frame {}", self.frame)?;
        self.cpu.save_state_text(writer)?;
        write!(writer, "RAM ")?;
        write_hex(writer, &hw.ram)?;
        writeln!(writer)?;
        writeln!(writer, "romPageLow3Bits {}", hw.rom_page_low3)?;
        writeln!(writer, "romPageHighBit {}", hw.rom_page_high)?;
        writeln!(writer, "disp_mode {}", hw.lcd.mode)?;
        writeln!(writer, "disp_move {}", hw.lcd.auto_move as u8)?;
        writeln!(writer, "disp_x {}", hw.lcd.x)?;
        writeln!(writer, "disp_y {}", hw.lcd.y)?;
        writeln!(writer, "m_CursorMoved {}", bool_text(hw.lcd.cursor_moved))?;
        writeln!(writer, "maskOn {}", hw.mask_on)?;
        writeln!(writer, "onPressed {}", bool_text(hw.on_pressed))?;
        writeln!(writer, "keyboardMask {}", hw.keypad.mask())?;
        writeln!(writer, "m_LinkOutput {}", hw.link.output())?;
        writeln!(writer, "m_LinkInput {}", hw.link.input())?;
        writeln!(writer, "lag {}", self.lag_count)?;
        writeln!(writer, "islag {}", bool_text(self.is_lag))?;
        write!(writer, "vram ")?;
        write_hex(writer, &hw.lcd.vram)?;
        writeln!(writer)?;
        writeln!(writer, "LinkActive {}", bool_text(hw.link.is_active()))?;
        writeln!(writer, "{}", BLOCK_END)
    }

    /// Restores a block written by [`Ti83::save_state_text`]. Unknown keys
    /// are skipped with a warning.
    pub fn load_state_text(&mut self, reader: &mut dyn BufRead) -> StateResult<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(StateError::UnexpectedEof);
            }
            let mut args = line.split_whitespace();
            let Some(key) = args.next() else {
                continue;
            };
            let value = args.next();
            let hw = &mut self.hw;

            match key {
                BLOCK_START => {}
                BLOCK_END => break,
                CPU_BLOCK_START => self.cpu.load_state_text(reader)?,
                "Frame" => self.frame = parse_num(key, value)?,
                "RAM" => parse_hex(key, value, &mut hw.ram)?,
                "romPageLow3Bits" => hw.rom_page_low3 = parse_num(key, value)?,
                "romPageHighBit" => hw.rom_page_high = parse_num(key, value)?,
                "disp_mode" => hw.lcd.mode = parse_num(key, value)?,
                "disp_move" => hw.lcd.auto_move = AutoMove::from_bits(parse_num(key, value)?),
                "disp_x" => hw.lcd.x = parse_num(key, value)?,
                "disp_y" => hw.lcd.y = parse_num(key, value)?,
                "m_CursorMoved" => hw.lcd.cursor_moved = parse_bool(key, value)?,
                "maskOn" => hw.mask_on = parse_num(key, value)?,
                "onPressed" => hw.on_pressed = parse_bool(key, value)?,
                "keyboardMask" => hw.keypad.set_mask(parse_num(key, value)?),
                "m_LinkOutput" => hw.link.set_output(parse_num(key, value)?),
                "m_LinkInput" => hw.link.set_input(parse_num(key, value)?),
                "lag" => self.lag_count = parse_num(key, value)?,
                "islag" => self.is_lag = parse_bool(key, value)?,
                "vram" => parse_hex(key, value, &mut hw.lcd.vram)?,
                "LinkActive" => hw.link.set_active(parse_bool(key, value)?),
                _ => warn!("Skipping unrecognized identifier {}", key),
            }
        }
        debug!("state loaded at frame {}", self.frame);
        Ok(())
    }

    /// The binary form is empty for this machine.
    pub fn save_state_binary(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn load_state_binary(&mut self, _data: &[u8]) {}

    pub fn binary_save_states_preferred(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comm::CoreComm;
    use crate::core::config::GameInfo;
    use crate::core::cpu::testing::{BusOp, ScriptedCpu};
    use crate::core::keyboard::Buttons;
    use std::io::Cursor;

    fn machine(cpu: ScriptedCpu) -> Ti83 {
        Ti83::new(vec![0u8; 0x4000 * 16], Box::new(cpu), &GameInfo::default(), CoreComm::new())
            .unwrap()
    }

    fn save(ti: &Ti83) -> String {
        let mut out = Vec::new();
        ti.save_state_text(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn load(ti: &mut Ti83, text: &str) -> StateResult<()> {
        ti.load_state_text(&mut Cursor::new(text.as_bytes()))
    }

    fn busy_machine() -> Ti83 {
        busy_machine_then(Vec::new())
    }

    /// Display writes at a new cursor, relying on the saved auto-move.
    fn display_burst() -> Vec<BusOp> {
        vec![
            BusOp::Out(0x10, 0x80 | 10),
            BusOp::Out(0x10, 0x20 | 2),
            BusOp::Out(0x11, 0x5A),
            BusOp::Out(0x11, 0xC3),
        ]
    }

    /// Runs two frames; `later` is queued as the first burst of the third.
    fn busy_machine_then(later: Vec<BusOp>) -> Ti83 {
        let mut cpu = ScriptedCpu::new();
        cpu.push_burst(vec![
            BusOp::Jump(0x9D95),
            BusOp::Write(0x8000, 0x12),
            BusOp::Write(0xFFFF, 0x34),
            BusOp::Out(0x02, 0x03),
            BusOp::Out(0x00, 0x11),
            BusOp::Out(0x10, 0x01),
            BusOp::Out(0x10, 0x07),
            BusOp::Out(0x10, 0x85),
            BusOp::Out(0x10, 0x23),
            BusOp::Out(0x11, 0xA5),
            BusOp::Out(0x03, 0x00),
            BusOp::Out(0x01, 0xBF),
        ]);
        for _ in 1..10 {
            cpu.push_burst(vec![]);
        }
        cpu.push_burst(later);
        let mut ti = machine(cpu);
        ti.frame_advance(Buttons::ON);
        ti.frame_advance(Buttons::empty());
        ti
    }

    #[test]
    fn test_text_round_trip() {
        let ti = busy_machine();
        let text = save(&ti);
        assert!(text.starts_with("[TI83]\n\nFrame 2\n[Z80]\nPC 9D95\n"));
        assert!(text.contains("\nromPageLow3Bits 3\n"));
        assert!(text.contains("\nromPageHighBit 1\n"));
        assert!(text.contains("\ndisp_move 3\n"));
        assert!(text.contains("\nm_CursorMoved True\n"));
        assert!(text.contains("\nkeyboardMask 191\n"));
        assert!(text.contains("\nlag 1\nislag True\n"));
        assert!(text.contains("\nLinkActive False\n"));
        assert!(text.ends_with("[/TI83]\n"));

        let mut restored = machine(ScriptedCpu::new());
        load(&mut restored, &text).unwrap();

        assert_eq!(save(&restored), text);
        assert_eq!(restored.frame(), 2);
        assert_eq!(restored.lag_count(), 1);
        assert_eq!(restored.hardware().rom_page(), 11);
        assert_eq!(restored.hardware().ram()[0], 0x12);
        assert_eq!(restored.hardware().ram()[0x7FFF], 0x34);
        assert_eq!(restored.video_buffer(), ti.video_buffer());
        assert_eq!(restored.cpu_flags_and_registers(), ti.cpu_flags_and_registers());
    }

    #[test]
    fn test_same_input_after_restore_gives_same_frame() {
        let mut ti = busy_machine_then(display_burst());
        let text = save(&ti);
        let before = ti.video_buffer();

        let mut cpu = ScriptedCpu::new();
        cpu.push_burst(display_burst());
        let mut restored = machine(cpu);
        load(&mut restored, &text).unwrap();

        ti.frame_advance(Buttons::KEY_1);
        restored.frame_advance(Buttons::KEY_1);

        assert_ne!(ti.video_buffer(), before);
        assert_eq!(restored.video_buffer(), ti.video_buffer());
        assert_eq!(restored.frame(), 3);
        assert_eq!(save(&restored), save(&ti));
    }

    #[test]
    fn test_booleans_case_insensitive_and_unknown_keys() {
        let mut ti = machine(ScriptedCpu::new());
        load(&mut ti, "[TI83]\n\nislag TRUE\nonPressed true\nFuture 12\n[/TI83]\n").unwrap();
        assert!(ti.is_lag_frame());
        assert!(ti.hardware().on_pressed);
    }

    #[test]
    fn test_load_errors() {
        let mut ti = machine(ScriptedCpu::new());
        assert!(matches!(
            load(&mut ti, "[TI83]\nFrame 3\n"),
            Err(StateError::UnexpectedEof)
        ));
        assert!(matches!(
            load(&mut ti, "[TI83]\nFrame x\n[/TI83]\n"),
            Err(StateError::InvalidValue { .. })
        ));
        assert!(matches!(
            load(&mut ti, "[TI83]\nislag maybe\n[/TI83]\n"),
            Err(StateError::InvalidValue { .. })
        ));
        assert!(matches!(
            load(&mut ti, "[TI83]\nvram 00FF\n[/TI83]\n"),
            Err(StateError::SizeMismatch { expected: 0x300, actual: 2, .. })
        ));
        let bad_hex = format!("[TI83]\nvram {}G\n[/TI83]\n", "0".repeat(0x5FF));
        assert!(matches!(
            load(&mut ti, &bad_hex),
            Err(StateError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_binary_state_is_empty() {
        let mut ti = busy_machine();
        assert!(ti.save_state_binary().is_empty());
        let before = save(&ti);
        ti.load_state_binary(&[1, 2, 3]);
        assert_eq!(save(&ti), before);
        assert!(!ti.binary_save_states_preferred());
    }
}
