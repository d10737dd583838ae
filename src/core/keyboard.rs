//! Keypad matrix and controller definition.
//!
//! The keypad is read through port 1: the CPU writes a row-select mask (a
//! clear bit selects a group) and reads back a byte where every pressed key
//! in a selected group has its bit cleared.

use bitflags::bitflags;

bitflags! {
    /// Pressed state of every calculator key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u64 {
        const KEY_0     = 1 << 0;
        const KEY_1     = 1 << 1;
        const KEY_2     = 1 << 2;
        const KEY_3     = 1 << 3;
        const KEY_4     = 1 << 4;
        const KEY_5     = 1 << 5;
        const KEY_6     = 1 << 6;
        const KEY_7     = 1 << 7;
        const KEY_8     = 1 << 8;
        const KEY_9     = 1 << 9;
        const DOT       = 1 << 10;
        const ON        = 1 << 11;
        const ENTER     = 1 << 12;
        const DOWN      = 1 << 13;
        const LEFT      = 1 << 14;
        const UP        = 1 << 15;
        const RIGHT     = 1 << 16;
        const PLUS      = 1 << 17;
        const MINUS     = 1 << 18;
        const MULTIPLY  = 1 << 19;
        const DIVIDE    = 1 << 20;
        const CLEAR     = 1 << 21;
        const EXP       = 1 << 22;
        const DASH      = 1 << 23;
        const PARACLOSE = 1 << 24;
        const TAN       = 1 << 25;
        const VARS      = 1 << 26;
        const PARAOPEN  = 1 << 27;
        const COS       = 1 << 28;
        const PRGM      = 1 << 29;
        const STAT      = 1 << 30;
        const COMMA     = 1 << 31;
        const SIN       = 1 << 32;
        const MATRIX    = 1 << 33;
        const X         = 1 << 34;
        const STO       = 1 << 35;
        const LN        = 1 << 36;
        const LOG       = 1 << 37;
        const SQUARED   = 1 << 38;
        const NEG1      = 1 << 39;
        const MATH      = 1 << 40;
        const ALPHA     = 1 << 41;
        const GRAPH     = 1 << 42;
        const TRACE     = 1 << 43;
        const ZOOM      = 1 << 44;
        const WINDOW    = 1 << 45;
        const Y         = 1 << 46;
        const SECOND    = 1 << 47;
        const MODE      = 1 << 48;
        const DEL       = 1 << 49;
    }
}

/// Button names in controller-definition order, paired with their flag.
pub const BUTTON_NAMES: [(&str, Buttons); 50] = [
    ("0", Buttons::KEY_0),
    ("1", Buttons::KEY_1),
    ("2", Buttons::KEY_2),
    ("3", Buttons::KEY_3),
    ("4", Buttons::KEY_4),
    ("5", Buttons::KEY_5),
    ("6", Buttons::KEY_6),
    ("7", Buttons::KEY_7),
    ("8", Buttons::KEY_8),
    ("9", Buttons::KEY_9),
    ("DOT", Buttons::DOT),
    ("ON", Buttons::ON),
    ("ENTER", Buttons::ENTER),
    ("DOWN", Buttons::DOWN),
    ("LEFT", Buttons::LEFT),
    ("UP", Buttons::UP),
    ("RIGHT", Buttons::RIGHT),
    ("PLUS", Buttons::PLUS),
    ("MINUS", Buttons::MINUS),
    ("MULTIPLY", Buttons::MULTIPLY),
    ("DIVIDE", Buttons::DIVIDE),
    ("CLEAR", Buttons::CLEAR),
    ("EXP", Buttons::EXP),
    ("DASH", Buttons::DASH),
    ("PARACLOSE", Buttons::PARACLOSE),
    ("TAN", Buttons::TAN),
    ("VARS", Buttons::VARS),
    ("PARAOPEN", Buttons::PARAOPEN),
    ("COS", Buttons::COS),
    ("PRGM", Buttons::PRGM),
    ("STAT", Buttons::STAT),
    ("COMMA", Buttons::COMMA),
    ("SIN", Buttons::SIN),
    ("MATRIX", Buttons::MATRIX),
    ("X", Buttons::X),
    ("STO", Buttons::STO),
    ("LN", Buttons::LN),
    ("LOG", Buttons::LOG),
    ("SQUARED", Buttons::SQUARED),
    ("NEG1", Buttons::NEG1),
    ("MATH", Buttons::MATH),
    ("ALPHA", Buttons::ALPHA),
    ("GRAPH", Buttons::GRAPH),
    ("TRACE", Buttons::TRACE),
    ("ZOOM", Buttons::ZOOM),
    ("WINDOW", Buttons::WINDOW),
    ("Y", Buttons::Y),
    ("2ND", Buttons::SECOND),
    ("MODE", Buttons::MODE),
    ("DEL", Buttons::DEL),
];

/// Static description of the input device, for input-display and movie tools.
#[derive(Debug, Clone, Copy)]
pub struct ControllerDefinition {
    pub name: &'static str,
    pub bool_buttons: [&'static str; 50],
}

pub const TI83_CONTROLLER: ControllerDefinition = ControllerDefinition {
    name: "TI83 Controller",
    bool_buttons: [
        "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "DOT",
        "ON", "ENTER",
        "DOWN", "LEFT", "UP", "RIGHT",
        "PLUS", "MINUS", "MULTIPLY", "DIVIDE",
        "CLEAR", "EXP", "DASH", "PARACLOSE", "TAN", "VARS", "PARAOPEN",
        "COS", "PRGM", "STAT", "COMMA", "SIN", "MATRIX", "X",
        "STO", "LN", "LOG", "SQUARED", "NEG1", "MATH", "ALPHA",
        "GRAPH", "TRACE", "ZOOM", "WINDOW", "Y", "2ND", "MODE", "DEL",
    ],
};

/// Input queried by button name.
pub trait Controller {
    fn is_pressed(&self, button: &str) -> bool;
}

impl Buttons {
    pub fn by_name(name: &str) -> Option<Buttons> {
        BUTTON_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, flag)| *flag)
    }

    /// Sets or clears a key by name. Unknown names are ignored.
    pub fn set_pressed(&mut self, name: &str, pressed: bool) {
        if let Some(flag) = Buttons::by_name(name) {
            self.set(flag, pressed);
        }
    }
}

impl Controller for Buttons {
    fn is_pressed(&self, button: &str) -> bool {
        Buttons::by_name(button)
            .map(|flag| self.contains(flag))
            .unwrap_or(false)
    }
}

/// Key groups, indexed by their select bit. Each entry is (button, result bit).
const KEY_MATRIX: [&[(&str, u8)]; 7] = [
    &[("DOWN", 0x01), ("LEFT", 0x02), ("RIGHT", 0x04), ("UP", 0x08)],
    &[
        ("ENTER", 0x01), ("PLUS", 0x02), ("MINUS", 0x04), ("MULTIPLY", 0x08),
        ("DIVIDE", 0x10), ("EXP", 0x20), ("CLEAR", 0x40),
    ],
    &[
        ("DASH", 0x01), ("3", 0x02), ("6", 0x04), ("9", 0x08),
        ("PARACLOSE", 0x10), ("TAN", 0x20), ("VARS", 0x40),
    ],
    &[
        ("DOT", 0x01), ("2", 0x02), ("5", 0x04), ("8", 0x08),
        ("PARAOPEN", 0x10), ("COS", 0x20), ("PRGM", 0x40), ("STAT", 0x80),
    ],
    &[
        ("0", 0x01), ("1", 0x02), ("4", 0x04), ("7", 0x08),
        ("COMMA", 0x10), ("SIN", 0x20), ("MATRIX", 0x40), ("X", 0x80),
    ],
    &[
        ("STO", 0x02), ("LN", 0x04), ("LOG", 0x08), ("SQUARED", 0x10),
        ("NEG1", 0x20), ("MATH", 0x40), ("ALPHA", 0x80),
    ],
    &[
        ("GRAPH", 0x01), ("TRACE", 0x02), ("ZOOM", 0x04), ("WINDOW", 0x08),
        ("Y", 0x10), ("2ND", 0x20), ("MODE", 0x40), ("DEL", 0x80),
    ],
];

/// Row-select register of the keypad.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keypad {
    mask: u8,
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    pub fn set_mask(&mut self, mask: u8) {
        self.mask = mask;
    }

    /// Computes the port 1 result for the current mask.
    pub fn read(&self, controller: &dyn Controller) -> u8 {
        let mut ret = 0xFFu8;
        for (group, keys) in KEY_MATRIX.iter().enumerate() {
            if self.mask & (1 << group) != 0 {
                continue;
            }
            for &(name, bit) in keys.iter() {
                if controller.is_pressed(name) {
                    ret ^= bit;
                }
            }
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_matches_name_table() {
        assert_eq!(TI83_CONTROLLER.name, "TI83 Controller");
        for (def, (name, _)) in TI83_CONTROLLER.bool_buttons.iter().zip(BUTTON_NAMES.iter()) {
            assert_eq!(def, name);
        }
        let all = BUTTON_NAMES.iter().fold(Buttons::empty(), |acc, (_, f)| acc | *f);
        assert_eq!(all, Buttons::all());
    }

    #[test]
    fn test_controller_by_name() {
        let mut buttons = Buttons::empty();
        buttons.set_pressed("2ND", true);
        buttons.set_pressed("NOPE", true);
        assert!(buttons.is_pressed("2ND"));
        assert!(!buttons.is_pressed("MODE"));
        assert!(!buttons.is_pressed("NOPE"));
        assert_eq!(buttons, Buttons::SECOND);
    }

    #[test]
    fn test_by_name_uses_controller_names() {
        assert_eq!(Buttons::by_name("2ND"), Some(Buttons::SECOND));
        assert_eq!(Buttons::by_name("0"), Some(Buttons::KEY_0));
        // Flag identifiers are not controller names.
        assert_eq!(Buttons::by_name("SECOND"), None);
        assert_eq!(Buttons::by_name("KEY_0"), None);
    }

    #[test]
    fn test_single_group_single_key() {
        let mut keypad = Keypad::new();
        keypad.set_mask(!(1 << 2));
        assert_eq!(keypad.read(&Buttons::KEY_6), 0xFF ^ 0x04);
        // Keys of unselected groups have no effect.
        assert_eq!(keypad.read(&Buttons::KEY_5), 0xFF);
    }

    #[test]
    fn test_unselected_mask_reads_all_ones() {
        let mut keypad = Keypad::new();
        keypad.set_mask(0xFF);
        assert_eq!(keypad.read(&Buttons::all()), 0xFF);
    }

    #[test]
    fn test_groups_compose_by_xor() {
        let mut keypad = Keypad::new();
        // Groups 0 and 1 both selected: DOWN and ENTER share bit 0.
        keypad.set_mask(0xFC);
        assert_eq!(keypad.read(&Buttons::DOWN), 0xFE);
        assert_eq!(keypad.read(&(Buttons::DOWN | Buttons::ENTER)), 0xFF);
        assert_eq!(keypad.read(&(Buttons::LEFT | Buttons::CLEAR)), 0xFF ^ 0x02 ^ 0x40);
    }

    #[test]
    fn test_sto_group_skips_bit_zero() {
        let mut keypad = Keypad::new();
        keypad.set_mask(!(1 << 5));
        assert_eq!(keypad.read(&Buttons::STO), 0xFD);
        assert_eq!(keypad.read(&Buttons::ALPHA), 0x7F);
    }
}
