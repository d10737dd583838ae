//! T6A04-style LCD driver.
//!
//! The CPU talks to the display through two ports: a control port that sets
//! the word mode, the auto-increment direction and the cursor, and a data
//! port that reads or writes at the cursor and then moves it.

/// Visible width in pixels.
pub const LCD_WIDTH: usize = 96;
/// Visible height in pixels.
pub const LCD_HEIGHT: usize = 64;
/// Bytes per VRAM row.
pub const LCD_ROW_BYTES: usize = 12;
/// Size of the 1bpp VRAM.
pub const VRAM_SIZE: usize = LCD_ROW_BYTES * LCD_HEIGHT;

const X_MASK: u32 = 0x0F;
const Y_MASK: u32 = 0x3F;

/// Pixel colour for a cleared VRAM bit.
pub const PIXEL_OFF: u32 = 0xFFFF_FFFF;
/// Pixel colour for a set VRAM bit.
pub const PIXEL_ON: u32 = 0x0000_0000;

/// Cursor step applied after every data access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoMove {
    #[default]
    DecrementRow = 0,
    IncrementRow = 1,
    DecrementColumn = 2,
    IncrementColumn = 3,
}

impl AutoMove {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => AutoMove::DecrementRow,
            1 => AutoMove::IncrementRow,
            2 => AutoMove::DecrementColumn,
            _ => AutoMove::IncrementColumn,
        }
    }
}

/// Display controller state plus VRAM.
#[derive(Debug, Clone)]
pub struct Lcd {
    /// 0 = 6-bit words, 1 = 8-bit words.
    pub(crate) mode: u8,
    pub(crate) auto_move: AutoMove,
    pub(crate) x: u32,
    pub(crate) y: u32,
    /// Set by a cursor command; the next data read returns 0 (dummy read).
    pub(crate) cursor_moved: bool,
    pub(crate) vram: [u8; VRAM_SIZE],
}

impl Default for Lcd {
    fn default() -> Self {
        Self::new()
    }
}

impl Lcd {
    pub fn new() -> Self {
        Self {
            mode: 0,
            auto_move: AutoMove::DecrementRow,
            x: 0,
            y: 0,
            cursor_moved: false,
            vram: [0; VRAM_SIZE],
        }
    }

    /// Clears the controller registers. VRAM is left as is.
    pub fn reset(&mut self) {
        self.mode = 0;
        self.auto_move = AutoMove::DecrementRow;
        self.x = 0;
        self.y = 0;
        self.cursor_moved = false;
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn auto_move(&self) -> AutoMove {
        self.auto_move
    }

    /// Cursor as (column, row).
    pub fn cursor(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn vram(&self) -> &[u8; VRAM_SIZE] {
        &self.vram
    }

    /// Control port write. First matching rule wins.
    pub fn write_control(&mut self, value: u8) {
        if value <= 1 {
            self.mode = value;
        } else if (4..=7).contains(&value) {
            self.auto_move = AutoMove::from_bits(value - 4);
        } else if value & 0xC0 == 0x40 {
            // Z-address (hardware scroll), not emulated
        } else if value & 0xE0 == 0x20 {
            self.x = (value & 0x1F) as u32;
            self.cursor_moved = true;
        } else if value & 0xC0 == 0x80 {
            self.y = (value & 0x3F) as u32;
            self.cursor_moved = true;
        } else if value & 0xC0 == 0xC0 {
            // contrast
        }
        // 2, 3 and the 0x08..0x1F test/power commands are accepted and ignored.
    }

    /// Data port read.
    pub fn read_data(&mut self) -> u8 {
        if self.cursor_moved {
            self.cursor_moved = false;
            return 0x00;
        }

        let ret = if self.mode == 1 {
            self.byte_at(self.y as usize * LCD_ROW_BYTES + self.x as usize)
        } else {
            let column = 6 * self.x as usize;
            let offset = self.y as usize * LCD_ROW_BYTES + (column >> 3);
            let shift = 10 - (column & 7);
            let word = ((self.byte_at(offset) as u16) << 8) | self.byte_at(offset + 1) as u16;
            ((word >> shift) & 0x3F) as u8
        };

        self.advance_cursor();
        ret
    }

    /// Data port write.
    pub fn write_data(&mut self, value: u8) {
        if self.mode == 1 {
            let offset = self.y as usize * LCD_ROW_BYTES + self.x as usize;
            if let Some(byte) = self.vram.get_mut(offset) {
                *byte = value;
            }
        } else {
            let column = 6 * self.x as usize;
            let offset = self.y as usize * LCD_ROW_BYTES + (column >> 3);
            if offset < VRAM_SIZE {
                let shift = column & 7;
                let data = ((value & 0x3F) as u16) << 2;
                let mask = !(0xFCu16 >> shift) as u8;
                self.vram[offset] = (self.vram[offset] & mask) | (data >> shift) as u8;

                if shift > 2 && offset < VRAM_SIZE - 1 {
                    let shift = 8 - shift;
                    let mask = !(0xFCu16 << shift) as u8;
                    self.vram[offset + 1] = (self.vram[offset + 1] & mask) | (data << shift) as u8;
                }
            }
        }

        self.advance_cursor();
    }

    fn byte_at(&self, offset: usize) -> u8 {
        self.vram.get(offset).copied().unwrap_or(0)
    }

    fn advance_cursor(&mut self) {
        match self.auto_move {
            AutoMove::DecrementRow => self.y = self.y.wrapping_sub(1),
            AutoMove::IncrementRow => self.y = self.y.wrapping_add(1),
            AutoMove::DecrementColumn => self.x = self.x.wrapping_sub(1),
            AutoMove::IncrementColumn => self.x = self.x.wrapping_add(1),
        }
        // TODO: the column counter may be 5 bits wide in 6-bit mode (up to 19
        // words per row); keep the 4-bit wrap until checked against hardware.
        self.x &= X_MASK;
        self.y &= Y_MASK;
    }

    /// Expands VRAM into ARGB pixels, row-major.
    pub fn render(&self) -> Vec<u32> {
        let mut pixels = Vec::with_capacity(LCD_WIDTH * LCD_HEIGHT);
        for offset in 0..LCD_WIDTH * LCD_HEIGHT {
            let bit = (self.vram[offset >> 3] >> (7 - (offset & 7))) & 1;
            pixels.push(if bit == 0 { PIXEL_OFF } else { PIXEL_ON });
        }
        pixels
    }
}
