//! Character generator ROM.
//!
//! Each of the 256 codes owns up to 16 bitmap rows; only the first 8 (or 11
//! in extended-font mode) are ever displayed. Bit 4 of a row is the leftmost
//! dot, bit 0 the rightmost. The built-in table is the common A00
//! (Japanese) ROM: ASCII with a yen sign at 0x5C, half-width katakana at
//! 0xA1–0xDF and Greek/math symbols with descenders at 0xE0–0xFF.

use crate::{LcdError, Result, EXTENDED_GLYPH_HEIGHT, GLYPH_HEIGHT, MAX_GLYPH_ROWS};

pub type Glyph = [u8; MAX_GLYPH_ROWS];

/// Cursor and blink overlay bitmaps for both glyph heights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlays {
    pub cursor: Glyph,
    pub blink: Glyph,
    pub cursor_extended: Glyph,
    pub blink_extended: Glyph,
}

impl Default for Overlays {
    /// Underline on the last row; blink fills the whole cell.
    fn default() -> Self {
        let mut cursor = [0; MAX_GLYPH_ROWS];
        let mut cursor_extended = [0; MAX_GLYPH_ROWS];
        let mut blink = [0; MAX_GLYPH_ROWS];
        let mut blink_extended = [0; MAX_GLYPH_ROWS];
        cursor[GLYPH_HEIGHT - 1] = 0x1F;
        cursor_extended[EXTENDED_GLYPH_HEIGHT - 1] = 0x1F;
        blink[..GLYPH_HEIGHT].fill(0x1F);
        blink_extended[..EXTENDED_GLYPH_HEIGHT].fill(0x1F);
        Overlays { cursor, blink, cursor_extended, blink_extended }
    }
}

#[derive(Clone)]
pub struct FontRom {
    glyphs: Box<[Glyph; 256]>,
    overlays: Overlays,
}

impl Default for FontRom {
    fn default() -> Self {
        Self::a00()
    }
}

impl FontRom {
    /// The built-in A00 character set with default overlays.
    pub fn a00() -> Self {
        let mut glyphs = Box::new([[0u8; MAX_GLYPH_ROWS]; 256]);
        for (i, rows) in ASCII.iter().enumerate() {
            glyphs[0x20 + i][..rows.len()].copy_from_slice(rows);
        }
        for (i, rows) in KATAKANA.iter().enumerate() {
            glyphs[0xA1 + i][..rows.len()].copy_from_slice(rows);
        }
        for (i, rows) in SYMBOLS.iter().enumerate() {
            glyphs[0xE0 + i][..rows.len()].copy_from_slice(rows);
        }
        FontRom { glyphs, overlays: Overlays::default() }
    }

    /// Build a font from an external row source: exactly 256 entries, each
    /// with between `glyph_rows` and 16 rows. `glyph_rows` is the height the
    /// font is meant for: [`GLYPH_HEIGHT`] for 5×8 modules or
    /// [`EXTENDED_GLYPH_HEIGHT`] for 5×10 ones.
    pub fn from_rows(entries: &[Vec<u8>], glyph_rows: usize, overlays: Overlays) -> Result<Self> {
        if entries.len() != 256 {
            return Err(LcdError::GlyphCount(entries.len()));
        }
        let mut glyphs = Box::new([[0u8; MAX_GLYPH_ROWS]; 256]);
        for (code, rows) in entries.iter().enumerate() {
            if rows.len() > MAX_GLYPH_ROWS {
                return Err(LcdError::GlyphRowsTooLong { code: code as u8, rows: rows.len() });
            }
            if rows.len() < glyph_rows {
                return Err(LcdError::GlyphRowsTooShort {
                    code: code as u8,
                    rows: rows.len(),
                    required: glyph_rows,
                });
            }
            glyphs[code][..rows.len()].copy_from_slice(rows);
        }
        Ok(FontRom { glyphs, overlays })
    }

    pub fn glyph(&self, code: u8) -> &Glyph {
        &self.glyphs[code as usize]
    }

    pub fn cursor(&self, extended: bool) -> &Glyph {
        if extended { &self.overlays.cursor_extended } else { &self.overlays.cursor }
    }

    pub fn blink(&self, extended: bool) -> &Glyph {
        if extended { &self.overlays.blink_extended } else { &self.overlays.blink }
    }
}

// ─── A00 glyph data ─────────────────────────────────────────────────────────

/// 0x20–0x7F
const ASCII: [[u8; 7]; 96] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x04, 0x04, 0x04, 0x04, 0x00, 0x00, 0x04], // !
    [0x0A, 0x0A, 0x0A, 0x00, 0x00, 0x00, 0x00], // "
    [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A], // #
    [0x04, 0x0F, 0x14, 0x0E, 0x05, 0x1E, 0x04], // $
    [0x18, 0x19, 0x02, 0x04, 0x08, 0x13, 0x03], // %
    [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D], // &
    [0x0C, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00], // '
    [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02], // (
    [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08], // )
    [0x00, 0x04, 0x15, 0x0E, 0x15, 0x04, 0x00], // *
    [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08], // ,
    [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C], // .
    [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00], // /
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
    [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00], // :
    [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x04, 0x08], // ;
    [0x02, 0x04, 0x08, 0x10, 0x08, 0x04, 0x02], // <
    [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00], // =
    [0x08, 0x04, 0x02, 0x01, 0x02, 0x04, 0x08], // >
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04], // ?
    [0x0E, 0x11, 0x01, 0x0D, 0x15, 0x15, 0x0E], // @
    [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
    [0x0E, 0x08, 0x08, 0x08, 0x08, 0x08, 0x0E], // [
    [0x11, 0x0A, 0x1F, 0x04, 0x1F, 0x04, 0x04], // yen
    [0x0E, 0x02, 0x02, 0x02, 0x02, 0x02, 0x0E], // ]
    [0x04, 0x0A, 0x11, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F], // _
    [0x08, 0x04, 0x02, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F], // a
    [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E], // b
    [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E], // c
    [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F], // d
    [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E], // e
    [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08], // f
    [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E], // g
    [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11], // h
    [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E], // i
    [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0C], // j
    [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12], // k
    [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // l
    [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11], // m
    [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11], // n
    [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E], // o
    [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10], // p
    [0x00, 0x00, 0x0D, 0x13, 0x0F, 0x01, 0x01], // q
    [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10], // r
    [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E], // s
    [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06], // t
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D], // u
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04], // v
    [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A], // w
    [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11], // x
    [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E], // y
    [0x00, 0x00, 0x1F, 0x02, 0x04, 0x08, 0x1F], // z
    [0x02, 0x04, 0x04, 0x08, 0x04, 0x04, 0x02], // {
    [0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // |
    [0x08, 0x04, 0x04, 0x02, 0x04, 0x04, 0x08], // }
    [0x00, 0x04, 0x02, 0x1F, 0x02, 0x04, 0x00], // right arrow
    [0x00, 0x04, 0x08, 0x1F, 0x08, 0x04, 0x00], // left arrow
];

/// 0xA1–0xDF, half-width katakana and punctuation
const KATAKANA: [[u8; 7]; 63] = [
    [0x00, 0x00, 0x00, 0x00, 0x1C, 0x14, 0x1C],
    [0x07, 0x04, 0x04, 0x04, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x00, 0x04, 0x04, 0x04, 0x1C],
    [0x00, 0x00, 0x00, 0x00, 0x10, 0x08, 0x04],
    [0x00, 0x00, 0x00, 0x0C, 0x0C, 0x00, 0x00],
    [0x00, 0x1F, 0x01, 0x1F, 0x01, 0x02, 0x04], // wo
    [0x00, 0x00, 0x1F, 0x01, 0x06, 0x04, 0x08], // small a
    [0x00, 0x00, 0x02, 0x04, 0x0C, 0x14, 0x04],
    [0x00, 0x00, 0x04, 0x1F, 0x11, 0x01, 0x06],
    [0x00, 0x00, 0x00, 0x1F, 0x04, 0x04, 0x1F],
    [0x00, 0x00, 0x02, 0x1F, 0x06, 0x0A, 0x12],
    [0x00, 0x00, 0x08, 0x1F, 0x09, 0x0A, 0x08], // small ya
    [0x00, 0x00, 0x00, 0x0E, 0x02, 0x02, 0x1F],
    [0x00, 0x00, 0x1E, 0x02, 0x1E, 0x02, 0x1E],
    [0x00, 0x00, 0x00, 0x15, 0x15, 0x01, 0x06], // small tsu
    [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00], // prolonged sound mark
    [0x1F, 0x01, 0x05, 0x06, 0x04, 0x04, 0x08], // a
    [0x01, 0x02, 0x04, 0x0C, 0x14, 0x04, 0x04],
    [0x04, 0x1F, 0x11, 0x11, 0x01, 0x02, 0x04],
    [0x00, 0x1F, 0x04, 0x04, 0x04, 0x04, 0x1F],
    [0x02, 0x1F, 0x02, 0x06, 0x0A, 0x12, 0x02],
    [0x08, 0x1F, 0x09, 0x09, 0x09, 0x09, 0x12], // ka
    [0x04, 0x1F, 0x04, 0x1F, 0x04, 0x04, 0x04],
    [0x00, 0x0F, 0x09, 0x11, 0x01, 0x02, 0x0C],
    [0x08, 0x0F, 0x12, 0x02, 0x02, 0x02, 0x04],
    [0x00, 0x1F, 0x01, 0x01, 0x01, 0x01, 0x1F],
    [0x0A, 0x1F, 0x0A, 0x0A, 0x02, 0x04, 0x08], // sa
    [0x00, 0x18, 0x01, 0x19, 0x01, 0x02, 0x1C],
    [0x00, 0x1F, 0x01, 0x02, 0x04, 0x0A, 0x11],
    [0x08, 0x1F, 0x09, 0x0A, 0x08, 0x08, 0x07],
    [0x00, 0x11, 0x11, 0x09, 0x01, 0x02, 0x0C],
    [0x00, 0x0F, 0x09, 0x15, 0x03, 0x02, 0x0C], // ta
    [0x02, 0x1C, 0x04, 0x1F, 0x04, 0x04, 0x08],
    [0x00, 0x15, 0x15, 0x15, 0x01, 0x02, 0x04],
    [0x0E, 0x00, 0x1F, 0x04, 0x04, 0x04, 0x08],
    [0x08, 0x08, 0x08, 0x0C, 0x0A, 0x08, 0x08],
    [0x04, 0x04, 0x1F, 0x04, 0x04, 0x08, 0x10], // na
    [0x00, 0x0E, 0x00, 0x00, 0x00, 0x00, 0x1F],
    [0x00, 0x1F, 0x01, 0x0A, 0x04, 0x0A, 0x10],
    [0x04, 0x1F, 0x02, 0x04, 0x0E, 0x15, 0x04],
    [0x02, 0x02, 0x02, 0x02, 0x02, 0x04, 0x08],
    [0x00, 0x04, 0x02, 0x11, 0x11, 0x11, 0x11], // ha
    [0x10, 0x10, 0x1F, 0x10, 0x10, 0x10, 0x0F],
    [0x00, 0x1F, 0x01, 0x01, 0x01, 0x02, 0x0C],
    [0x00, 0x08, 0x14, 0x02, 0x01, 0x01, 0x00],
    [0x04, 0x1F, 0x04, 0x04, 0x15, 0x15, 0x04],
    [0x00, 0x1F, 0x01, 0x01, 0x0A, 0x04, 0x02], // ma
    [0x00, 0x0E, 0x00, 0x0E, 0x00, 0x0E, 0x01],
    [0x00, 0x04, 0x08, 0x10, 0x11, 0x1F, 0x01],
    [0x00, 0x01, 0x01, 0x0A, 0x04, 0x0A, 0x10],
    [0x00, 0x1F, 0x08, 0x1F, 0x08, 0x08, 0x07],
    [0x08, 0x08, 0x1F, 0x09, 0x0A, 0x08, 0x08], // ya
    [0x00, 0x0E, 0x02, 0x02, 0x02, 0x02, 0x1F],
    [0x00, 0x1F, 0x01, 0x1F, 0x01, 0x01, 0x1F],
    [0x0E, 0x00, 0x1F, 0x01, 0x01, 0x02, 0x04], // ra
    [0x12, 0x12, 0x12, 0x12, 0x02, 0x04, 0x08],
    [0x00, 0x04, 0x14, 0x14, 0x15, 0x15, 0x16],
    [0x00, 0x10, 0x10, 0x11, 0x12, 0x14, 0x18],
    [0x00, 0x1F, 0x11, 0x11, 0x11, 0x11, 0x1F],
    [0x00, 0x1F, 0x11, 0x11, 0x01, 0x02, 0x04], // wa
    [0x00, 0x18, 0x00, 0x01, 0x01, 0x02, 0x1C], // n
    [0x04, 0x12, 0x08, 0x00, 0x00, 0x00, 0x00], // dakuten
    [0x1C, 0x14, 0x1C, 0x00, 0x00, 0x00, 0x00], // handakuten
];

/// 0xE0–0xFF; rows 7–9 carry descenders for the 5×10 font
const SYMBOLS: [[u8; 10]; 32] = [
    [0x00, 0x00, 0x09, 0x15, 0x12, 0x12, 0x0D, 0x00, 0x00, 0x00], // alpha
    [0x0A, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F, 0x00, 0x00, 0x00], // a umlaut
    [0x00, 0x00, 0x0E, 0x11, 0x1E, 0x11, 0x1E, 0x10, 0x10, 0x10], // beta
    [0x00, 0x00, 0x0E, 0x10, 0x0C, 0x11, 0x0E, 0x00, 0x00, 0x00], // epsilon
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x1D, 0x10, 0x10, 0x10], // mu
    [0x00, 0x00, 0x0F, 0x14, 0x12, 0x11, 0x0E, 0x00, 0x00, 0x00], // sigma
    [0x00, 0x00, 0x06, 0x09, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // rho
    [0x00, 0x00, 0x0F, 0x11, 0x11, 0x11, 0x0F, 0x01, 0x01, 0x0E], // g
    [0x00, 0x00, 0x07, 0x04, 0x04, 0x14, 0x08, 0x00, 0x00, 0x00], // square root
    [0x00, 0x02, 0x1A, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ^-1
    [0x02, 0x00, 0x06, 0x02, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // j
    [0x00, 0x14, 0x08, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ^x
    [0x00, 0x04, 0x0E, 0x14, 0x15, 0x0E, 0x04, 0x00, 0x00, 0x00], // cent
    [0x08, 0x08, 0x1C, 0x08, 0x1C, 0x08, 0x0F, 0x00, 0x00, 0x00], // pound
    [0x0E, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11, 0x00, 0x00, 0x00], // n tilde
    [0x0A, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E, 0x00, 0x00, 0x00], // o umlaut
    [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // p
    [0x00, 0x00, 0x0D, 0x13, 0x11, 0x11, 0x0F, 0x01, 0x01, 0x01], // q
    [0x00, 0x0E, 0x11, 0x1F, 0x11, 0x11, 0x0E, 0x00, 0x00, 0x00], // theta
    [0x00, 0x00, 0x00, 0x0B, 0x15, 0x1A, 0x00, 0x00, 0x00, 0x00], // infinity
    [0x00, 0x0E, 0x11, 0x11, 0x11, 0x0A, 0x1B, 0x00, 0x00, 0x00], // omega
    [0x0A, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D, 0x00, 0x00, 0x00], // u umlaut
    [0x1F, 0x10, 0x08, 0x04, 0x08, 0x10, 0x1F, 0x00, 0x00, 0x00], // capital sigma
    [0x00, 0x00, 0x1F, 0x0A, 0x0A, 0x0A, 0x13, 0x00, 0x00, 0x00], // pi
    [0x1F, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x00, 0x00, 0x00], // x bar
    [0x00, 0x00, 0x11, 0x11, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // y
    [0x00, 0x01, 0x1E, 0x04, 0x1F, 0x04, 0x04, 0x00, 0x00, 0x00], // sen
    [0x00, 0x1F, 0x08, 0x0F, 0x09, 0x11, 0x13, 0x00, 0x00, 0x00], // man
    [0x00, 0x00, 0x1F, 0x15, 0x1F, 0x11, 0x11, 0x00, 0x00, 0x00], // yen (kanji)
    [0x00, 0x04, 0x00, 0x1F, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00], // divide
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // blank
    [0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F, 0x1F], // block
];
