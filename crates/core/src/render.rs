//! Dot-matrix render pipeline.
//!
//! Each physical line owns a [`PixelGrid`] of `line_width × 5` dots by 8
//! rows. The grids are rebuilt from scratch after every committed bus cycle:
//! character codes come from DDRAM (through the display shift), glyph rows
//! from CGRAM or the font ROM, and the cursor and blink overlays are OR-ed
//! onto the cell under the address counter.
//!
//! In 1-line 5×10 mode the second grid is borrowed: its rows 0–2 carry
//! glyph rows 8–10 of the first line's characters.

use crate::controller::Controller;
use crate::font::Glyph;
use crate::instruction::DisplayComponents;
use crate::{
    LcdError, Result, CGRAM_CHARACTER_CODE_END, EXTENDED_GLYPH_HEIGHT, GLYPH_HEIGHT, GLYPH_WIDTH,
    MAX_GLYPH_ROWS, SECOND_LINE_START,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    width: usize,
    height: usize,
    dots: Vec<bool>,
    /// DDRAM address shown in each dot column
    sources: Vec<Option<u8>>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize) -> Self {
        PixelGrid {
            width,
            height,
            dots: vec![false; width * height],
            sources: vec![None; width],
        }
    }

    /// Resize if needed and blank every dot.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.dots.clear();
        self.dots.resize(width * height, false);
        self.sources.clear();
        self.sources.resize(width, None);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dot(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.dots[y * self.width + x]
    }

    pub fn lit_count(&self) -> usize {
        self.dots.iter().filter(|&&d| d).count()
    }

    pub fn source_address(&self, x: usize) -> Option<u8> {
        self.sources.get(x).copied().flatten()
    }

    /// Character cells across this grid.
    pub fn cells(&self) -> usize {
        self.width / GLYPH_WIDTH
    }

    /// Pack one character cell back into 5-bit rows (bit 4 = leftmost dot).
    pub fn cell_rows(&self, cell: usize) -> Vec<u8> {
        (0..self.height)
            .map(|y| {
                (0..GLYPH_WIDTH).fold(0u8, |row, dx| {
                    (row << 1) | self.dot(cell * GLYPH_WIDTH + dx, y) as u8
                })
            })
            .collect()
    }

    /// Write glyph rows into a cell, starting at grid row 0. The least
    /// significant bit of each row lands on the rightmost dot.
    fn draw_cell(&mut self, cell: usize, rows: &[u8], source: u8) {
        let left = cell * GLYPH_WIDTH;
        for dx in 0..GLYPH_WIDTH {
            self.sources[left + dx] = Some(source);
        }
        for (y, &row) in rows.iter().take(self.height).enumerate() {
            for bit in 0..GLYPH_WIDTH {
                let x = left + GLYPH_WIDTH - 1 - bit;
                self.dots[y * self.width + x] = row & (1 << bit) != 0;
            }
        }
    }
}

impl Controller {
    /// Rebuild both render targets from the current state.
    pub fn render(&mut self) -> Result<()> {
        let width = self.function.line_width() as usize * GLYPH_WIDTH;
        for grid in &mut self.lines {
            grid.reset(width, GLYPH_HEIGHT);
        }
        if !self.powered {
            return Ok(());
        }
        self.render_line(0)?;
        if self.function.is_two_line() {
            self.render_line(1)?;
        }
        Ok(())
    }

    fn render_line(&mut self, line: usize) -> Result<()> {
        if line > 0 && !self.function.is_two_line() {
            return Err(LcdError::NoSecondLine);
        }
        let two_line = self.function.is_two_line();
        let extended = self.function.is_extended();
        let rows = self.function.glyph_rows();
        let width = self.function.line_width() as i16;
        let display_on = self.components.contains(DisplayComponents::DISPLAY);

        for cell in 0..width {
            let offset = (cell - self.display_shift as i16).rem_euclid(width) as u8;
            let address = if line == 0 { offset } else { SECOND_LINE_START + offset };

            let mut glyph: Glyph = [0; MAX_GLYPH_ROWS];
            if display_on {
                let code = self.ddram.read(address, two_line)?;
                glyph = self.glyph_for(code, extended);
                if !self.addressing_cgram && address == self.address_counter {
                    self.apply_overlays(&mut glyph, extended);
                }
            }

            let cell = cell as usize;
            self.lines[line].draw_cell(cell, &glyph[..GLYPH_HEIGHT], address);
            if extended {
                self.lines[1].draw_cell(cell, &glyph[GLYPH_HEIGHT..rows], address);
            }
        }
        Ok(())
    }

    fn glyph_for(&self, code: u8, extended: bool) -> Glyph {
        if code >= CGRAM_CHARACTER_CODE_END {
            return *self.font.glyph(code);
        }
        let (base, rows) = if extended {
            ((code & 0x06) as usize * GLYPH_HEIGHT, EXTENDED_GLYPH_HEIGHT)
        } else {
            ((code & 0x07) as usize * GLYPH_HEIGHT, GLYPH_HEIGHT)
        };
        let mut glyph = [0; MAX_GLYPH_ROWS];
        for (dst, &src) in glyph.iter_mut().zip(&self.cgram[base..base + rows]) {
            *dst = src & 0x1F;
        }
        glyph
    }

    fn apply_overlays(&self, glyph: &mut Glyph, extended: bool) {
        if self.components.contains(DisplayComponents::CURSOR) {
            for (row, overlay) in glyph.iter_mut().zip(self.font.cursor(extended)) {
                *row |= overlay;
            }
        }
        if self.components.contains(DisplayComponents::BLINK) && self.blink.is_on() {
            for (row, overlay) in glyph.iter_mut().zip(self.font.blink(extended)) {
                *row |= overlay;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{powered, write};

    const H: [u8; 8] = [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11, 0x00];
    const I: [u8; 8] = [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E, 0x00];

    #[test]
    fn test_hi_with_cursor() {
        let mut c = powered();
        write(&mut c, false, 0x38); // 2-line, 5x8
        write(&mut c, false, 0x06); // increment, no shift
        write(&mut c, false, 0x0E); // display + cursor
        write(&mut c, false, 0x80);
        write(&mut c, true, b'H');
        write(&mut c, true, b'I');

        assert_eq!(c.ddram().read(0, true).unwrap(), b'H');
        assert_eq!(c.ddram().read(1, true).unwrap(), b'I');
        assert_eq!(c.address_counter(), 2);

        let line = c.line(0);
        assert_eq!(line.width(), 40 * GLYPH_WIDTH);
        assert_eq!(line.cell_rows(0), H);
        assert_eq!(line.cell_rows(1), I);
        assert_eq!(line.cell_rows(2), [0, 0, 0, 0, 0, 0, 0, 0x1F]);
        assert_eq!(line.cell_rows(3), [0; 8]);
        assert_eq!(line.source_address(2 * GLYPH_WIDTH), Some(2));
        assert_eq!(c.line(1).source_address(0), Some(0x40));
    }

    #[test]
    fn test_blink_follows_clock() {
        let mut c = powered();
        write(&mut c, false, 0x0D); // display + blink
        c.render().unwrap();
        assert_eq!(c.line(0).cell_rows(0), [0; 8]);
        c.blink_clock().toggle();
        c.render().unwrap();
        assert_eq!(c.line(0).cell_rows(0), [0x1F; 8]);
    }

    #[test]
    fn test_display_off_blanks_everything() {
        let mut c = powered();
        write(&mut c, false, 0x0B); // display off, cursor + blink on
        write(&mut c, true, b'A');
        c.blink_clock().toggle();
        c.render().unwrap();
        assert_eq!(c.line(0).lit_count(), 0);
        assert_eq!(c.line(0).source_address(0), Some(0));
    }

    #[test]
    fn test_one_line_leaves_second_grid_blank() {
        let mut c = powered();
        write(&mut c, false, 0x0F);
        write(&mut c, true, 0xFF);
        assert_eq!(c.line(0).width(), 80 * GLYPH_WIDTH);
        assert_eq!(c.line(1).lit_count(), 0);
        assert_eq!(c.line(1).source_address(0), None);
    }

    #[test]
    fn test_second_line_requires_two_line_mode() {
        let mut c = powered();
        assert!(matches!(c.render_line(1), Err(LcdError::NoSecondLine)));
    }

    #[test]
    fn test_display_shift_moves_view() {
        let mut c = powered();
        write(&mut c, false, 0x38);
        write(&mut c, false, 0x0C);
        write(&mut c, true, b'H');
        write(&mut c, false, 0x1C); // shift right
        assert_eq!(c.line(0).cell_rows(0), [0; 8]);
        assert_eq!(c.line(0).cell_rows(1), H);
        write(&mut c, false, 0x18);
        write(&mut c, false, 0x18); // net shift left by one
        assert_eq!(c.line(0).cell_rows(39), H);
        assert_eq!(c.line(0).source_address(39 * GLYPH_WIDTH), Some(0));
    }

    #[test]
    fn test_custom_glyph_codes_mirror() {
        let mut c = powered();
        write(&mut c, false, 0x0C);
        write(&mut c, false, 0x40 | (2 * 8));
        for row in 0..8u8 {
            write(&mut c, true, 0xE0 | row); // high bits are ignored
        }
        write(&mut c, false, 0x80);
        write(&mut c, true, 0x02);
        write(&mut c, true, 0x0A); // bit 3 ignored
        let expected: Vec<u8> = (0..8).collect();
        assert_eq!(c.line(0).cell_rows(0), expected);
        assert_eq!(c.line(0).cell_rows(1), expected);
    }

    #[test]
    fn test_extended_font_borrows_second_grid() {
        let mut c = powered();
        write(&mut c, false, 0x34); // 1-line, 5x10
        write(&mut c, false, 0x0C);
        write(&mut c, false, 0x40);
        let rows: Vec<u8> = (1..=11).collect();
        for &r in &rows {
            write(&mut c, true, r);
        }
        write(&mut c, false, 0x80);
        write(&mut c, true, 0x00);

        assert_eq!(c.line(0).cell_rows(0), rows[..8]);
        let second = c.line(1).cell_rows(0);
        assert_eq!(second[..3], rows[8..11]);
        assert_eq!(second[3..], [0; 5]);
        // nothing else on the second grid
        assert_eq!(c.line(1).cell_rows(1), [0; 8]);
    }

    #[test]
    fn test_extended_cursor_on_borrowed_row() {
        let mut c = powered();
        write(&mut c, false, 0x34);
        write(&mut c, false, 0x0E);
        assert_eq!(c.line(0).cell_rows(0), [0; 8]);
        assert_eq!(c.line(1).cell_rows(0), [0, 0, 0x1F, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_cursor_hidden_while_addressing_cgram() {
        let mut c = powered();
        write(&mut c, false, 0x0E);
        write(&mut c, false, 0x40);
        assert_eq!(c.line(0).lit_count(), 0);
    }
}
