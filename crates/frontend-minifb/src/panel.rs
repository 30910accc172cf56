//! Visible panel layout shared by the window and the text dumps.
//!
//! A module with `cols × lines` cells shows each cell as 5 dots plus a one
//! dot gutter. Lines alternate between the two render grids; lines 2 and 3
//! show the continuation of lines 0 and 1 starting `cols` characters in.

use charlcd_core::{Controller, Size, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Dot pitch of one character cell including the gutter.
pub const CELL_PITCH: usize = GLYPH_WIDTH + 1;

/// Lit/unlit dots of the visible panel, row by row.
pub fn dot_rows(lcd: &Controller, size: Size) -> Vec<Vec<bool>> {
    let function = lcd.function();
    let extended = function.is_extended();
    let glyph_rows = function.glyph_rows();
    let cols = size.cols() as usize;
    let width = cols * CELL_PITCH - 1;

    let mut rows = Vec::new();
    for line in 0..size.lines() as usize {
        if line > 0 {
            rows.push(vec![false; width]);
        }
        let first_cell = (line / 2) * cols;
        // without a second line the odd rows of a multi-line module stay dark
        let driven = function.is_two_line() || line % 2 == 0;
        for y in 0..glyph_rows {
            let (grid, gy) = if extended && y >= GLYPH_HEIGHT {
                (lcd.line(1), y - GLYPH_HEIGHT)
            } else {
                (lcd.line(line % 2), y)
            };
            let mut row = vec![false; width];
            if driven {
                for cell in 0..cols {
                    for dx in 0..GLYPH_WIDTH {
                        row[cell * CELL_PITCH + dx] = grid.dot((first_cell + cell) * GLYPH_WIDTH + dx, gy);
                    }
                }
            }
            rows.push(row);
        }
    }
    rows
}

/// Half-block rendering of the panel, two dot rows per text line.
pub fn ascii_art(lcd: &Controller, size: Size) -> String {
    let rows = dot_rows(lcd, size);
    let width = rows.first().map_or(0, Vec::len);
    let lit: usize = rows.iter().map(|r| r.iter().filter(|&&d| d).count()).sum();

    let mut out = format!("  ({} dots lit)\n", lit);
    for pair in rows.chunks(2) {
        out.push_str("  |");
        for x in 0..width {
            let top = pair[0][x];
            let bottom = pair.get(1).map_or(false, |r| r[x]);
            out.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                _ => ' ',
            });
        }
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use charlcd_core::{BlinkClock, DisplayInterface, FontRom};

    fn lcd() -> Controller {
        let mut lcd = Controller::with_blink(FontRom::a00(), BlinkClock::manual());
        lcd.set_power(true).unwrap();
        lcd
    }

    #[test]
    fn test_four_line_continuation() {
        let size = Size::new(20, 4).unwrap();
        let mut c = lcd();
        let mut iface = DisplayInterface::new(&mut c);
        iface.initialise(true, false).unwrap();
        iface.display_set(true, false, false).unwrap();
        iface.write(size, "\n\n\x08").unwrap(); // custom glyph 7 on line 2
        iface.define_custom_char(7, &[0x1F; 8]).unwrap();
        drop(iface);

        let rows = dot_rows(&c, size);
        assert_eq!(rows.len(), 4 * 8 + 3);
        assert_eq!(rows[0].len(), 20 * CELL_PITCH - 1);
        // line 2 starts after two lines and their gaps
        let top = 2 * (8 + 1);
        assert!(rows[top][..5].iter().all(|&d| d));
        assert!(!rows[top][5]);
        assert!(rows[..top].iter().all(|r| r.iter().all(|&d| !d)));
    }

    #[test]
    fn test_ascii_art_frame() {
        let size = Size::default();
        let mut c = lcd();
        let mut iface = DisplayInterface::new(&mut c);
        iface.initialise(true, false).unwrap();
        iface.display_set(true, false, false).unwrap();
        iface.write(size, "A").unwrap();
        drop(iface);
        let art = ascii_art(&c, size);
        let lines: Vec<&str> = art.lines().collect();
        // header + ceil(17 / 2) rows
        assert_eq!(lines.len(), 1 + 9);
        assert!(lines[1].starts_with("  |"));
        assert!(lines[1].ends_with('|'));
    }
}
