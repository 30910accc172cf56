//! Host-side driver composing pin-level bus cycles.
//!
//! [`DisplayInterface`] plays the part of the MPU wired to the module: every
//! operation is expressed as RS/R-W/data bus settings and enable pulses, so
//! it exercises exactly the same paths as a user toggling pins by hand.
//! The interface tracks the bus width it has negotiated; a host that keeps
//! the controller across several borrows carries it with
//! [`DisplayInterface::with_bus_width`].

use crate::controller::Controller;
use crate::instruction::Instruction;
use crate::{LcdError, Result, CGRAM_SIZE, GLYPH_HEIGHT, SECOND_LINE_START};

/// Visible geometry of the attached module. Only [`Size::new`] builds one,
/// so every `Size` is within the module limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    cols: u8,
    lines: u8,
}

impl Size {
    pub const MAX_COLS: u8 = 40;
    pub const MAX_LINES: u8 = 4;
    pub const MAX_CHARACTERS: u16 = 80;

    pub fn new(cols: u8, lines: u8) -> Result<Self> {
        let fits = (1..=Self::MAX_COLS).contains(&cols)
            && (1..=Self::MAX_LINES).contains(&lines)
            && cols as u16 * lines as u16 <= Self::MAX_CHARACTERS;
        if fits {
            Ok(Size { cols, lines })
        } else {
            Err(LcdError::InvalidSize { cols, lines })
        }
    }

    pub fn cols(self) -> u8 {
        self.cols
    }

    pub fn lines(self) -> u8 {
        self.lines
    }
}

impl Default for Size {
    fn default() -> Self {
        Size { cols: 16, lines: 2 }
    }
}

/// Cursor position in visible terms: 0-based line and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u8,
    pub offset: u8,
}

impl Position {
    pub fn new(line: u8, offset: u8) -> Self {
        Position { line, offset }
    }

    /// DDRAM address of this position, or `None` if it lies outside the
    /// visible area. Odd lines live in the second half of the address space;
    /// lines 2 and 3 continue lines 0 and 1.
    pub fn address(self, size: Size) -> Option<u8> {
        if self.line >= size.lines || self.offset >= size.cols {
            return None;
        }
        let mut address = self.offset;
        if self.line % 2 != 0 {
            address += SECOND_LINE_START;
        }
        if self.line >= 2 {
            address += size.cols;
        }
        Some(address)
    }

    pub fn from_address(address: u8, size: Size) -> Self {
        let within = address % SECOND_LINE_START;
        let mut line = if address >= SECOND_LINE_START { 1 } else { 0 };
        if within >= size.cols {
            line += 2;
        }
        Position { line, offset: within % size.cols }
    }
}

pub struct DisplayInterface<'a> {
    lcd: &'a mut Controller,
    four_bit: bool,
}

impl<'a> DisplayInterface<'a> {
    /// Attach to a controller assumed to be in its power-on 8-bit mode.
    pub fn new(lcd: &'a mut Controller) -> Self {
        Self::with_bus_width(lcd, false)
    }

    pub fn with_bus_width(lcd: &'a mut Controller, four_bit: bool) -> Self {
        DisplayInterface { lcd, four_bit }
    }

    pub fn is_four_bit(&self) -> bool {
        self.four_bit
    }

    // ─── Bus primitives ───

    fn pulse(&mut self) -> Result<()> {
        self.lcd.set_enable(true)?;
        self.lcd.set_enable(false)
    }

    fn write_cycle(&mut self, value: u8) -> Result<()> {
        self.lcd.set_data_bus(value);
        self.pulse()
    }

    fn read_cycle(&mut self) -> Result<u8> {
        // released bus reads low when nothing drives it
        self.lcd.set_data_bus(0);
        self.lcd.set_enable(true)?;
        let value = self.lcd.data_bus();
        self.lcd.set_enable(false)?;
        Ok(value)
    }

    pub fn is_busy(&mut self) -> Result<bool> {
        Ok(self.receive(false, false)? & 0x80 != 0)
    }

    fn wait_ready(&mut self) -> Result<()> {
        while self.is_busy()? {
            std::hint::spin_loop();
        }
        Ok(())
    }

    /// Read one byte. With `register_select` low this is the busy flag and
    /// address counter.
    pub fn receive(&mut self, register_select: bool, wait_for_not_busy: bool) -> Result<u8> {
        if wait_for_not_busy {
            self.wait_ready()?;
        }
        self.lcd.set_read_write(true);
        self.lcd.set_register_select(register_select);
        if self.four_bit {
            let high = self.read_cycle()? & 0xF0;
            let low = self.read_cycle()? >> 4;
            Ok(high | low)
        } else {
            self.read_cycle()
        }
    }

    pub fn transmit(&mut self, register_select: bool, byte: u8) -> Result<()> {
        self.wait_ready()?;
        self.lcd.set_read_write(false);
        self.lcd.set_register_select(register_select);
        if self.four_bit {
            self.write_cycle(byte & 0xF0)?;
            self.write_cycle(byte << 4)?;
        } else {
            self.write_cycle(byte)?;
        }
        if !register_select {
            if let Some(Instruction::FunctionSet { eight_bit, .. }) = Instruction::decode(byte) {
                self.four_bit = !eight_bit;
            }
        }
        Ok(())
    }

    fn instruction(&mut self, instruction: Instruction) -> Result<()> {
        self.transmit(false, instruction.encode())
    }

    // ─── Setup ───

    /// Function Set with an 8-bit bus, then Clear Display.
    pub fn initialise(&mut self, two_line: bool, extended_font: bool) -> Result<()> {
        self.transmit(false, 0b110000 | ((two_line as u8) << 3) | ((extended_font as u8) << 2))?;
        self.clear()
    }

    /// Nibble handshake into 4-bit mode, valid whatever width the
    /// controller was left in, then Function Set and Clear Display.
    pub fn initialise_four_bit(&mut self, two_line: bool, extended_font: bool) -> Result<()> {
        self.lcd.set_read_write(false);
        self.lcd.set_register_select(false);
        for _ in 0..3 {
            self.write_cycle(0x30)?;
        }
        self.write_cycle(0x20)?;
        self.four_bit = true;
        self.transmit(false, 0b100000 | ((two_line as u8) << 3) | ((extended_font as u8) << 2))?;
        self.clear()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.instruction(Instruction::ClearDisplay)
    }

    pub fn home(&mut self) -> Result<()> {
        self.instruction(Instruction::ReturnHome)
    }

    pub fn display_set(&mut self, display: bool, cursor: bool, blink: bool) -> Result<()> {
        self.transmit(false, 0b1000 | ((display as u8) << 2) | ((cursor as u8) << 1) | blink as u8)
    }

    /// Move the cursor (`screen == false`) or the whole display one step.
    pub fn scroll(&mut self, screen: bool, right: bool) -> Result<()> {
        self.instruction(Instruction::Shift { screen, right })
    }

    pub fn entry_mode(&mut self, increment: bool, shift: bool) -> Result<()> {
        self.instruction(Instruction::EntryModeSet { increment, shift })
    }

    /// The backlight is wired straight to its own pin.
    pub fn backlight(&mut self, on: bool) {
        self.lcd.set_backlight(on);
    }

    // ─── Cursor and text ───

    pub fn address(&mut self) -> Result<u8> {
        Ok(self.receive(false, true)? & 0x7F)
    }

    pub fn set_ddram_address(&mut self, address: u8) -> Result<()> {
        self.instruction(Instruction::SetDdramAddress(address))
    }

    pub fn set_cgram_address(&mut self, address: u8) -> Result<()> {
        self.instruction(Instruction::SetCgramAddress(address))
    }

    pub fn cursor_position(&mut self, size: Size) -> Result<Position> {
        Ok(Position::from_address(self.address()?, size))
    }

    pub fn set_cursor_position(&mut self, size: Size, position: Position) -> Result<()> {
        let address = position
            .address(size)
            .ok_or(LcdError::InvalidPosition { line: position.line, offset: position.offset })?;
        self.set_ddram_address(address)
    }

    /// Write text at the cursor, wrapping onto the next visible line.
    /// `\x01`–`\x08` select custom glyphs 0–7 and `\n` starts a new line.
    pub fn write(&mut self, size: Size, text: &str) -> Result<()> {
        let mut last_line = self.cursor_position(size)?.line;
        for byte in text.bytes() {
            let newline = byte == b'\n';
            if !newline {
                let code = if (0x01..=0x08).contains(&byte) { byte - 1 } else { byte };
                self.transmit(true, code)?;
            }
            let position = self.cursor_position(size)?;
            if newline || position.offset >= size.cols || position.line != last_line {
                last_line = (last_line + 1) % size.lines;
                self.set_cursor_position(size, Position::new(last_line, 0))?;
            }
        }
        Ok(())
    }

    /// Read back every visible line, each terminated by `\n`. Custom glyph
    /// codes come back as `\x01`–`\x08`. The cursor is left where it was.
    pub fn read(&mut self, size: Size) -> Result<String> {
        let saved = self.address()?;
        let mut text = String::with_capacity((size.cols as usize + 1) * size.lines as usize);
        for line in 0..size.lines {
            self.set_cursor_position(size, Position::new(line, 0))?;
            for _ in 0..size.cols {
                let code = self.receive(true, true)?;
                let code = if code <= 7 { code + 1 } else { code };
                text.push(char::from(code));
            }
            text.push('\n');
        }
        self.set_ddram_address(saved)?;
        Ok(text)
    }

    // ─── Custom glyphs ───

    pub fn define_custom_char(&mut self, index: u8, rows: &[u8; GLYPH_HEIGHT]) -> Result<()> {
        let saved = self.address()?;
        self.set_cgram_address(Self::cgram_base(index))?;
        for &row in rows {
            self.transmit(true, row & 0x1F)?;
        }
        self.set_ddram_address(saved)
    }

    pub fn custom_char(&mut self, index: u8) -> Result<[u8; GLYPH_HEIGHT]> {
        let saved = self.address()?;
        self.set_cgram_address(Self::cgram_base(index))?;
        let mut rows = [0u8; GLYPH_HEIGHT];
        for row in rows.iter_mut() {
            *row = self.receive(true, true)? & 0x1F;
        }
        self.set_ddram_address(saved)?;
        Ok(rows)
    }

    fn cgram_base(index: u8) -> u8 {
        ((index as usize * GLYPH_HEIGHT) % CGRAM_SIZE) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::powered;
    use crate::instruction::DisplayFunction;
    use crate::BLANK_CHARACTER;

    const SIZE: Size = Size { cols: 16, lines: 2 };

    #[test]
    fn test_size_limits() {
        assert!(Size::new(16, 2).is_ok());
        assert!(Size::new(20, 4).is_ok());
        assert!(Size::new(40, 2).is_ok());
        assert!(matches!(Size::new(41, 1), Err(LcdError::InvalidSize { cols: 41, lines: 1 })));
        assert!(Size::new(40, 3).is_err());
        assert!(Size::new(16, 5).is_err());
        assert!(Size::new(0, 2).is_err());
    }

    #[test]
    fn test_position_addresses() {
        let size = Size::new(20, 4).unwrap();
        assert_eq!(Position::new(0, 3).address(size), Some(3));
        assert_eq!(Position::new(1, 3).address(size), Some(0x43));
        assert_eq!(Position::new(2, 3).address(size), Some(23));
        assert_eq!(Position::new(3, 3).address(size), Some(0x57));
        for line in 0..4 {
            for offset in [0, 7, 19] {
                let p = Position::new(line, offset);
                assert_eq!(p.address(size).map(|a| Position::from_address(a, size)), Some(p));
            }
        }
    }

    #[test]
    fn test_position_outside_visible_area() {
        let size = Size::new(20, 4).unwrap();
        assert_eq!(Position::new(3, 200).address(size), None);
        assert_eq!(Position::new(4, 0).address(size), None);
        assert_eq!(Position::new(0, 20).address(size), None);
        assert_eq!(Position::new(3, 19).address(size), Some(0x40 + 20 + 19));

        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.set_cursor_position(size, Position::new(1, 2)).unwrap();
        assert!(matches!(
            lcd.set_cursor_position(size, Position::new(3, 200)),
            Err(LcdError::InvalidPosition { line: 3, offset: 200 })
        ));
        assert_eq!(lcd.address().unwrap(), 0x42);
    }

    #[test]
    fn test_initialise_two_line() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        assert!(!lcd.is_four_bit());
        assert_eq!(c.function(), DisplayFunction::TwoLine5x8);
        assert_eq!(c.address_counter(), 0);
    }

    #[test]
    fn test_four_bit_handshake() {
        let mut c = powered();
        {
            let mut lcd = DisplayInterface::new(&mut c);
            lcd.initialise_four_bit(true, false).unwrap();
            assert!(lcd.is_four_bit());
            lcd.write(SIZE, "Hi").unwrap();
            assert_eq!(lcd.cursor_position(SIZE).unwrap(), Position::new(0, 2));
            assert_eq!(lcd.read(SIZE).unwrap().lines().next(), Some("Hi              "));
        }
        assert!(c.is_four_bit());
        assert_eq!(c.function(), DisplayFunction::TwoLine5x8);

        // the handshake also recovers a controller already in 4-bit mode
        let mut lcd = DisplayInterface::with_bus_width(&mut c, true);
        lcd.initialise_four_bit(false, true).unwrap();
        drop(lcd);
        assert!(c.is_four_bit());
        assert_eq!(c.function(), DisplayFunction::OneLine5x11);
    }

    #[test]
    fn test_write_wraps_lines() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.write(SIZE, "0123456789ABCDEFxy").unwrap();
        assert_eq!(lcd.cursor_position(SIZE).unwrap(), Position::new(1, 2));
        lcd.write(SIZE, "\nz").unwrap();
        assert_eq!(lcd.cursor_position(SIZE).unwrap(), Position::new(0, 1));
        let text = lcd.read(SIZE).unwrap();
        assert_eq!(text, "z123456789ABCDEF\nxy              \n");
    }

    #[test]
    fn test_write_four_lines() {
        let size = Size::new(20, 4).unwrap();
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.write(size, "a\nb\nc\nd").unwrap();
        drop(lcd);
        assert_eq!(c.ddram().read(0, true).unwrap(), b'a');
        assert_eq!(c.ddram().read(0x40, true).unwrap(), b'b');
        assert_eq!(c.ddram().read(20, true).unwrap(), b'c');
        assert_eq!(c.ddram().read(0x54, true).unwrap(), b'd');
    }

    #[test]
    fn test_custom_chars() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.set_cursor_position(SIZE, Position::new(1, 4)).unwrap();
        let smiley = [0x00, 0x0A, 0x0A, 0x00, 0x11, 0x0E, 0x00, 0xFF];
        lcd.define_custom_char(3, &smiley).unwrap();
        assert_eq!(lcd.cursor_position(SIZE).unwrap(), Position::new(1, 4));
        let back = lcd.custom_char(3).unwrap();
        assert_eq!(back[..7], smiley[..7]);
        assert_eq!(back[7], 0x1F);

        lcd.write(SIZE, "\x04").unwrap();
        let text = lcd.read(SIZE).unwrap();
        assert_eq!(text.lines().nth(1).map(|l| l.as_bytes()[4]), Some(0x04));
        drop(lcd);
        assert_eq!(c.ddram().read(0x44, true).unwrap(), 3);
    }

    #[test]
    fn test_read_restores_cursor() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.set_cursor_position(SIZE, Position::new(1, 7)).unwrap();
        let text = lcd.read(SIZE).unwrap();
        assert_eq!(text.len(), 2 * 17);
        assert!(text.bytes().filter(|&b| b != b'\n').all(|b| b == BLANK_CHARACTER));
        assert_eq!(lcd.cursor_position(SIZE).unwrap(), Position::new(1, 7));
    }

    #[test]
    fn test_display_and_entry_mode() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.display_set(true, true, false).unwrap();
        lcd.entry_mode(false, false).unwrap();
        lcd.set_cursor_position(SIZE, Position::new(0, 5)).unwrap();
        lcd.write(SIZE, "A").unwrap();
        lcd.scroll(true, true).unwrap();
        lcd.backlight(true);
        drop(lcd);
        assert!(c.components().contains(crate::DisplayComponents::CURSOR));
        assert!(!c.increments());
        assert_eq!(c.address_counter(), 4);
        assert_eq!(c.display_shift(), 1);
        assert!(c.backlight());
    }

    #[test]
    fn test_home_and_clear() {
        let mut c = powered();
        let mut lcd = DisplayInterface::new(&mut c);
        lcd.initialise(true, false).unwrap();
        lcd.write(SIZE, "abc").unwrap();
        lcd.home().unwrap();
        assert_eq!(lcd.address().unwrap(), 0);
        lcd.write(SIZE, "X").unwrap();
        lcd.clear().unwrap();
        assert!(lcd.read(SIZE).unwrap().bytes().all(|b| b == b' ' || b == b'\n'));
    }
}
