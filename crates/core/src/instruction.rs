//! Instruction set decoding.
//!
//! The controller identifies an instruction by the most significant set bit
//! of the instruction register: `0x80` is Set DDRAM Address regardless of the
//! low bits, `0x40` Set CGRAM Address, down to `0x01` Clear Display. The
//! decode table is ordered from the highest mask to the lowest and the first
//! match wins.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{LINE_LENGTH, SECOND_LINE_START, DDRAM_SIZE, GLYPH_HEIGHT, EXTENDED_GLYPH_HEIGHT};

bitflags! {
    /// Display Control flags (D, C, B)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DisplayComponents: u8 {
        const DISPLAY = 0b100;
        const CURSOR = 0b010;
        const BLINK = 0b001;
    }
}

/// Line count and font, as selected by Function Set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayFunction {
    /// 1 line of 80 characters, 5×8 font
    #[default]
    OneLine5x8,
    /// 1 line of 80 characters, 5×10 font (11 rows including the cursor line)
    OneLine5x11,
    /// 2 lines of 40 characters, 5×8 font
    TwoLine5x8,
}

impl DisplayFunction {
    /// Resolve the N and F bits. The chip has no 2-line 5×10 mode; N wins.
    pub fn from_flags(two_line: bool, extended_font: bool) -> Self {
        match (two_line, extended_font) {
            (true, _) => DisplayFunction::TwoLine5x8,
            (false, true) => DisplayFunction::OneLine5x11,
            (false, false) => DisplayFunction::OneLine5x8,
        }
    }

    pub fn is_two_line(self) -> bool {
        self == DisplayFunction::TwoLine5x8
    }

    pub fn is_extended(self) -> bool {
        self == DisplayFunction::OneLine5x11
    }

    /// Characters per physical line.
    pub fn line_width(self) -> u8 {
        if self.is_two_line() { LINE_LENGTH } else { DDRAM_SIZE as u8 }
    }

    /// Highest valid DDRAM address.
    pub fn max_address(self) -> u8 {
        if self.is_two_line() {
            SECOND_LINE_START + LINE_LENGTH - 1
        } else {
            DDRAM_SIZE as u8 - 1
        }
    }

    /// Glyph rows rendered per character, including the cursor line.
    pub fn glyph_rows(self) -> usize {
        if self.is_extended() { EXTENDED_GLYPH_HEIGHT } else { GLYPH_HEIGHT }
    }
}

/// A decoded instruction register value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClearDisplay,
    ReturnHome,
    EntryModeSet { increment: bool, shift: bool },
    DisplayControl(DisplayComponents),
    /// Cursor or display shift; `screen` selects the display, `right` the direction
    Shift { screen: bool, right: bool },
    FunctionSet { eight_bit: bool, function: DisplayFunction },
    SetCgramAddress(u8),
    SetDdramAddress(u8),
}

type Decoder = fn(u8) -> Instruction;

/// (opcode mask, decoder), highest mask first
const DECODE_TABLE: [(u8, Decoder); 8] = [
    (0x80, decode_set_ddram_address),
    (0x40, decode_set_cgram_address),
    (0x20, decode_function_set),
    (0x10, decode_shift),
    (0x08, decode_display_control),
    (0x04, decode_entry_mode_set),
    (0x02, decode_return_home),
    (0x01, decode_clear_display),
];

fn decode_set_ddram_address(b: u8) -> Instruction {
    Instruction::SetDdramAddress(b & 0x7F)
}

fn decode_set_cgram_address(b: u8) -> Instruction {
    Instruction::SetCgramAddress(b & 0x3F)
}

fn decode_function_set(b: u8) -> Instruction {
    Instruction::FunctionSet {
        eight_bit: b & 0x10 != 0,
        function: DisplayFunction::from_flags(b & 0x08 != 0, b & 0x04 != 0),
    }
}

fn decode_shift(b: u8) -> Instruction {
    Instruction::Shift { screen: b & 0x08 != 0, right: b & 0x04 != 0 }
}

fn decode_display_control(b: u8) -> Instruction {
    Instruction::DisplayControl(DisplayComponents::from_bits_truncate(b))
}

fn decode_entry_mode_set(b: u8) -> Instruction {
    Instruction::EntryModeSet { increment: b & 0x02 != 0, shift: b & 0x01 != 0 }
}

fn decode_return_home(_: u8) -> Instruction {
    Instruction::ReturnHome
}

fn decode_clear_display(_: u8) -> Instruction {
    Instruction::ClearDisplay
}

impl Instruction {
    /// Decode an instruction register value. `0x00` is not an instruction.
    pub fn decode(byte: u8) -> Option<Self> {
        DECODE_TABLE
            .iter()
            .find(|(mask, _)| byte & mask != 0)
            .map(|(_, decoder)| decoder(byte))
    }

    /// Canonical encoding (unused bits zero).
    pub fn encode(self) -> u8 {
        match self {
            Instruction::ClearDisplay => 0x01,
            Instruction::ReturnHome => 0x02,
            Instruction::EntryModeSet { increment, shift } => {
                0x04 | ((increment as u8) << 1) | shift as u8
            }
            Instruction::DisplayControl(components) => 0x08 | components.bits(),
            Instruction::Shift { screen, right } => {
                0x10 | ((screen as u8) << 3) | ((right as u8) << 2)
            }
            Instruction::FunctionSet { eight_bit, function } => {
                let (n, f) = match function {
                    DisplayFunction::OneLine5x8 => (0, 0),
                    DisplayFunction::OneLine5x11 => (0, 1),
                    DisplayFunction::TwoLine5x8 => (1, 0),
                };
                0x20 | ((eight_bit as u8) << 4) | (n << 3) | (f << 2)
            }
            Instruction::SetCgramAddress(address) => 0x40 | (address & 0x3F),
            Instruction::SetDdramAddress(address) => 0x80 | (address & 0x7F),
        }
    }
}

/// Human-readable meaning of a staged bus value, as shown beside the pin
/// indicators.
pub fn describe_bus(register_select: bool, read_write: bool, data: u8) -> &'static str {
    match (register_select, read_write) {
        (true, false) => "Write data",
        (false, true) => "Read busy flag and address counter",
        (true, true) => "Read data",
        (false, false) => Instruction::decode(data).map_or("No operation", describe_instruction),
    }
}

fn describe_instruction(instruction: Instruction) -> &'static str {
    match instruction {
        Instruction::ClearDisplay => "Clear display",
        Instruction::ReturnHome => "Return home",
        Instruction::EntryModeSet { increment, shift } => match (increment, shift) {
            (false, false) => "Decrement cursor on read/write, don't shift screen",
            (false, true) => "Decrement cursor on read/write, shift screen on write",
            (true, false) => "Increment cursor on read/write, don't shift screen",
            (true, true) => "Increment cursor on read/write, shift screen on write",
        },
        Instruction::DisplayControl(c) => {
            let display = c.contains(DisplayComponents::DISPLAY);
            let cursor = c.contains(DisplayComponents::CURSOR);
            let blink = c.contains(DisplayComponents::BLINK);
            match (display, cursor, blink) {
                (false, false, false) => "Disable display, cursor, and blink",
                (false, false, true) => "Disable display and cursor, enable blink",
                (false, true, false) => "Disable display and blink, enable cursor",
                (false, true, true) => "Disable display, enable cursor and blink",
                (true, false, false) => "Enable display, disable cursor and blink",
                (true, false, true) => "Enable display and blink, disable cursor",
                (true, true, false) => "Enable display and cursor, disable blink",
                (true, true, true) => "Enable display, cursor, and blink",
            }
        }
        Instruction::Shift { screen, right } => match (screen, right) {
            (false, false) => "Move cursor left",
            (false, true) => "Move cursor right",
            (true, false) => "Shift display left",
            (true, true) => "Shift display right",
        },
        Instruction::FunctionSet { eight_bit, function } => match (eight_bit, function) {
            (false, DisplayFunction::OneLine5x8) => "4-bit interface, 1-line, 5x8 font",
            (false, DisplayFunction::OneLine5x11) => "4-bit interface, 1-line, 5x10 font",
            (false, DisplayFunction::TwoLine5x8) => "4-bit interface, 2-line, 5x8 font",
            (true, DisplayFunction::OneLine5x8) => "8-bit interface, 1-line, 5x8 font",
            (true, DisplayFunction::OneLine5x11) => "8-bit interface, 1-line, 5x10 font",
            (true, DisplayFunction::TwoLine5x8) => "8-bit interface, 2-line, 5x8 font",
        },
        Instruction::SetCgramAddress(_) => "Set address in CGRAM (address in lowest 6 bits)",
        Instruction::SetDdramAddress(_) => "Set address in DDRAM (address in lowest 7 bits)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_highest_bit_wins() {
        // 0xFF has every opcode bit set; Set DDRAM Address takes precedence
        assert_eq!(Instruction::decode(0xFF), Some(Instruction::SetDdramAddress(0x7F)));
        assert_eq!(Instruction::decode(0x7F), Some(Instruction::SetCgramAddress(0x3F)));
        assert_eq!(Instruction::decode(0x03), Some(Instruction::ReturnHome));
        assert_eq!(Instruction::decode(0x00), None);
    }

    #[test]
    fn test_decode_flags() {
        assert_eq!(
            Instruction::decode(0x06),
            Some(Instruction::EntryModeSet { increment: true, shift: false })
        );
        assert_eq!(
            Instruction::decode(0x0E),
            Some(Instruction::DisplayControl(DisplayComponents::DISPLAY | DisplayComponents::CURSOR))
        );
        assert_eq!(
            Instruction::decode(0x18),
            Some(Instruction::Shift { screen: true, right: false })
        );
        assert_eq!(
            Instruction::decode(0x38),
            Some(Instruction::FunctionSet { eight_bit: true, function: DisplayFunction::TwoLine5x8 })
        );
    }

    #[test]
    fn test_two_line_beats_extended_font() {
        // N=1, F=1 is not a real mode: resolves to 2-line 5x8
        assert_eq!(
            Instruction::decode(0x2C),
            Some(Instruction::FunctionSet { eight_bit: false, function: DisplayFunction::TwoLine5x8 })
        );
        assert_eq!(DisplayFunction::from_flags(false, true), DisplayFunction::OneLine5x11);
    }

    #[test]
    fn test_encode_decode_agree() {
        for byte in [0x01, 0x02, 0x07, 0x0F, 0x14, 0x1C, 0x24, 0x30, 0x48, 0xC5] {
            let instr = Instruction::decode(byte).unwrap();
            assert_eq!(instr.encode(), byte, "{:?}", instr);
        }
    }

    #[test]
    fn test_function_geometry() {
        assert_eq!(DisplayFunction::TwoLine5x8.line_width(), 40);
        assert_eq!(DisplayFunction::TwoLine5x8.max_address(), 103);
        assert_eq!(DisplayFunction::OneLine5x8.line_width(), 80);
        assert_eq!(DisplayFunction::OneLine5x11.max_address(), 79);
        assert_eq!(DisplayFunction::OneLine5x11.glyph_rows(), 11);
    }

    #[test]
    fn test_describe_bus() {
        assert_eq!(describe_bus(true, true, 0xFF), "Read data");
        assert_eq!(describe_bus(false, false, 0x01), "Clear display");
        assert_eq!(describe_bus(false, false, 0x1C), "Shift display right");
        assert_eq!(describe_bus(false, false, 0x3C), "8-bit interface, 2-line, 5x8 font");
        assert_eq!(describe_bus(true, false, 0x41), "Write data");
        assert_eq!(describe_bus(false, true, 0x00), "Read busy flag and address counter");
        assert_eq!(describe_bus(false, false, 0x00), "No operation");
    }
}
