//! # charlcd-core
//!
//! Pin-level emulation core for HD44780-compatible character LCD controllers,
//! the chip behind most 16×2 and 20×4 alphanumeric modules.
//!
//! The controller is driven exactly as the real part would be wired to a host
//! MPU: register-select, read/write, enable and an 8-bit data bus. Falling
//! enable edges latch writes, rising edges drive reads onto the bus, and every
//! committed cycle re-renders the dot matrix.
//!
//! ## Architecture
//!
//! - [`Controller`]: pins, instruction/data registers, address counter, edge handling
//! - [`ddram::Ddram`]: 80-byte display data RAM with the two-line address gap
//! - [`font::FontRom`]: 256-entry character generator ROM plus cursor/blink overlays
//! - [`instruction`]: ordered opcode decode table and bus-value descriptions
//! - [`address`]: pure address-counter normalization (wrap, gap deflection)
//! - [`render`]: per-line dot grids built from DDRAM, CGRAM and the font
//! - [`blink::BlinkClock`]: background cursor-blink toggle owned by the controller
//! - [`interface::DisplayInterface`]: host-side helper composing bus cycles
//! - [`snapshot`]: in-memory state snapshots and rewind ring buffer
//! - [`png`]: screenshot export of the render grids
//!
//! ## Address space
//!
//! | Mode          | Valid DDRAM addresses | Line width |
//! |---------------|-----------------------|------------|
//! | 1-line        | 0x00–0x4F             | 80         |
//! | 2-line        | 0x00–0x27, 0x40–0x67  | 40         |
//!
//! CGRAM is a flat 64-byte space addressed with 6 bits.

pub mod address;
pub mod blink;
pub mod controller;
pub mod ddram;
pub mod font;
pub mod instruction;
pub mod interface;
pub mod png;
pub mod render;
pub mod snapshot;

pub use blink::BlinkClock;
pub use controller::{Controller, PinState};
pub use font::FontRom;
pub use instruction::{DisplayComponents, DisplayFunction, Instruction};
pub use interface::{DisplayInterface, Position, Size};
pub use render::PixelGrid;
pub use snapshot::{RewindBuffer, Snapshot};

use thiserror::Error;

/// Physical DDRAM size in bytes (2 × 40 positions)
pub const DDRAM_SIZE: usize = 80;
/// Characters per line in two-line mode
pub const LINE_LENGTH: u8 = 40;
/// First DDRAM address of the second line in two-line mode
pub const SECOND_LINE_START: u8 = 0x40;
/// Distance between logical second-line addresses and their physical slots
pub const ADDRESS_GAP: u8 = SECOND_LINE_START - LINE_LENGTH;
/// CGRAM size in bytes
pub const CGRAM_SIZE: usize = 64;
/// Character codes below this value are taken from CGRAM
pub const CGRAM_CHARACTER_CODE_END: u8 = 0x10;
/// Code written by Clear Display and power-on reset
pub const BLANK_CHARACTER: u8 = 0x20;

/// Dots per glyph row
pub const GLYPH_WIDTH: usize = 5;
/// Rows in a standard glyph, and in each render grid
pub const GLYPH_HEIGHT: usize = 8;
/// Rows in an extended (5×10 + cursor line) glyph
pub const EXTENDED_GLYPH_HEIGHT: usize = 11;
/// Row storage per font entry
pub const MAX_GLYPH_ROWS: usize = 16;

/// Errors raised by the controller core.
///
/// All of these are precondition violations: the bus state machine
/// normalizes addresses before touching memory, so a fault here means a
/// caller bypassed it or supplied malformed configuration.
#[derive(Debug, Error)]
pub enum LcdError {
    #[error("DDRAM address {address:#04x} is out of range ({} mode)", if *two_line { "2-line" } else { "1-line" })]
    AddressOutOfRange { address: u8, two_line: bool },
    #[error("the second display line does not exist in 1-line mode")]
    NoSecondLine,
    #[error("font entry {code:#04x} has {rows} rows (at most {MAX_GLYPH_ROWS} allowed)")]
    GlyphRowsTooLong { code: u8, rows: usize },
    #[error("font entry {code:#04x} has {rows} rows, {required} required")]
    GlyphRowsTooShort { code: u8, rows: usize, required: usize },
    #[error("font must define exactly 256 glyphs, got {0}")]
    GlyphCount(usize),
    #[error("invalid screen size {cols}x{lines}")]
    InvalidSize { cols: u8, lines: u8 },
    #[error("position line {line}, offset {offset} is outside the screen")]
    InvalidPosition { line: u8, offset: u8 },
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LcdError>;
