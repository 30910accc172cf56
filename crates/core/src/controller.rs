//! HD44780 controller state machine.
//!
//! The host drives five inputs (RS, R/W, E, D7–D0 and power) plus the
//! backlight. Nothing happens until the enable line changes:
//!
//! - **Rising edge** with R/W high drives the busy flag and address counter
//!   (RS low) or the data read buffer (RS high) onto the bus.
//! - **Falling edge** with R/W low latches the bus into the instruction
//!   register (RS low) or the data register (RS high) and commits it.
//!
//! In 4-bit mode only D7–D4 are used and every transfer takes two enable
//! cycles, high nibble first.

use log::{debug, trace, warn};

use crate::address::{self, Direction};
use crate::blink::BlinkClock;
use crate::ddram::Ddram;
use crate::font::FontRom;
use crate::instruction::{DisplayComponents, DisplayFunction, Instruction};
use crate::render::PixelGrid;
use crate::{Result, CGRAM_SIZE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Snapshot of every pin, as seen from outside the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinState {
    pub register_select: bool,
    pub read_write: bool,
    pub enable: bool,
    pub data_bus: u8,
    pub power: bool,
    pub backlight: bool,
    pub busy: bool,
}

pub struct Controller {
    // ─── Pins ───
    /// RS: low selects the instruction register, high the data register
    pub(crate) register_select: bool,
    /// R/W: high reads from the controller
    pub(crate) read_write: bool,
    /// D7–D0; driven by the host on writes and by the controller on reads
    pub(crate) data_bus: u8,
    pub(crate) enable: bool,
    pub(crate) powered: bool,
    pub(crate) backlight: bool,

    // ─── Registers ───
    pub(crate) instruction_register: u8,
    pub(crate) data_register: u8,
    /// Byte at the address counter, refreshed after every committed cycle
    pub(crate) read_buffer: u8,
    pub(crate) busy: bool,
    pub(crate) address_counter: u8,
    /// Data accesses target CGRAM instead of DDRAM
    pub(crate) addressing_cgram: bool,

    // ─── Memory ───
    pub(crate) ddram: Ddram,
    pub(crate) cgram: [u8; CGRAM_SIZE],
    pub(crate) font: FontRom,

    // ─── Modes ───
    pub(crate) components: DisplayComponents,
    pub(crate) increment: bool,
    pub(crate) shift_on_write: bool,
    pub(crate) four_bit: bool,
    pub(crate) function: DisplayFunction,
    /// Signed display shift in characters; negative means shifted left
    pub(crate) display_shift: i8,

    // ─── 4-bit transfer state ───
    /// High nibble of a write waiting for its low half
    pub(crate) pending_nibble: Option<u8>,
    /// Byte being read out; `Some` between the first and second nibble
    pub(crate) read_latch: Option<u8>,

    // ─── Output ───
    pub(crate) lines: [PixelGrid; 2],
    pub(crate) blink: BlinkClock,
}

impl Controller {
    /// Create an unpowered controller with a free-running blink clock.
    pub fn new(font: FontRom) -> Self {
        Self::with_blink(font, BlinkClock::start())
    }

    pub fn with_blink(font: FontRom, blink: BlinkClock) -> Self {
        let width = DisplayFunction::default().line_width() as usize * GLYPH_WIDTH;
        Controller {
            register_select: false,
            read_write: false,
            data_bus: 0,
            enable: false,
            powered: false,
            backlight: false,
            instruction_register: 0,
            data_register: 0,
            read_buffer: 0,
            busy: false,
            address_counter: 0,
            addressing_cgram: false,
            ddram: Ddram::new(),
            cgram: [0; CGRAM_SIZE],
            font,
            components: DisplayComponents::empty(),
            increment: true,
            shift_on_write: false,
            four_bit: false,
            function: DisplayFunction::default(),
            display_shift: 0,
            pending_nibble: None,
            read_latch: None,
            lines: [PixelGrid::new(width, GLYPH_HEIGHT), PixelGrid::new(width, GLYPH_HEIGHT)],
            blink,
        }
    }

    /// Power-on reset of every register and memory. Pins are left alone.
    pub fn reset(&mut self) {
        self.instruction_register = 0;
        self.data_register = 0;
        self.read_buffer = 0;
        self.busy = false;
        self.address_counter = 0;
        self.addressing_cgram = false;
        self.ddram.clear();
        self.cgram = [0; CGRAM_SIZE];
        self.components = DisplayComponents::empty();
        self.increment = true;
        self.shift_on_write = false;
        self.four_bit = false;
        self.function = DisplayFunction::default();
        self.display_shift = 0;
        self.pending_nibble = None;
        self.read_latch = None;
    }

    // ─── Pin inputs ───

    pub fn set_register_select(&mut self, level: bool) {
        self.register_select = level;
    }

    pub fn set_read_write(&mut self, level: bool) {
        self.read_write = level;
    }

    pub fn set_data_bus(&mut self, value: u8) {
        self.data_bus = value;
    }

    pub fn set_data_bit(&mut self, bit: u8, level: bool) {
        let mask = 1u8 << (bit & 7);
        if level {
            self.data_bus |= mask;
        } else {
            self.data_bus &= !mask;
        }
    }

    pub fn set_backlight(&mut self, on: bool) {
        self.backlight = on;
    }

    pub fn set_power(&mut self, on: bool) -> Result<()> {
        if on == self.powered {
            return Ok(());
        }
        self.powered = on;
        if on {
            debug!("power on, resetting controller");
            self.reset();
        } else {
            debug!("power off");
        }
        self.render()
    }

    /// Drive the enable pin. Edges are detected against the previous level.
    pub fn set_enable(&mut self, level: bool) -> Result<()> {
        let previous = self.enable;
        self.enable = level;
        if previous == level {
            return Ok(());
        }
        if !self.powered {
            warn!("enable toggled while unpowered, ignoring");
            return Ok(());
        }
        if level {
            self.rising_edge();
            Ok(())
        } else {
            self.falling_edge()
        }
    }

    // ─── Bus cycles ───

    fn rising_edge(&mut self) {
        if !self.read_write {
            return;
        }
        let data = self.register_select;
        let byte = if data { self.read_buffer } else { self.status() };

        if self.four_bit {
            match self.read_latch.take() {
                None => {
                    self.read_latch = Some(byte);
                    self.data_bus = byte & 0xF0;
                }
                Some(latched) => {
                    self.data_bus = latched << 4;
                    if data {
                        self.advance();
                    }
                }
            }
        } else {
            self.data_bus = byte;
            if data {
                self.advance();
            }
        }
        trace!("read {} -> {:#04x}", if data { "data" } else { "status" }, self.data_bus);
    }

    fn falling_edge(&mut self) -> Result<()> {
        if self.read_write {
            if self.register_select && self.read_latch.is_none() {
                self.refresh_read_buffer()?;
                self.render()?;
            }
            return Ok(());
        }

        let byte = if self.four_bit {
            let nibble = self.data_bus >> 4;
            match self.pending_nibble.take() {
                None => {
                    self.pending_nibble = Some(nibble);
                    return Ok(());
                }
                Some(high) => (high << 4) | nibble,
            }
        } else {
            self.data_bus
        };

        self.busy = true;
        if self.register_select {
            self.data_register = byte;
            self.write_data(byte)?;
        } else {
            self.instruction_register = byte;
            self.execute(byte);
        }
        self.refresh_read_buffer()?;
        self.busy = false;
        self.render()
    }

    /// Busy flag in bit 7, address counter in bits 6–0.
    fn status(&self) -> u8 {
        ((self.busy as u8) << 7) | (self.address_counter & address::ADDRESS_MASK)
    }

    fn direction(&self) -> Direction {
        Direction::from_increment(self.increment)
    }

    fn advance(&mut self) {
        self.move_counter(self.direction());
    }

    fn move_counter(&mut self, direction: Direction) {
        let stepped = address::step(self.address_counter, direction);
        self.address_counter = if self.addressing_cgram {
            address::normalize_cgram(stepped)
        } else {
            address::normalize_ddram(stepped, self.function, direction)
        };
    }

    fn shift_display(&mut self, delta: i8) {
        self.display_shift = address::wrap_shift(self.display_shift.saturating_add(delta), self.function);
    }

    fn refresh_read_buffer(&mut self) -> Result<()> {
        self.read_buffer = if self.addressing_cgram {
            self.cgram[address::normalize_cgram(self.address_counter) as usize]
        } else {
            self.ddram.read(self.address_counter, self.function.is_two_line())?
        };
        Ok(())
    }

    fn write_data(&mut self, byte: u8) -> Result<()> {
        if self.addressing_cgram {
            trace!("CGRAM[{:#04x}] = {:#04x}", self.address_counter, byte);
            self.cgram[address::normalize_cgram(self.address_counter) as usize] = byte;
            self.advance();
            return Ok(());
        }
        trace!("DDRAM[{:#04x}] = {:#04x}", self.address_counter, byte);
        self.ddram.write(self.address_counter, self.function.is_two_line(), byte)?;
        self.advance();
        if self.shift_on_write {
            self.shift_display(if self.increment { -1 } else { 1 });
        }
        Ok(())
    }

    fn execute(&mut self, byte: u8) {
        let Some(instruction) = Instruction::decode(byte) else {
            trace!("no-op instruction {:#04x}", byte);
            return;
        };
        trace!("execute {:?}", instruction);
        match instruction {
            Instruction::ClearDisplay => {
                self.ddram.clear();
                self.return_home();
                self.increment = true;
            }
            Instruction::ReturnHome => self.return_home(),
            Instruction::EntryModeSet { increment, shift } => {
                self.increment = increment;
                self.shift_on_write = shift;
            }
            Instruction::DisplayControl(components) => self.components = components,
            Instruction::Shift { screen, right } => {
                let direction = if right { Direction::Increment } else { Direction::Decrement };
                if self.addressing_cgram {
                    self.addressing_cgram = false;
                    self.address_counter =
                        address::normalize_ddram(self.address_counter, self.function, direction);
                }
                if screen {
                    self.shift_display(if right { 1 } else { -1 });
                } else {
                    self.move_counter(direction);
                }
            }
            Instruction::FunctionSet { eight_bit, function } => {
                if self.four_bit == eight_bit {
                    debug!("bus width now {}-bit", if eight_bit { 8 } else { 4 });
                    self.pending_nibble = None;
                    self.read_latch = None;
                }
                if self.function != function {
                    debug!("display function now {:?}", function);
                }
                self.four_bit = !eight_bit;
                self.function = function;
                if !self.addressing_cgram {
                    self.address_counter =
                        address::normalize_ddram(self.address_counter, function, self.direction());
                }
                self.display_shift = address::wrap_shift(self.display_shift, function);
            }
            Instruction::SetCgramAddress(value) => {
                self.addressing_cgram = true;
                self.address_counter = address::normalize_cgram(value);
            }
            Instruction::SetDdramAddress(value) => {
                self.addressing_cgram = false;
                self.address_counter = address::normalize_ddram(value, self.function, self.direction());
            }
        }
    }

    fn return_home(&mut self) {
        self.addressing_cgram = false;
        self.address_counter = 0;
        self.display_shift = 0;
    }

    // ─── Accessors ───

    pub fn pins(&self) -> PinState {
        PinState {
            register_select: self.register_select,
            read_write: self.read_write,
            enable: self.enable,
            data_bus: self.data_bus,
            power: self.powered,
            backlight: self.backlight,
            busy: self.busy,
        }
    }

    pub fn data_bus(&self) -> u8 {
        self.data_bus
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    pub fn address_counter(&self) -> u8 {
        self.address_counter
    }

    pub fn is_addressing_cgram(&self) -> bool {
        self.addressing_cgram
    }

    pub fn instruction_register(&self) -> u8 {
        self.instruction_register
    }

    pub fn data_register(&self) -> u8 {
        self.data_register
    }

    pub fn ddram(&self) -> &Ddram {
        &self.ddram
    }

    pub fn cgram(&self) -> &[u8; CGRAM_SIZE] {
        &self.cgram
    }

    pub fn font(&self) -> &FontRom {
        &self.font
    }

    pub fn components(&self) -> DisplayComponents {
        self.components
    }

    pub fn function(&self) -> DisplayFunction {
        self.function
    }

    pub fn is_four_bit(&self) -> bool {
        self.four_bit
    }

    pub fn increments(&self) -> bool {
        self.increment
    }

    pub fn shifts_on_write(&self) -> bool {
        self.shift_on_write
    }

    pub fn display_shift(&self) -> i8 {
        self.display_shift
    }

    /// Render target for a physical line.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not 0 or 1.
    pub fn line(&self, index: usize) -> &PixelGrid {
        &self.lines[index]
    }

    pub fn lines(&self) -> &[PixelGrid; 2] {
        &self.lines
    }

    pub fn blink_clock(&self) -> &BlinkClock {
        &self.blink
    }
}
