//! Controller state snapshots and the rewind ring.
//!
//! A [`Snapshot`] captures everything that survives between bus cycles:
//! registers, address counter, mode flags, the display shift, the 4-bit
//! transfer phase and both RAMs. The font and the blink clock are not part
//! of it. Snapshots live in memory only.
//!
//! ## Encoded form
//!
//! ```text
//! +------------------+
//! | Magic "LCDS"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::address::{self, Direction};
use crate::controller::Controller;
use crate::instruction::{DisplayComponents, DisplayFunction};
use crate::{LcdError, Result, CGRAM_SIZE, DDRAM_SIZE};

const MAGIC: &[u8; 4] = b"LCDS";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    // pins
    pub register_select: bool,
    pub read_write: bool,
    pub data_bus: u8,
    pub enable: bool,
    pub powered: bool,
    pub backlight: bool,
    // registers
    pub instruction_register: u8,
    pub data_register: u8,
    pub read_buffer: u8,
    pub busy: bool,
    pub address_counter: u8,
    pub addressing_cgram: bool,
    // modes
    /// Display Control bits (D, C, B)
    pub components: u8,
    pub increment: bool,
    pub shift_on_write: bool,
    pub four_bit: bool,
    pub function: DisplayFunction,
    pub display_shift: i8,
    pub pending_nibble: Option<u8>,
    pub read_latch: Option<u8>,
    // memory
    pub ddram: Vec<u8>,
    pub cgram: Vec<u8>,
}

impl Snapshot {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self).map_err(|e| LcdError::Snapshot(e.to_string()))?;
        let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);
        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&compressed);
        Ok(out)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN || &data[..4] != MAGIC {
            return Err(LcdError::Snapshot("not a controller snapshot".into()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&data[4..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(LcdError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }
        let payload = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
            .map_err(|e| LcdError::Snapshot(format!("decompress error: {:?}", e)))?;
        bincode::deserialize(&payload).map_err(|e| LcdError::Snapshot(e.to_string()))
    }

    /// Check memory image sizes, the address counter and the display shift
    /// against the snapshot's own display function.
    fn validate(&self) -> Result<()> {
        if self.ddram.len() != DDRAM_SIZE {
            return Err(LcdError::Snapshot(format!(
                "DDRAM image is {} bytes, expected {}",
                self.ddram.len(),
                DDRAM_SIZE
            )));
        }
        if self.cgram.len() != CGRAM_SIZE {
            return Err(LcdError::Snapshot(format!(
                "CGRAM image is {} bytes, expected {}",
                self.cgram.len(),
                CGRAM_SIZE
            )));
        }
        let counter_valid = if self.addressing_cgram {
            address::normalize_cgram(self.address_counter) == self.address_counter
        } else {
            [Direction::Increment, Direction::Decrement]
                .iter()
                .all(|&d| address::normalize_ddram(self.address_counter, self.function, d) == self.address_counter)
        };
        if !counter_valid {
            return Err(LcdError::Snapshot(format!(
                "address counter {:#04x} is invalid for {:?}",
                self.address_counter, self.function
            )));
        }
        if address::wrap_shift(self.display_shift, self.function) != self.display_shift {
            return Err(LcdError::Snapshot(format!(
                "display shift {} is invalid for {:?}",
                self.display_shift, self.function
            )));
        }
        Ok(())
    }
}

impl Controller {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            register_select: self.register_select,
            read_write: self.read_write,
            data_bus: self.data_bus,
            enable: self.enable,
            powered: self.powered,
            backlight: self.backlight,
            instruction_register: self.instruction_register,
            data_register: self.data_register,
            read_buffer: self.read_buffer,
            busy: self.busy,
            address_counter: self.address_counter,
            addressing_cgram: self.addressing_cgram,
            components: self.components.bits(),
            increment: self.increment,
            shift_on_write: self.shift_on_write,
            four_bit: self.four_bit,
            function: self.function,
            display_shift: self.display_shift,
            pending_nibble: self.pending_nibble,
            read_latch: self.read_latch,
            ddram: self.ddram.as_bytes().to_vec(),
            cgram: self.cgram.to_vec(),
        }
    }

    /// Restore a snapshot and re-render. A snapshot that fails validation is
    /// rejected before anything changes.
    pub fn restore(&mut self, snap: &Snapshot) -> Result<()> {
        snap.validate()?;
        self.ddram.load(&snap.ddram)?;
        self.cgram.copy_from_slice(&snap.cgram);

        self.register_select = snap.register_select;
        self.read_write = snap.read_write;
        self.data_bus = snap.data_bus;
        self.enable = snap.enable;
        self.powered = snap.powered;
        self.backlight = snap.backlight;
        self.instruction_register = snap.instruction_register;
        self.data_register = snap.data_register;
        self.read_buffer = snap.read_buffer;
        self.busy = snap.busy;
        self.address_counter = snap.address_counter;
        self.addressing_cgram = snap.addressing_cgram;
        self.components = DisplayComponents::from_bits_truncate(snap.components);
        self.increment = snap.increment;
        self.shift_on_write = snap.shift_on_write;
        self.four_bit = snap.four_bit;
        self.function = snap.function;
        self.display_shift = snap.display_shift;
        self.pending_nibble = snap.pending_nibble;
        self.read_latch = snap.read_latch;
        debug!("restored snapshot (AC={:#04x})", self.address_counter);
        self.render()
    }
}

/// Bounded stack of encoded snapshots; the oldest entry is dropped when
/// full.
pub struct RewindBuffer {
    entries: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl RewindBuffer {
    pub fn new(capacity: usize) -> Self {
        RewindBuffer { entries: VecDeque::with_capacity(capacity), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, snap: &Snapshot) -> Result<()> {
        let encoded = snap.encode()?;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(encoded);
        Ok(())
    }

    /// Most recent snapshot, removed from the ring.
    pub fn pop(&mut self) -> Option<Result<Snapshot>> {
        self.entries.pop_back().map(|data| Snapshot::decode(&data))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Bytes held by the encoded snapshots.
    pub fn memory_usage(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{powered, write};

    #[test]
    fn test_restore_brings_back_state() {
        let mut c = powered();
        write(&mut c, false, 0x38);
        write(&mut c, false, 0x0E);
        write(&mut c, true, b'A');
        let snap = c.snapshot();
        let lit = c.line(0).lit_count();

        write(&mut c, false, 0x01);
        write(&mut c, false, 0x30);
        assert_eq!(c.ddram().read(0, false).unwrap(), b' ');

        c.restore(&snap).unwrap();
        assert_eq!(c.ddram().read(0, true).unwrap(), b'A');
        assert_eq!(c.address_counter(), 1);
        assert_eq!(c.function(), DisplayFunction::TwoLine5x8);
        assert_eq!(c.line(0).lit_count(), lit);
        assert_eq!(c.snapshot(), snap);
    }

    #[test]
    fn test_encoded_snapshot_decodes() {
        let mut c = powered();
        write(&mut c, false, 0x40);
        write(&mut c, true, 0x1F);
        let snap = c.snapshot();
        let bytes = snap.encode().unwrap();
        assert_eq!(&bytes[..4], b"LCDS");
        assert_eq!(Snapshot::decode(&bytes).unwrap(), snap);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Snapshot::decode(b"nope").is_err());
        let mut bytes = powered().snapshot().encode().unwrap();
        bytes[4] = 9;
        let err = Snapshot::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }

    #[test]
    fn test_restore_rejects_bad_image() {
        let mut c = powered();
        let mut snap = c.snapshot();
        snap.cgram.truncate(10);
        assert!(c.restore(&snap).is_err());
    }

    #[test]
    fn test_restore_rejects_invalid_counter_untouched() {
        let mut c = powered();
        write(&mut c, false, 0x38);
        write(&mut c, true, b'K');
        let before = c.snapshot();

        // 0x50 sits in the 2-line gap
        let mut bad = before.clone();
        bad.address_counter = 0x50;
        bad.ddram[0] = b'Z';
        assert!(c.restore(&bad).is_err());
        assert_eq!(c.snapshot(), before);

        let mut bad = before.clone();
        bad.display_shift = 40;
        assert!(c.restore(&bad).is_err());

        // the same counter is fine for a 1-line snapshot
        let mut ok = before.clone();
        ok.function = DisplayFunction::OneLine5x8;
        ok.address_counter = 0x45;
        c.restore(&ok).unwrap();
        assert_eq!(c.address_counter(), 0x45);
    }

    #[test]
    fn test_rewind_buffer() {
        let mut c = powered();
        let mut rewind = RewindBuffer::new(2);
        assert!(rewind.is_empty());
        for &b in b"XYZ" {
            rewind.push(&c.snapshot()).unwrap();
            write(&mut c, true, b);
        }
        assert_eq!(rewind.len(), 2);
        assert!(rewind.memory_usage() > 0);

        let last = rewind.pop().unwrap().unwrap();
        c.restore(&last).unwrap();
        assert_eq!(c.address_counter(), 2);
        assert_eq!(c.ddram().read(2, false).unwrap(), b' ');

        let first = rewind.pop().unwrap().unwrap();
        assert_eq!(first.address_counter, 1);
        assert!(rewind.pop().is_none());

        rewind.push(&first).unwrap();
        rewind.clear();
        assert!(rewind.is_empty());
    }
}
