//! Display data RAM.
//!
//! 80 physical bytes. In 2-line mode the second line lives at logical
//! addresses 0x40–0x67 and is folded down onto physical 40–79.

use crate::{LcdError, Result, ADDRESS_GAP, BLANK_CHARACTER, DDRAM_SIZE, LINE_LENGTH, SECOND_LINE_START};

#[derive(Clone)]
pub struct Ddram {
    data: [u8; DDRAM_SIZE],
}

impl Default for Ddram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ddram {
    pub fn new() -> Self {
        Ddram { data: [BLANK_CHARACTER; DDRAM_SIZE] }
    }

    /// Map a logical address to its physical slot.
    pub fn physical_index(address: u8, two_line: bool) -> Result<usize> {
        let out_of_range = LcdError::AddressOutOfRange { address, two_line };
        let index = address as usize;
        if two_line {
            if address < LINE_LENGTH {
                Ok(index)
            } else if address < SECOND_LINE_START {
                Err(out_of_range)
            } else if index < DDRAM_SIZE + ADDRESS_GAP as usize {
                Ok(index - ADDRESS_GAP as usize)
            } else {
                Err(out_of_range)
            }
        } else if index < DDRAM_SIZE {
            Ok(index)
        } else {
            Err(out_of_range)
        }
    }

    pub fn read(&self, address: u8, two_line: bool) -> Result<u8> {
        Ok(self.data[Self::physical_index(address, two_line)?])
    }

    pub fn write(&mut self, address: u8, two_line: bool, value: u8) -> Result<()> {
        let index = Self::physical_index(address, two_line)?;
        self.data[index] = value;
        Ok(())
    }

    /// Fill with the blank character.
    pub fn clear(&mut self) {
        self.data.fill(BLANK_CHARACTER);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Replace the whole contents; used when restoring a snapshot.
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != DDRAM_SIZE {
            return Err(LcdError::Snapshot(format!(
                "DDRAM image is {} bytes, expected {}",
                bytes.len(),
                DDRAM_SIZE
            )));
        }
        self.data.copy_from_slice(bytes);
        Ok(())
    }
}
