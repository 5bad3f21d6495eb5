use crate::error::{DwgError, Result};

use super::idwg_stream_reader::DwgStreamReader;

/// Bounded bit cursor over a borrowed DWG buffer.
///
/// Positions are absolute bit offsets into the whole buffer, so offsets
/// computed for one stream can be compared with another. Reads never cross
/// `end`; a read that would fails with [`DwgError::OutOfBounds`] and leaves
/// the position untouched.
#[derive(Debug, Clone)]
pub struct DwgBitReader<'a> {
    buffer: &'a [u8],
    start: u64,
    end: u64,
    position: u64,
}

impl<'a> DwgBitReader<'a> {
    /// Cursor over the whole buffer, positioned at bit 0.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            start: 0,
            end: buffer.len() as u64 * 8,
            position: 0,
        }
    }

    /// Cursor over `[start, end)`, positioned at `start`.
    pub fn bounded(buffer: &'a [u8], start: u64, end: u64) -> Result<Self> {
        let buffer_bits = buffer.len() as u64 * 8;
        if end > buffer_bits {
            return Err(DwgError::OutOfBounds {
                position: end,
                end: buffer_bits,
            });
        }
        if start > end {
            return Err(DwgError::OutOfBounds {
                position: start,
                end,
            });
        }
        Ok(Self::from_validated(buffer, start, end))
    }

    /// Caller guarantees `start <= end <= buffer.len() * 8`.
    pub(crate) fn from_validated(buffer: &'a [u8], start: u64, end: u64) -> Self {
        debug_assert!(start <= end && end <= buffer.len() as u64 * 8);
        Self {
            buffer,
            start,
            end,
            position: start,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// The buffer this cursor reads from.
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    /// Byte offset of the cursor, rounded down.
    pub fn position(&self) -> u64 {
        self.position / 8
    }

    /// Skip to the next byte boundary.
    pub fn align_to_byte(&mut self) -> Result<()> {
        let aligned = self.position.div_ceil(8) * 8;
        self.set_position_in_bits(aligned)
    }

    fn bit_at(&self, bit_position: u64) -> u64 {
        let byte = self.buffer[(bit_position / 8) as usize];
        u64::from((byte >> (7 - (bit_position % 8))) & 1)
    }
}

impl DwgStreamReader for DwgBitReader<'_> {
    fn position_in_bits(&self) -> u64 {
        self.position
    }

    fn set_position_in_bits(&mut self, value: u64) -> Result<()> {
        if value < self.start || value > self.end {
            return Err(DwgError::OutOfBounds {
                position: value,
                end: self.end,
            });
        }
        self.position = value;
        Ok(())
    }

    fn remaining_bits(&self) -> u64 {
        self.end - self.position
    }

    fn read_bits(&mut self, count: u32) -> Result<u64> {
        if count > 64 {
            return Err(DwgError::Parse(format!("Cannot read {count} bits at once")));
        }
        if u64::from(count) > self.remaining_bits() {
            return Err(DwgError::OutOfBounds {
                position: self.position,
                end: self.end,
            });
        }

        let mut value = 0u64;
        for offset in 0..u64::from(count) {
            value = (value << 1) | self.bit_at(self.position + offset);
        }
        self.position += u64::from(count);
        Ok(value)
    }
}
