use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DwgError, Result};

/// Handle reference addressing mode in DWG streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwgReferenceType {
    /// Codes 0 and 1: plain absolute handle.
    Undefined,
    SoftOwnership,
    HardOwnership,
    SoftPointer,
    HardPointer,
    /// Codes 6, 8, A, C: offset from the owner handle.
    Relative,
}

/// Reader contract for DWG bit streams.
///
/// Implementors provide positioning and raw bit access; the DWG value
/// encodings (BS, BL, BD, MC, MS, handles, text) are built on top of
/// [`read_bits`](DwgStreamReader::read_bits) so every implementation decodes
/// them identically.
pub trait DwgStreamReader {
    /// Absolute bit offset of the next bit to read.
    fn position_in_bits(&self) -> u64;

    /// Seek to an absolute bit offset inside the stream bounds.
    fn set_position_in_bits(&mut self, value: u64) -> Result<()>;

    /// Bits left before the stream end.
    fn remaining_bits(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Read `count` bits (at most 64), most significant bit first.
    fn read_bits(&mut self, count: u32) -> Result<u64>;

    fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    fn read_2_bits(&mut self) -> Result<u8> {
        Ok(self.read_bits(2)? as u8)
    }

    /// RC: eight bits at any alignment.
    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        if (length as u64).saturating_mul(8) > self.remaining_bits() {
            return Err(DwgError::OutOfBounds {
                position: self.position_in_bits(),
                end: self.position_in_bits() + self.remaining_bits(),
            });
        }
        (0..length).map(|_| self.read_byte()).collect()
    }

    /// RS: little-endian 16-bit value.
    fn read_short(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(&self.read_bytes(2)?))
    }

    /// RL: little-endian 32-bit value.
    fn read_int(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(&self.read_bytes(4)?))
    }

    /// RD: little-endian IEEE double.
    fn read_double(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(&self.read_bytes(8)?))
    }

    /// 16-bit size field of the string stream trailer.
    ///
    /// The trailer is located by stepping backwards from the end of the
    /// data stream, but the field itself is laid out forwards: two 8-bit
    /// groups where the first group read is the low-order byte, i.e. the
    /// reverse of reading the 16 bits as one MSB-first number.
    fn read_reversed_short(&mut self) -> Result<u16> {
        let low = self.read_byte()?;
        let high = self.read_byte()?;
        Ok(u16::from(high) << 8 | u16::from(low))
    }

    /// BS: bit short.
    fn read_bit_short(&mut self) -> Result<i16> {
        match self.read_2_bits()? {
            0 => self.read_short(),
            1 => Ok(i16::from(self.read_byte()?)),
            2 => Ok(0),
            _ => Ok(256),
        }
    }

    /// BL: bit long.
    fn read_bit_long(&mut self) -> Result<i32> {
        match self.read_2_bits()? {
            0 => self.read_int(),
            1 => Ok(i32::from(self.read_byte()?)),
            2 => Ok(0),
            _ => Err(DwgError::Parse("Invalid bitlong code".to_string())),
        }
    }

    /// BD: bit double.
    fn read_bit_double(&mut self) -> Result<f64> {
        match self.read_2_bits()? {
            0 => self.read_double(),
            1 => Ok(1.0),
            2 => Ok(0.0),
            _ => Err(DwgError::Parse("Invalid bitdouble code".to_string())),
        }
    }

    /// MC: unsigned modular char, 7 bits per byte, high bit continues.
    fn read_modular_char(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            value |= u64::from(byte & 0x7F) << shift;
            if (byte & 0x80) == 0 {
                break;
            }
            shift += 7;
            if shift > 63 {
                return Err(DwgError::Parse("Invalid modular char".to_string()));
            }
        }
        Ok(value)
    }

    /// Signed MC: the last byte carries 6 value bits and the sign in 0x40.
    fn read_signed_modular_char(&mut self) -> Result<i64> {
        let mut value: i64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_byte()?;
            if (byte & 0x80) == 0 {
                value |= i64::from(byte & 0x3F) << shift;
                return Ok(if (byte & 0x40) != 0 { -value } else { value });
            }
            value |= i64::from(byte & 0x7F) << shift;
            shift += 7;
            if shift > 56 {
                return Err(DwgError::Parse("Invalid signed modular char".to_string()));
            }
        }
    }

    /// MS: modular short, 15 bits per little-endian word, 0x8000 continues.
    fn read_modular_short(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let word = self.read_reversed_short()?;
            value |= u64::from(word & 0x7FFF) << shift;
            if (word & 0x8000) == 0 {
                break;
            }
            shift += 15;
            if shift > 60 {
                return Err(DwgError::Parse("Invalid modular short".to_string()));
            }
        }
        Ok(value)
    }

    /// H: absolute handle reference (owner 0).
    fn handle_reference(&mut self) -> Result<u64> {
        self.handle_reference_from(0)
    }

    fn handle_reference_from(&mut self, reference_handle: u64) -> Result<u64> {
        let (value, _kind) = self.handle_reference_with_type(reference_handle)?;
        Ok(value)
    }

    /// `|CODE (4 bits)|COUNTER (4 bits)|HANDLE bytes|`, bytes most significant first.
    fn handle_reference_with_type(
        &mut self,
        reference_handle: u64,
    ) -> Result<(u64, DwgReferenceType)> {
        let form = self.read_byte()?;
        let code = form >> 4;
        let counter = form & 0x0F;
        if counter > 8 {
            return Err(DwgError::Parse(format!(
                "Invalid handle byte count {counter}"
            )));
        }

        let mut offset: u64 = 0;
        for _ in 0..counter {
            offset = (offset << 8) | u64::from(self.read_byte()?);
        }

        let resolved = match code {
            0x0 | 0x1 => (offset, DwgReferenceType::Undefined),
            0x2 => (offset, DwgReferenceType::SoftOwnership),
            0x3 => (offset, DwgReferenceType::HardOwnership),
            0x4 => (offset, DwgReferenceType::SoftPointer),
            0x5 => (offset, DwgReferenceType::HardPointer),
            0x6 => (reference_handle.wrapping_add(1), DwgReferenceType::Relative),
            0x8 => (reference_handle.wrapping_sub(1), DwgReferenceType::Relative),
            0xA => (reference_handle.wrapping_add(offset), DwgReferenceType::Relative),
            0xC => (reference_handle.wrapping_sub(offset), DwgReferenceType::Relative),
            other => {
                return Err(DwgError::Parse(format!(
                    "Invalid handle reference code {other:#X}"
                )))
            }
        };
        Ok(resolved)
    }

    /// TU: R2007+ text, BS character count followed by UTF-16LE code units.
    fn read_variable_text(&mut self) -> Result<String> {
        let length = self.read_bit_short()?;
        if length <= 0 {
            return Ok(String::new());
        }

        let bytes = self.read_bytes(length as usize * 2)?;
        let (text, _had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(&bytes);
        Ok(text.trim_end_matches('\0').to_string())
    }
}
