use crate::error::Result;

use super::{
    dwg_bit_reader::DwgBitReader,
    idwg_stream_reader::{DwgReferenceType, DwgStreamReader},
};

/// Merges the three object streams into one reader.
///
/// - Main/data stream: numeric and structural values
/// - Text stream: variable/unicode text payloads
/// - Handle stream: handle references
///
/// Positioning calls act on the main stream.
#[derive(Debug, Clone)]
pub struct DwgMergedReader<'a> {
    main_reader: DwgBitReader<'a>,
    text_reader: DwgBitReader<'a>,
    handle_reader: DwgBitReader<'a>,
}

impl<'a> DwgMergedReader<'a> {
    pub fn new(
        main_reader: DwgBitReader<'a>,
        text_reader: DwgBitReader<'a>,
        handle_reader: DwgBitReader<'a>,
    ) -> Self {
        Self {
            main_reader,
            text_reader,
            handle_reader,
        }
    }

    pub fn main_reader(&mut self) -> &mut DwgBitReader<'a> {
        &mut self.main_reader
    }

    pub fn text_reader(&mut self) -> &mut DwgBitReader<'a> {
        &mut self.text_reader
    }

    pub fn handle_reader(&mut self) -> &mut DwgBitReader<'a> {
        &mut self.handle_reader
    }

    pub fn into_parts(self) -> (DwgBitReader<'a>, DwgBitReader<'a>, DwgBitReader<'a>) {
        (self.main_reader, self.text_reader, self.handle_reader)
    }
}

impl DwgStreamReader for DwgMergedReader<'_> {
    fn position_in_bits(&self) -> u64 {
        self.main_reader.position_in_bits()
    }

    fn set_position_in_bits(&mut self, value: u64) -> Result<()> {
        self.main_reader.set_position_in_bits(value)
    }

    fn remaining_bits(&self) -> u64 {
        self.main_reader.remaining_bits()
    }

    fn read_bits(&mut self, count: u32) -> Result<u64> {
        self.main_reader.read_bits(count)
    }

    fn handle_reference_with_type(
        &mut self,
        reference_handle: u64,
    ) -> Result<(u64, DwgReferenceType)> {
        self.handle_reader
            .handle_reference_with_type(reference_handle)
    }

    fn read_variable_text(&mut self) -> Result<String> {
        if self.text_reader.is_empty() {
            return Ok(String::new());
        }
        self.text_reader.read_variable_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_routed_by_kind() {
        // byte 0: data, bytes 1..6: text "A" (BS 01 + 0x01, then 0x41 0x00), bytes 6..8: handle
        let buffer = [0x7F, 0x40, 0x50, 0x40, 0x00, 0x00, 0x51, 0x2A];
        let main = DwgBitReader::bounded(&buffer, 0, 8).unwrap();
        let text = DwgBitReader::bounded(&buffer, 8, 48).unwrap();
        let handles = DwgBitReader::bounded(&buffer, 48, 64).unwrap();
        let mut merged = DwgMergedReader::new(main, text, handles);

        assert_eq!(merged.handle_reference().unwrap(), 0x2A);
        assert_eq!(merged.read_variable_text().unwrap(), "A");
        assert_eq!(merged.read_byte().unwrap(), 0x7F);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_empty_text_stream_yields_empty_string() {
        let buffer = [0xFF];
        let main = DwgBitReader::bounded(&buffer, 0, 8).unwrap();
        let text = DwgBitReader::bounded(&buffer, 8, 8).unwrap();
        let handles = DwgBitReader::bounded(&buffer, 8, 8).unwrap();
        let mut merged = DwgMergedReader::new(main, text, handles);

        assert_eq!(merged.read_variable_text().unwrap(), "");
        assert_eq!(merged.read_bits(8).unwrap(), 0xFF);
    }
}
