//! Locates the data, string and handle streams of a DWG buffer.
//!
//! R2007+ objects (and the top-level sections laid out the same way) pack
//! three streams into one buffer at bit granularity:
//!
//! ```text
//! | header | data stream | string stream | string size | flag | handle stream |
//!          ^data_start   ^string_start   ^string_end          ^end_data_position
//! ```
//!
//! The header gives the end of the data+string span. The string stream
//! size sits in a trailer right before that point, so its bounds are
//! found by reading backwards: the last bit is the "has string stream"
//! flag, preceded by a 15-bit size that a continuation bit extends to 30
//! bits with a second 16-bit field.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace, warn};

use crate::error::{DwgError, Result};

use super::dwg_stream_readers::{DwgBitReader, DwgMergedReader, DwgStreamReader};
use super::dwg_streams_configuration::DwgStreamsConfiguration;

/// Size in bytes of the fixed top-level header (signature + three longs).
pub const FIXED_HEADER_SIZE: usize = 28;

const SIGNATURE_SIZE: usize = 16;

/// Byte offset the top-level `total_size_in_bits` is measured from.
///
/// Four bytes before the data stream start; the two must not be unified.
const TOTAL_SIZE_ANCHOR: u64 = 24;

/// Continuation bit of the string stream size field.
const STRING_SIZE_CONTINUATION: u16 = 0x8000;

/// A `[start, end)` span of bit offsets into the shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRegion {
    pub start: u64,
    pub end: u64,
}

impl BitRegion {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len_bits(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The same span expressed relative to `origin`.
    pub fn relative_to(&self, origin: u64) -> BitRegion {
        BitRegion::new(self.start - origin, self.end - origin)
    }
}

/// Where the stream layout of a buffer is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwgStreamSource<'s> {
    /// A top-level container starting with a 16-byte signature.
    TopLevel { signature: &'s [u8; 16] },
    /// One object inside the objects section, starting at `byte_offset`.
    EmbeddedObject { byte_offset: usize },
}

/// Fields of the fixed 28-byte top-level header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopLevelHeader {
    pub size_of_data_area: u32,
    /// Reserved; 0x75 in the files seen so far.
    pub unknown: u32,
    pub total_size_in_bits: u32,
}

/// Size fields in front of an embedded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedObjectHeader {
    pub byte_offset: usize,
    /// MS: object size in bytes, excluding this header.
    pub size_of_object: u64,
    /// MC: handle stream size in bits.
    pub handle_stream_bits: u64,
}

/// The decoded header a partition was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwgStreamHeader {
    TopLevel(TopLevelHeader),
    EmbeddedObject(EmbeddedObjectHeader),
}

/// Offsets derived from a header, before the string stream is located.
struct HeaderLayout {
    header: DwgStreamHeader,
    data_start: u64,
    end_data_position: u64,
    handle_stream_end: u64,
}

struct StringStreamBounds {
    present: bool,
    start: u64,
    end: u64,
}

/// Splits a DWG buffer into its data, string and handle streams.
///
/// All offsets are computed once on construction; the partitioner is
/// immutable afterwards and every stream accessor returns a fresh,
/// independent [`DwgBitReader`] bounded to its stream.
#[derive(Debug, Clone)]
pub struct DwgStreamPartitioner<'a> {
    buffer: &'a [u8],
    header: DwgStreamHeader,
    has_string_stream: bool,
    data_start: u64,
    string_start: u64,
    string_end: u64,
    end_data_position: u64,
    handle_stream_end: u64,
}

impl<'a> DwgStreamPartitioner<'a> {
    /// Partition `buffer` using the default configuration.
    pub fn new(buffer: &'a [u8], source: DwgStreamSource<'_>) -> Result<Self> {
        Self::with_configuration(buffer, source, &DwgStreamsConfiguration::default())
    }

    pub fn with_configuration(
        buffer: &'a [u8],
        source: DwgStreamSource<'_>,
        configuration: &DwgStreamsConfiguration,
    ) -> Result<Self> {
        let layout = match source {
            DwgStreamSource::TopLevel { signature } => {
                Self::read_top_level_header(buffer, signature)?
            }
            DwgStreamSource::EmbeddedObject { byte_offset } => {
                Self::read_embedded_object_header(buffer, byte_offset)?
            }
        };

        let strings =
            Self::identify_string_stream(buffer, layout.data_start, layout.end_data_position)?;

        if !strings.present && matches!(source, DwgStreamSource::TopLevel { .. }) {
            warn!(
                "top-level buffer has no string stream flag at bit {}",
                layout.end_data_position - 1
            );
            if configuration.require_string_stream {
                return Err(DwgError::CorruptStringRegion(format!(
                    "string stream flag at bit {} is clear",
                    layout.end_data_position - 1
                )));
            }
        }

        debug!(
            "dwg streams: data [{}, {}) string [{}, {}) handles [{}, {})",
            layout.data_start,
            strings.start,
            strings.start,
            strings.end,
            layout.end_data_position,
            layout.handle_stream_end
        );

        Ok(Self {
            buffer,
            header: layout.header,
            has_string_stream: strings.present,
            data_start: layout.data_start,
            string_start: strings.start,
            string_end: strings.end,
            end_data_position: layout.end_data_position,
            handle_stream_end: layout.handle_stream_end,
        })
    }

    /// Partition a top-level container whose first 16 bytes must equal `signature`.
    pub fn from_top_level(buffer: &'a [u8], signature: &[u8; 16]) -> Result<Self> {
        Self::new(buffer, DwgStreamSource::TopLevel { signature })
    }

    /// Partition the object whose header starts at `byte_offset`.
    ///
    /// Embedded objects carry no signature.
    pub fn from_embedded_object(buffer: &'a [u8], byte_offset: usize) -> Result<Self> {
        Self::new(buffer, DwgStreamSource::EmbeddedObject { byte_offset })
    }

    fn read_top_level_header(buffer: &[u8], signature: &[u8; 16]) -> Result<HeaderLayout> {
        let actual = buffer.get(..SIGNATURE_SIZE).unwrap_or(buffer);
        if actual != &signature[..] {
            return Err(DwgError::BadSignature {
                expected: *signature,
                actual: actual.to_vec(),
            });
        }

        if buffer.len() < FIXED_HEADER_SIZE {
            return Err(DwgError::CorruptHeader(format!(
                "buffer of {} bytes is shorter than the {FIXED_HEADER_SIZE}-byte header",
                buffer.len()
            )));
        }

        let mut cursor = Cursor::new(&buffer[SIGNATURE_SIZE..FIXED_HEADER_SIZE]);
        let header = TopLevelHeader {
            size_of_data_area: cursor.read_u32::<LittleEndian>()?,
            unknown: cursor.read_u32::<LittleEndian>()?,
            total_size_in_bits: cursor.read_u32::<LittleEndian>()?,
        };

        let data_start = FIXED_HEADER_SIZE as u64 * 8;
        let end_data_position = TOTAL_SIZE_ANCHOR * 8 + u64::from(header.total_size_in_bits);
        let handle_stream_end = buffer.len() as u64 * 8;

        Self::check_layout(buffer, data_start, end_data_position, handle_stream_end)?;

        Ok(HeaderLayout {
            header: DwgStreamHeader::TopLevel(header),
            data_start,
            end_data_position,
            handle_stream_end,
        })
    }

    fn read_embedded_object_header(buffer: &[u8], byte_offset: usize) -> Result<HeaderLayout> {
        let buffer_bits = buffer.len() as u64 * 8;
        if byte_offset >= buffer.len() {
            return Err(DwgError::CorruptHeader(format!(
                "object offset {byte_offset} is outside the {}-byte buffer",
                buffer.len()
            )));
        }

        let truncated = |err: DwgError| {
            DwgError::CorruptHeader(format!("object header at byte {byte_offset}: {err}"))
        };

        let mut reader = DwgBitReader::from_validated(buffer, byte_offset as u64 * 8, buffer_bits);
        let size_of_object = reader.read_modular_short().map_err(truncated)?;
        let handle_stream_bits = reader.read_modular_char().map_err(truncated)?;

        let data_start = reader.position_in_bits();

        let object_data_bits = size_of_object
            .checked_mul(8)
            .and_then(|bits| bits.checked_sub(handle_stream_bits))
            .ok_or_else(|| {
                DwgError::CorruptHeader(format!(
                    "handle stream of {handle_stream_bits} bits exceeds object of {size_of_object} bytes"
                ))
            })?;

        let overflow = || DwgError::CorruptHeader("object size overflows".to_string());
        let end_data_position = data_start.checked_add(object_data_bits).ok_or_else(overflow)?;
        let handle_stream_end = end_data_position
            .checked_add(handle_stream_bits)
            .ok_or_else(overflow)?;

        Self::check_layout(buffer, data_start, end_data_position, handle_stream_end)?;

        Ok(HeaderLayout {
            header: DwgStreamHeader::EmbeddedObject(EmbeddedObjectHeader {
                byte_offset,
                size_of_object,
                handle_stream_bits,
            }),
            data_start,
            end_data_position,
            handle_stream_end,
        })
    }

    fn check_layout(
        buffer: &[u8],
        data_start: u64,
        end_data_position: u64,
        handle_stream_end: u64,
    ) -> Result<()> {
        let buffer_bits = buffer.len() as u64 * 8;
        if data_start > end_data_position {
            return Err(DwgError::CorruptHeader(format!(
                "data stream starts at bit {data_start} after its end at bit {end_data_position}"
            )));
        }
        if end_data_position > handle_stream_end {
            return Err(DwgError::CorruptHeader(format!(
                "data stream end at bit {end_data_position} is past the handle stream end at bit {handle_stream_end}"
            )));
        }
        if handle_stream_end > buffer_bits {
            return Err(DwgError::CorruptHeader(format!(
                "streams end at bit {handle_stream_end}, past the buffer end at bit {buffer_bits}"
            )));
        }
        Ok(())
    }

    /// Walk backwards from `end_data_position` to find the string stream.
    ///
    /// The flag bit is always consumed, so without a string stream the empty
    /// span sits at `end_data_position - 1`, not at `end_data_position`.
    fn identify_string_stream(
        buffer: &[u8],
        data_start: u64,
        end_data_position: u64,
    ) -> Result<StringStreamBounds> {
        if end_data_position == data_start {
            return Err(DwgError::CorruptStringRegion(format!(
                "no room for the string stream flag before bit {end_data_position}"
            )));
        }

        let mut reader = DwgBitReader::from_validated(buffer, data_start, end_data_position);

        let mut position = end_data_position - 1;
        reader.set_position_in_bits(position)?;
        let present = reader.read_bit()?;

        let mut size: u64 = 0;
        if present {
            position = Self::step_back(position, 16, data_start)?;
            reader.set_position_in_bits(position)?;
            let low = reader.read_reversed_short()?;
            size = u64::from(low);

            if (low & STRING_SIZE_CONTINUATION) != 0 {
                position = Self::step_back(position, 16, data_start)?;
                reader.set_position_in_bits(position)?;
                let high = reader.read_reversed_short()?;
                size = u64::from(low & !STRING_SIZE_CONTINUATION) | (u64::from(high) << 15);
            }
        }
        trace!("string stream flag={present} size={size} ends at bit {position}");

        let start = position
            .checked_sub(size)
            .filter(|start| *start >= data_start)
            .ok_or_else(|| {
                DwgError::CorruptStringRegion(format!(
                    "string stream of {size} bits ending at bit {position} starts before the data stream at bit {data_start}"
                ))
            })?;

        Ok(StringStreamBounds {
            present,
            start,
            end: position,
        })
    }

    fn step_back(position: u64, bits: u64, data_start: u64) -> Result<u64> {
        position
            .checked_sub(bits)
            .filter(|p| *p >= data_start)
            .ok_or_else(|| {
                DwgError::CorruptStringRegion(format!(
                    "string stream size field before bit {position} overlaps the header"
                ))
            })
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    pub fn header(&self) -> &DwgStreamHeader {
        &self.header
    }

    /// Value of the "has string stream" flag bit.
    pub fn has_string_stream(&self) -> bool {
        self.has_string_stream
    }

    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    pub fn string_start(&self) -> u64 {
        self.string_start
    }

    pub fn string_end(&self) -> u64 {
        self.string_end
    }

    /// End of the data+string span, which is also where the handle stream starts.
    pub fn end_data_position(&self) -> u64 {
        self.end_data_position
    }

    pub fn handle_stream_end(&self) -> u64 {
        self.handle_stream_end
    }

    pub fn data_region(&self) -> BitRegion {
        BitRegion::new(self.data_start, self.string_start)
    }

    pub fn string_region(&self) -> BitRegion {
        BitRegion::new(self.string_start, self.string_end)
    }

    pub fn handle_region(&self) -> BitRegion {
        BitRegion::new(self.end_data_position, self.handle_stream_end)
    }

    /// Reader over `[data_start, string_start)`.
    pub fn data_stream(&self) -> DwgBitReader<'a> {
        self.reader_for(self.data_region())
    }

    /// Reader over `[string_start, string_end)`.
    pub fn string_stream(&self) -> DwgBitReader<'a> {
        self.reader_for(self.string_region())
    }

    /// Reader over `[end_data_position, handle_stream_end)`.
    pub fn handle_stream(&self) -> DwgBitReader<'a> {
        self.reader_for(self.handle_region())
    }

    /// One reader serving data, text and handle reads from their own streams.
    pub fn merged_reader(&self) -> DwgMergedReader<'a> {
        DwgMergedReader::new(self.data_stream(), self.string_stream(), self.handle_stream())
    }

    fn reader_for(&self, region: BitRegion) -> DwgBitReader<'a> {
        DwgBitReader::from_validated(self.buffer, region.start, region.end)
    }
}
