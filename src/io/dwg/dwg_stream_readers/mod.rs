//! Bit-level readers for DWG object streams.

pub mod dwg_bit_reader;
pub mod dwg_merged_reader;
pub mod idwg_stream_reader;

pub use dwg_bit_reader::DwgBitReader;
pub use dwg_merged_reader::DwgMergedReader;
pub use idwg_stream_reader::{DwgReferenceType, DwgStreamReader};
