//! DWG bit stream support.

pub mod dwg_bit_streams;
pub mod dwg_stream_readers;
pub mod dwg_streams_configuration;

pub use dwg_bit_streams::{
    BitRegion, DwgStreamHeader, DwgStreamPartitioner, DwgStreamSource, EmbeddedObjectHeader,
    TopLevelHeader, FIXED_HEADER_SIZE,
};
pub use dwg_stream_readers::{DwgBitReader, DwgMergedReader, DwgReferenceType, DwgStreamReader};
pub use dwg_streams_configuration::DwgStreamsConfiguration;
