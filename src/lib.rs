//! Locates the logical bit streams of DWG containers.
//!
//! A DWG object (or an R2007+ section buffer) packs three streams into one
//! buffer at bit granularity: the main data stream, the string stream and
//! the handle stream. The string stream size is stored as a trailer right
//! before the handle stream, so its bounds are found by scanning backwards.
//!
//! ```rust
//! use dwg_bitstreams::{DwgStreamPartitioner, DwgStreamReader};
//!
//! // MS object size = 2 bytes, MC handle stream size = 0 bits,
//! // then one data byte and a cleared string flag as its last bit.
//! let buffer = [0x02, 0x00, 0x00, 0b1010_1010, 0b0000_0000];
//! let streams = DwgStreamPartitioner::from_embedded_object(&buffer, 0).unwrap();
//!
//! assert!(!streams.has_string_stream());
//! let mut data = streams.data_stream();
//! assert_eq!(data.read_byte().unwrap(), 0b1010_1010);
//! ```

pub mod error;
pub mod io;

pub use error::{DwgError, Result};
pub use io::dwg::{
    BitRegion, DwgBitReader, DwgMergedReader, DwgReferenceType, DwgStreamHeader,
    DwgStreamPartitioner, DwgStreamReader, DwgStreamSource, DwgStreamsConfiguration,
    EmbeddedObjectHeader, TopLevelHeader,
};
