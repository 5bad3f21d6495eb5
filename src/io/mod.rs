//! I/O module for DWG binary containers.

pub mod dwg;
