//! Readout persistence.
//!
//! - [`raw_writer`]: raw readout bytes to a file
//! - [`sidecar`]: fixed-precision metadata text files
//! - [`sink`]: [`FileSampleSink`], the file-backed `SampleSink`

pub mod raw_writer;
pub mod sidecar;
pub mod sink;

pub use raw_writer::write_raw;
pub use sidecar::{read_metadata, write_metadata, SampleMetadata};
pub use sink::{FileSampleSink, WrittenSample};
