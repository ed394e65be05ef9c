//! Decoding and parsing of song metadata files.
//!
//! A metadata file is newline-delimited text, optionally gzip-compressed,
//! made of `key:value` lines grouped into records by `-` lines.

mod decode;
mod records;

pub use decode::{media_name, read_source_file, SourceEncoding};
pub use records::{RawRecord, RecordReader, RECORD_DELIMITER};
