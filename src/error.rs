//! Errors raised while parsing Ogg pages and Theora headers.
//!
//! Every error is a deterministic function of the input bytes, so none of them
//! is worth retrying without changing the input.

use thiserror::Error;

/// Errors that can occur when inspecting an Ogg/Theora buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The page does not start with the `OggS` capture pattern.
    #[error("bad capture pattern at byte offset {offset}")]
    BadMagic { offset: usize },

    /// Stream structure version or codec version is not the pinned one.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// The buffer ends in the middle of a page or field.
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The segment table cannot describe a page.
    #[error("invalid segment table at byte offset {offset}: {reason}")]
    InvalidSegmentTable { offset: usize, reason: &'static str },

    /// The checksum policy rejected the page.
    #[error("checksum mismatch for page at byte offset {offset} (declared {declared:#010x})")]
    ChecksumMismatch { offset: usize, declared: u32 },

    /// The packet is not the expected Theora header packet.
    #[error("header type mismatch: {0}")]
    HeaderTypeMismatch(String),

    /// A header field failed a semantic validation rule.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// A quantization range walked past index 63.
    #[error("quantization range overflow: running index reached {index}")]
    QuantRangeOverflow { index: u32 },

    /// A Huffman tree grew past 32 leaves or a 32-bit prefix.
    #[error("huffman tree {tree} overflow: {reason}")]
    HuffmanTreeOverflow { tree: usize, reason: &'static str },

    /// A quantization range names a base matrix that does not exist.
    #[error("base matrix index {index} out of range (count {count})")]
    BaseMatrixIndexOutOfRange { index: u32, count: u32 },

    /// A bit read exceeds the addressed region.
    ///
    /// Header decoders report this as [`Error::TruncatedInput`].
    #[error("bit read out of range: {width} bits at bit {bit_offset}, region holds {len_bits} bits")]
    OutOfRange {
        bit_offset: usize,
        width: u32,
        len_bits: usize,
    },
}

impl Error {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
