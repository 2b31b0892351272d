// Theora comment header (packet 1)
//
// The body after the common prefix uses the Vorbis comment layout:
// a little-endian length-prefixed vendor string, a little-endian comment
// count, then that many length-prefixed "FIELD=value" strings.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ogg::Packet;
use crate::theora::{expect_header, HeaderType, COMMON_HEADER_SIZE};
use crate::utils::bits::BitReader;
use crate::utils::encoding::decode_utf8;

/// Vorbis-style comment block of a Theora stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentHeader {
    pub vendor: String,
    pub comments: Vec<(String, String)>,
}

impl CommentHeader {
    /// Get a comment value by field name
    pub fn get(&self, field: &str) -> Option<&String> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.vendor.is_empty() && self.comments.is_empty()
    }
}

fn read_le_u32(reader: &BitReader<'_>, offset: usize) -> Result<u32> {
    Ok(reader.read_u32(offset)?.swap_bytes())
}

fn read_string(reader: &BitReader<'_>, offset: &mut usize) -> Result<String> {
    let length = read_le_u32(reader, *offset)? as usize;
    *offset += 4;
    let bytes = reader.read_bytes(*offset, length)?;
    *offset += length;
    Ok(decode_utf8(&bytes))
}

fn read_body(reader: &BitReader<'_>, header: &mut CommentHeader) -> Result<()> {
    let mut offset = COMMON_HEADER_SIZE;
    header.vendor = read_string(reader, &mut offset)?;

    let comment_count = read_le_u32(reader, offset)? as usize;
    offset += 4;
    // Every comment needs at least its 4-byte length
    if comment_count > (reader.len() - offset) / 4 {
        return Err(Error::invalid_field(
            "comment count",
            format!("{} comments cannot fit in {} bytes", comment_count, reader.len() - offset),
        ));
    }

    for _ in 0..comment_count {
        let comment = read_string(reader, &mut offset)?;

        // Parse comment (format: FIELD=value)
        if let Some((field, value)) = comment.split_once('=') {
            header.comments.push((field.to_string(), value.to_string()));
        }
    }

    Ok(())
}

/// Decode the comment header from packet 1.
///
/// Only the common prefix decides whether the header is valid. The body is
/// read as a Vorbis comment list on a best-effort basis: whatever parsed
/// before a malformed field is kept, so a packet holding only the prefix or
/// an unrecognized body yields a record with empty content.
pub fn decode_comment(packet: &Packet<'_>) -> Result<CommentHeader> {
    let reader = packet.reader();
    expect_header(&reader, HeaderType::Comment)?;

    let mut header = CommentHeader::default();
    if reader.len() > COMMON_HEADER_SIZE {
        if let Err(err) = read_body(&reader, &mut header) {
            debug!(
                error = %err,
                comments = header.comments.len(),
                "comment body is not a complete vorbis comment list"
            );
        }
    }

    Ok(header)
}
