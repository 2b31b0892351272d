// Theora header support (in OGG container)
//
// A Theora bitstream opens with three header packets, each starting with the
// same 7-byte prefix: a header type byte with the top bit set followed by the
// ASCII signature "theora".
//
// Theora Header Structure:
// - 0x80 Identification header: frame geometry, frame rate, pixel format
// - 0x81 Comment header: vendor string and KEY=value user comments
// - 0x82 Setup header: loop filter limits, quantization parameters,
//   80 Huffman token tables
//
// Reference:
// - Theora Specification, Xiph.Org Foundation (version 3.2.x)

pub mod comment;
pub mod identification;
pub mod setup;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ogg::{Bitstream, Packet};
use crate::utils::bits::BitReader;

pub use comment::{decode_comment, CommentHeader};
pub use identification::{decode_identification, ColorSpace, IdentificationHeader, PixelFormat, Version};
pub use setup::{decode_setup, HuffmanCode, HuffmanTree, QuantRange, SetupHeader};

/// ASCII "theora" as read through three big-endian 16-bit words.
const THEORA_MAGIC: [u16; 3] = [0x7468, 0x656F, 0x7261];

/// Header type byte plus the 6-byte signature.
pub const COMMON_HEADER_SIZE: usize = 7;

/// Only header packets have the top bit of the type byte set.
const HEADER_PACKET_FLAG: u8 = 0x80;

/// Type byte of a Theora header packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderType {
    Identification,
    Comment,
    Setup,
    /// A header packet type the pinned version does not define.
    Reserved(u8),
}

impl HeaderType {
    /// `None` when the top bit is clear, i.e. a data packet.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte & HEADER_PACKET_FLAG == 0 {
            return None;
        }
        Some(match byte {
            0x80 => HeaderType::Identification,
            0x81 => HeaderType::Comment,
            0x82 => HeaderType::Setup,
            other => HeaderType::Reserved(other),
        })
    }

    pub fn to_byte(self) -> u8 {
        match self {
            HeaderType::Identification => 0x80,
            HeaderType::Comment => 0x81,
            HeaderType::Setup => 0x82,
            HeaderType::Reserved(byte) => byte,
        }
    }
}

pub(crate) fn read_common_header(reader: &BitReader<'_>) -> Result<HeaderType> {
    let not_a_header = |reason: String| Error::HeaderTypeMismatch(reason);

    let header_type = reader
        .read_u8(0)
        .map_err(|_| not_a_header("empty packet".to_string()))?;
    for (i, &expected) in THEORA_MAGIC.iter().enumerate() {
        let word = reader
            .read_u16(1 + 2 * i)
            .map_err(|_| not_a_header(format!("packet of {} bytes is too short", reader.len())))?;
        if word != expected {
            return Err(not_a_header("missing \"theora\" signature".to_string()));
        }
    }

    HeaderType::from_byte(header_type)
        .ok_or_else(|| not_a_header(format!("type byte {:#04x} is not a header packet", header_type)))
}

pub(crate) fn expect_header(reader: &BitReader<'_>, expected: HeaderType) -> Result<()> {
    let found = read_common_header(reader)?;
    if found != expected {
        return Err(Error::HeaderTypeMismatch(format!(
            "expected {:?} header, found {:?}",
            expected, found
        )));
    }
    Ok(())
}

/// Report a read past the end of a header packet as truncated input.
///
/// Offsets are bytes within the reassembled packet.
pub(crate) fn truncated(err: Error) -> Error {
    match err {
        Error::OutOfRange {
            bit_offset,
            width,
            len_bits,
        } => {
            let offset = bit_offset / 8;
            let end = bit_offset.saturating_add(width as usize).div_ceil(8);
            Error::TruncatedInput {
                offset,
                needed: end - offset,
                available: (len_bits / 8).saturating_sub(offset),
            }
        }
        other => other,
    }
}

/// Resolve the common header prefix of `packet`.
pub fn decode_common_header(packet: &Packet<'_>) -> Result<HeaderType> {
    read_common_header(&packet.reader())
}

/// True when the first packet of `bitstream` carries a Theora header prefix.
pub fn is_theora_bitstream(bitstream: &Bitstream<'_>) -> bool {
    bitstream
        .first_packet()
        .map_or(false, |packet| decode_common_header(packet).is_ok())
}

/// The three Theora headers, each absent when missing or malformed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TheoraHeaders {
    pub identification: Option<IdentificationHeader>,
    pub comments: Option<CommentHeader>,
    pub setup: Option<SetupHeader>,
}

fn decode_slot<T>(
    bitstream: &Bitstream<'_>,
    index: usize,
    name: &'static str,
    decode: impl Fn(&Packet<'_>) -> Result<T>,
) -> Option<T> {
    let serial = bitstream.serial_number;
    let packet = match bitstream.packets.get(index) {
        Some(packet) => packet,
        None => {
            debug!(serial, header = name, "header packet not present");
            return None;
        }
    };
    match decode(packet) {
        Ok(header) => Some(header),
        Err(err) => {
            warn!(serial, header = name, error = %err, "failed to decode theora header");
            None
        }
    }
}

/// Decode packets 0, 1 and 2 of `bitstream` independently.
///
/// A malformed header only empties its own slot.
pub fn decode_headers(bitstream: &Bitstream<'_>) -> TheoraHeaders {
    TheoraHeaders {
        identification: decode_slot(bitstream, 0, "identification", decode_identification),
        comments: decode_slot(bitstream, 1, "comment", decode_comment),
        setup: decode_slot(bitstream, 2, "setup", decode_setup),
    }
}

#[cfg(test)]
pub(crate) fn packet(bytes: &[u8]) -> Packet<'_> {
    use crate::ogg::{Fragment, GranulePosition};

    Packet {
        granule_position: GranulePosition::default(),
        fragments: vec![Fragment {
            offset: 0,
            data: bytes,
            terminated: true,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_header_types() {
        assert_eq!(
            decode_common_header(&packet(b"\x80theora")).unwrap(),
            HeaderType::Identification
        );
        assert_eq!(
            decode_common_header(&packet(b"\x82theora\x00")).unwrap(),
            HeaderType::Setup
        );
        assert_eq!(
            decode_common_header(&packet(b"\x9Ftheora")).unwrap(),
            HeaderType::Reserved(0x9F)
        );
    }

    #[test]
    fn test_common_header_rejects() {
        // Data packet: top bit clear
        assert!(matches!(
            decode_common_header(&packet(b"\x01theora")),
            Err(Error::HeaderTypeMismatch(_))
        ));
        assert!(matches!(
            decode_common_header(&packet(b"\x80vorbis")),
            Err(Error::HeaderTypeMismatch(_))
        ));
        assert!(matches!(
            decode_common_header(&packet(b"\x80theo")),
            Err(Error::HeaderTypeMismatch(_))
        ));
        assert!(matches!(
            decode_common_header(&packet(b"")),
            Err(Error::HeaderTypeMismatch(_))
        ));
    }

    #[test]
    fn test_expect_header() {
        let bytes = b"\x81theora";
        let reader = BitReader::new(bytes);
        assert!(expect_header(&reader, HeaderType::Comment).is_ok());
        assert!(matches!(
            expect_header(&reader, HeaderType::Setup),
            Err(Error::HeaderTypeMismatch(_))
        ));
    }

    #[test]
    fn test_header_type_bytes() {
        for byte in 0x80..=0xFFu8 {
            assert_eq!(HeaderType::from_byte(byte).unwrap().to_byte(), byte);
        }
        assert_eq!(HeaderType::from_byte(0x7F), None);
    }

    #[test]
    fn test_truncated_maps_range_errors() {
        let reader = BitReader::new(&[0u8; 4]);
        let err = reader.read_bits(26, 16).unwrap_err();
        assert_eq!(
            truncated(err),
            Error::TruncatedInput {
                offset: 3,
                needed: 3,
                available: 1
            }
        );

        let other = Error::HeaderTypeMismatch("x".to_string());
        assert_eq!(truncated(other.clone()), other);
    }
}
