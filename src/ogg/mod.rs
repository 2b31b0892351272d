// OGG container support
//
// OGG File Structure:
// - OGG Page Header (27 bytes)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
//   - Segment Table (variable)
// - Page payload: the segment table's lacing values summed
//
// Pages carrying the same serial number form one logical bitstream. Packets
// are cut out of the payload by the lacing values and may continue across
// pages.

pub mod bitstream;
pub mod page;

pub use bitstream::{demux, Bitstream, Packet};
pub use page::{
    lacing_values, parse_page, parse_page_with, parse_pages, parse_pages_with, ChecksumPolicy,
    Fragment, GranulePosition, OggPage, OggPageHeader, PageFlags, TrustChecksum,
};

// OGG signature
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

/// Only stream structure version 0 exists.
pub const OGG_VERSION: u8 = 0;

/// Fixed header bytes before the segment table.
pub const OGG_HEADER_SIZE: usize = 27;

/// A lacing value of 255 means the fragment continues.
pub const OGG_MAX_LACING_VALUE: u8 = 255;

// OGG page header types
pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02; // Beginning of Stream
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04; // End of Stream
