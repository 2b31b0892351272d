use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ogg::{
    OGG_HEADER_SIZE, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS,
    OGG_MAX_LACING_VALUE, OGG_SIGNATURE, OGG_VERSION,
};

/// Raw granule position bytes, as stored in the page header.
///
/// The meaning is defined by the codec owning the bitstream, so the bytes are
/// kept as they are and only interpreted on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GranulePosition(pub [u8; 8]);

impl GranulePosition {
    /// The raw header bytes.
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// The bytes read as the little-endian 64-bit value the container stores.
    pub fn to_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// All bits set: no packet finishes on the page.
    pub fn is_unset(&self) -> bool {
        self.0 == [0xFF; 8]
    }
}

impl fmt::Display for GranulePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for GranulePosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn serialize_len<S: Serializer>(
    data: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(data.len() as u64)
}

/// Header-type flags of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PageFlags {
    /// The first fragment continues a packet from an earlier page.
    pub continued: bool,
    /// First page of a logical bitstream.
    pub beginning_of_stream: bool,
    /// Last page of a logical bitstream.
    pub end_of_stream: bool,
}

impl PageFlags {
    pub fn from_byte(header_type: u8) -> Self {
        PageFlags {
            continued: header_type & OGG_HEADER_TYPE_CONTINUATION == OGG_HEADER_TYPE_CONTINUATION,
            beginning_of_stream: header_type & OGG_HEADER_TYPE_BOS == OGG_HEADER_TYPE_BOS,
            end_of_stream: header_type & OGG_HEADER_TYPE_EOS == OGG_HEADER_TYPE_EOS,
        }
    }
}

/// OGG Page Header
#[derive(Debug, Clone, Serialize)]
pub struct OggPageHeader<'a> {
    pub flags: PageFlags,
    pub granule_position: GranulePosition,
    pub serial_number: u32,
    pub page_sequence: u32,
    pub checksum: u32,
    pub segment_table: &'a [u8],
}

/// A slice of page payload belonging to one packet.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Fragment<'a> {
    /// Absolute byte offset in the source buffer.
    pub offset: usize,
    #[serde(rename = "length", serialize_with = "serialize_len")]
    pub data: &'a [u8],
    /// Closed by a lacing value below 255, i.e. the packet ends here.
    pub terminated: bool,
}

impl Fragment<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// OGG Page
#[derive(Debug, Clone, Serialize)]
pub struct OggPage<'a> {
    /// Absolute byte offset of the capture pattern.
    pub offset: usize,
    pub header: OggPageHeader<'a>,
    pub fragments: Vec<Fragment<'a>>,
    /// Header, segment table and payload, in bytes.
    pub size: usize,
}

impl<'a> OggPage<'a> {
    /// Size of the fixed header plus the segment table.
    pub fn header_size(&self) -> usize {
        OGG_HEADER_SIZE + self.header.segment_table.len()
    }

    /// Total payload size from the segment table.
    pub fn data_size(&self) -> usize {
        self.fragments.iter().map(Fragment::len).sum()
    }

    pub fn serial_number(&self) -> u32 {
        self.header.serial_number
    }

    pub fn granule_position(&self) -> GranulePosition {
        self.header.granule_position
    }
}

/// Hook deciding whether a page's declared checksum is acceptable.
pub trait ChecksumPolicy {
    /// `page` spans the whole page, header included.
    fn validate(&self, page: &[u8], declared: u32) -> bool;
}

/// Accepts every page without computing a CRC.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustChecksum;

impl ChecksumPolicy for TrustChecksum {
    fn validate(&self, _page: &[u8], _declared: u32) -> bool {
        true
    }
}

fn take(buffer: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buffer.get(offset..end))
        .ok_or(Error::TruncatedInput {
            offset,
            needed: len,
            available: buffer.len().saturating_sub(offset),
        })
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// Split a segment table into fragment sizes and termination flags.
///
/// A trailing run of 255 values leaves an open fragment: only a lacing value
/// below 255 ends a packet.
pub fn fragment_sizes(segment_table: &[u8]) -> Vec<(usize, bool)> {
    let mut sizes = Vec::new();
    let mut running = 0usize;

    for &lacing in segment_table {
        running += lacing as usize;
        if lacing < OGG_MAX_LACING_VALUE {
            sizes.push((running, true));
            running = 0;
        }
    }

    if running > 0 {
        sizes.push((running, false));
    }

    sizes
}

/// Create the segment table for one packet of `size` bytes.
///
/// A size that is a multiple of 255 needs a trailing zero to mark the end.
pub fn lacing_values(size: usize) -> Vec<u8> {
    let mut table = vec![OGG_MAX_LACING_VALUE; size / 255];
    table.push((size % 255) as u8);
    table
}

/// Parse the page starting at `offset`, trusting its checksum.
pub fn parse_page(buffer: &[u8], offset: usize) -> Result<OggPage<'_>> {
    parse_page_with(buffer, offset, &TrustChecksum)
}

/// Parse the page starting at `offset` with an explicit checksum policy.
pub fn parse_page_with<'a>(
    buffer: &'a [u8],
    offset: usize,
    policy: &dyn ChecksumPolicy,
) -> Result<OggPage<'a>> {
    let header = take(buffer, offset, OGG_HEADER_SIZE)?;

    // Check OGG signature
    if &header[0..4] != OGG_SIGNATURE {
        return Err(Error::BadMagic { offset });
    }

    let version = header[4];
    if version != OGG_VERSION {
        return Err(Error::UnsupportedVersion(format!(
            "ogg stream structure version {}",
            version
        )));
    }

    let flags = PageFlags::from_byte(header[5]);
    let mut granule = [0u8; 8];
    granule.copy_from_slice(&header[6..14]);
    let serial_number = le_u32(&header[14..18]);
    let page_sequence = le_u32(&header[18..22]);
    let checksum = le_u32(&header[22..26]);
    let segment_count = header[26] as usize;

    if segment_count == 0 {
        return Err(Error::InvalidSegmentTable {
            offset,
            reason: "page has no segments",
        });
    }

    let segment_table = take(buffer, offset + OGG_HEADER_SIZE, segment_count)?;
    let sizes = fragment_sizes(segment_table);
    let data_size: usize = sizes.iter().map(|&(size, _)| size).sum();
    let header_size = OGG_HEADER_SIZE + segment_count;
    let size = header_size + data_size;

    let span = take(buffer, offset, size)?;
    if !policy.validate(span, checksum) {
        return Err(Error::ChecksumMismatch {
            offset,
            declared: checksum,
        });
    }

    let mut fragments = Vec::with_capacity(sizes.len());
    let mut fragment_offset = offset + header_size;
    for (len, terminated) in sizes {
        fragments.push(Fragment {
            offset: fragment_offset,
            data: &buffer[fragment_offset..fragment_offset + len],
            terminated,
        });
        fragment_offset += len;
    }

    debug!(
        offset,
        size,
        serial = serial_number,
        sequence = page_sequence,
        fragments = fragments.len(),
        "parsed ogg page"
    );

    Ok(OggPage {
        offset,
        header: OggPageHeader {
            flags,
            granule_position: GranulePosition(granule),
            serial_number,
            page_sequence,
            checksum,
            segment_table,
        },
        fragments,
        size,
    })
}

/// Parse every page in `buffer`, trusting checksums.
pub fn parse_pages(buffer: &[u8]) -> Result<Vec<OggPage<'_>>> {
    parse_pages_with(buffer, &TrustChecksum)
}

/// Parse every page in `buffer`; the first malformed page aborts the walk.
pub fn parse_pages_with<'a>(
    buffer: &'a [u8],
    policy: &dyn ChecksumPolicy,
) -> Result<Vec<OggPage<'a>>> {
    let mut pages = Vec::new();
    let mut offset = 0;

    while offset < buffer.len() {
        let page = parse_page_with(buffer, offset, policy)?;
        offset += page.size;
        pages.push(page);
    }

    Ok(pages)
}
