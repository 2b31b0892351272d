// Logical bitstream demultiplexing
//
// Pages are grouped by serial number. Each bitstream keeps its own list of
// pending fragments; a fragment closed by a lacing value below 255 completes
// a packet, which then takes the granule position of the page it ended on.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::ogg::page::{Fragment, GranulePosition, OggPage};
use crate::utils::bits::BitReader;

/// A logical packet, addressed as the fragments it was cut from.
#[derive(Debug, Clone, Serialize)]
pub struct Packet<'a> {
    /// Granule position of the page holding the final fragment.
    pub granule_position: GranulePosition,
    pub fragments: Vec<Fragment<'a>>,
}

impl<'a> Packet<'a> {
    /// Packet length in bytes.
    pub fn len(&self) -> usize {
        self.fragments.iter().map(Fragment::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute `(offset, length)` spans of the packet in the source buffer.
    pub fn spans(&self) -> Vec<(usize, usize)> {
        self.fragments.iter().map(|f| (f.offset, f.len())).collect()
    }

    /// Reader over the fragments as one contiguous region.
    pub fn reader(&self) -> BitReader<'a> {
        BitReader::from_regions(self.fragments.iter().map(|f| f.data).collect())
    }

    /// Copy the payload into one buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        self.fragments
            .iter()
            .flat_map(|f| f.data.iter().copied())
            .collect()
    }
}

/// Pages and packets sharing one serial number.
#[derive(Debug, Clone, Serialize)]
pub struct Bitstream<'a> {
    pub serial_number: u32,
    pub pages: Vec<OggPage<'a>>,
    pub packets: Vec<Packet<'a>>,
}

impl<'a> Bitstream<'a> {
    fn new(serial_number: u32) -> Self {
        Bitstream {
            serial_number,
            pages: Vec::new(),
            packets: Vec::new(),
        }
    }

    /// The first packet, if one completed.
    pub fn first_packet(&self) -> Option<&Packet<'a>> {
        self.packets.first()
    }
}

/// Group `pages` into logical bitstreams keyed by serial number.
pub fn demux<'a>(pages: &[OggPage<'a>]) -> BTreeMap<u32, Bitstream<'a>> {
    let mut bitstreams: BTreeMap<u32, Bitstream<'a>> = BTreeMap::new();
    let mut pending: HashMap<u32, Vec<Fragment<'a>>> = HashMap::new();

    for page in pages {
        let serial = page.serial_number();
        let bitstream = bitstreams.entry(serial).or_insert_with(|| {
            if !page.header.flags.beginning_of_stream {
                debug!(serial, offset = page.offset, "bitstream starts without a BOS page");
            }
            Bitstream::new(serial)
        });

        if let Some(previous) = bitstream.pages.last() {
            let expected = previous.header.page_sequence.wrapping_add(1);
            if page.header.page_sequence != expected {
                warn!(
                    serial,
                    expected,
                    found = page.header.page_sequence,
                    offset = page.offset,
                    "page sequence gap"
                );
            }
        }

        let fragments = pending.entry(serial).or_default();
        if page.header.flags.continued == fragments.is_empty() {
            warn!(
                serial,
                offset = page.offset,
                continued = page.header.flags.continued,
                pending = fragments.len(),
                "continuation flag disagrees with pending packet data"
            );
        }

        for fragment in &page.fragments {
            fragments.push(*fragment);
            if fragment.terminated {
                bitstream.packets.push(Packet {
                    granule_position: page.granule_position(),
                    fragments: std::mem::take(fragments),
                });
            }
        }

        bitstream.pages.push(page.clone());
    }

    for (serial, fragments) in pending {
        if !fragments.is_empty() {
            debug!(serial, fragments = fragments.len(), "dropping unterminated packet at end of input");
        }
    }

    bitstreams
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::page::{OggPageHeader, PageFlags};

    fn page<'a>(
        serial: u32,
        sequence: u32,
        granule: u8,
        continued: bool,
        fragments: Vec<Fragment<'a>>,
    ) -> OggPage<'a> {
        OggPage {
            offset: 0,
            header: OggPageHeader {
                flags: PageFlags {
                    continued,
                    ..PageFlags::default()
                },
                granule_position: GranulePosition([granule; 8]),
                serial_number: serial,
                page_sequence: sequence,
                checksum: 0,
                segment_table: &[],
            },
            fragments,
            size: 0,
        }
    }

    fn fragment(offset: usize, data: &[u8], terminated: bool) -> Fragment<'_> {
        Fragment {
            offset,
            data,
            terminated,
        }
    }

    #[test]
    fn test_reassembles_across_pages() {
        let a = [1u8, 2, 3];
        let b = [4u8, 5];
        let c = [6u8];
        let pages = vec![
            page(1, 0, 10, false, vec![fragment(0, &a, false)]),
            page(1, 1, 20, true, vec![fragment(100, &b, false)]),
            page(1, 2, 30, true, vec![fragment(200, &c, true)]),
        ];

        let streams = demux(&pages);
        let stream = &streams[&1];
        assert_eq!(stream.pages.len(), 3);
        assert_eq!(stream.packets.len(), 1);

        let packet = &stream.packets[0];
        assert_eq!(packet.granule_position, GranulePosition([30; 8]));
        assert_eq!(packet.spans(), vec![(0, 3), (100, 2), (200, 1)]);
        assert_eq!(packet.len(), 6);
        assert_eq!(packet.reader().read_bytes(0, 6).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_pending_fragments_are_per_bitstream() {
        let a = [1u8; 4];
        let b = [2u8; 4];
        let c = [3u8; 4];
        let d = [4u8; 4];
        let pages = vec![
            page(1, 0, 1, false, vec![fragment(0, &a, false)]),
            page(2, 0, 2, false, vec![fragment(10, &b, true)]),
            page(2, 1, 3, false, vec![fragment(20, &c, true)]),
            page(1, 1, 4, true, vec![fragment(30, &d, true)]),
        ];

        let streams = demux(&pages);
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[&2].packets.len(), 2);
        assert_eq!(streams[&2].packets[0].to_vec(), vec![2; 4]);

        let first = &streams[&1].packets;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].to_vec(), vec![1, 1, 1, 1, 4, 4, 4, 4]);
        assert_eq!(first[0].granule_position, GranulePosition([4; 8]));
    }

    #[test]
    fn test_packet_order_within_page() {
        let a = [1u8];
        let b = [2u8];
        let c = [3u8];
        let pages = vec![page(
            5,
            0,
            0,
            false,
            vec![fragment(0, &a, true), fragment(1, &b, true), fragment(2, &c, false)],
        )];

        let streams = demux(&pages);
        let packets = &streams[&5].packets;
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].to_vec(), vec![1]);
        assert_eq!(packets[1].to_vec(), vec![2]);
    }
}
