mod common;

use common::{granule, packets_page, page};
use oggscope::ogg::{demux, lacing_values, parse_pages, OGG_HEADER_TYPE_CONTINUATION};
use proptest::prelude::*;

proptest! {
    #[test]
    fn lacing_values_describe_size(size in 0usize..10_000) {
        let table = lacing_values(size);

        prop_assert_eq!(table.len(), size / 255 + 1);
        prop_assert_eq!(table.iter().map(|&v| v as usize).sum::<usize>(), size);
        prop_assert!(table[..table.len() - 1].iter().all(|&v| v == 255));
        prop_assert!(*table.last().unwrap() < 255);
    }

    #[test]
    fn packets_on_one_page_come_back_intact(
        packets in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..700), 1..8)
    ) {
        let slices: Vec<&[u8]> = packets.iter().map(Vec::as_slice).collect();
        let data = packets_page(0, granule(11), 5, 0, &slices);

        let pages = parse_pages(&data).unwrap();
        prop_assert_eq!(pages.len(), 1);
        let bitstreams = demux(&pages);
        let stream = &bitstreams[&5];

        prop_assert_eq!(stream.packets.len(), packets.len());
        for (packet, expected) in stream.packets.iter().zip(&packets) {
            prop_assert_eq!(&packet.to_vec(), expected);
            prop_assert_eq!(packet.granule_position.to_u64(), 11);
        }
    }

    #[test]
    fn packet_split_over_pages_takes_last_granule(
        payload in prop::collection::vec(any::<u8>(), 1..3_000),
        segments_per_page in 1usize..6,
    ) {
        let table = lacing_values(payload.len());
        let mut data = Vec::new();
        let mut consumed = 0;
        let chunks: Vec<&[u8]> = table.chunks(segments_per_page).collect();

        for (i, chunk) in chunks.iter().enumerate() {
            let len: usize = chunk.iter().map(|&v| v as usize).sum();
            let header_type = if i == 0 { 0 } else { OGG_HEADER_TYPE_CONTINUATION };
            data.extend(page(
                header_type,
                granule(i as u64 + 1),
                77,
                i as u32,
                chunk,
                &payload[consumed..consumed + len],
            ));
            consumed += len;
        }

        let pages = parse_pages(&data).unwrap();
        let bitstreams = demux(&pages);
        let stream = &bitstreams[&77];

        prop_assert_eq!(stream.packets.len(), 1);
        let packet = &stream.packets[0];
        prop_assert_eq!(packet.fragments.len(), chunks.len());
        prop_assert_eq!(packet.to_vec(), payload.clone());
        prop_assert_eq!(packet.granule_position.to_u64(), chunks.len() as u64);

        let reader = packet.reader();
        prop_assert_eq!(reader.len(), payload.len());
        let last = payload.len() - 1;
        prop_assert_eq!(reader.read_u8(last).unwrap(), payload[last]);
    }
}
