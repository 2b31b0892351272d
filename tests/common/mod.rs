// Shared builders for integration tests: Ogg pages and Theora header packets
#![allow(dead_code)]

use oggscope::ogg::{lacing_values, OGG_SIGNATURE};

/// Assemble one page from an explicit segment table and payload.
pub fn page(
    header_type: u8,
    granule: [u8; 8],
    serial: u32,
    sequence: u32,
    segment_table: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    let expected: usize = segment_table.iter().map(|&v| v as usize).sum();
    assert_eq!(expected, payload.len(), "segment table does not cover payload");

    let mut bytes = Vec::with_capacity(27 + segment_table.len() + payload.len());
    bytes.extend_from_slice(OGG_SIGNATURE);
    bytes.push(0);
    bytes.push(header_type);
    bytes.extend_from_slice(&granule);
    bytes.extend_from_slice(&serial.to_le_bytes());
    bytes.extend_from_slice(&sequence.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.push(segment_table.len() as u8);
    bytes.extend_from_slice(segment_table);
    bytes.extend_from_slice(payload);
    bytes
}

/// Assemble one page carrying whole packets.
pub fn packets_page(
    header_type: u8,
    granule: [u8; 8],
    serial: u32,
    sequence: u32,
    packets: &[&[u8]],
) -> Vec<u8> {
    let mut table = Vec::new();
    let mut payload = Vec::new();
    for packet in packets {
        table.extend(lacing_values(packet.len()));
        payload.extend_from_slice(packet);
    }
    page(header_type, granule, serial, sequence, &table, &payload)
}

/// MSB-first bit writer matching the Theora bit order.
#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u32, width: u32) -> &mut Self {
        for i in (0..width).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            let last = self.bytes.len() - 1;
            self.bytes[last] |= bit << (7 - self.bits % 8);
            self.bits += 1;
        }
        self
    }

    pub fn write_bit(&mut self, bit: bool) -> &mut Self {
        self.write(bit as u32, 1)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &byte in bytes {
            self.write(byte as u32, 8);
        }
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn theora_prefix(header_type: u8) -> Vec<u8> {
    let mut bytes = vec![header_type];
    bytes.extend_from_slice(b"theora");
    bytes
}

/// 42-byte identification header: 320x240 picture in a 20x15 macroblock frame,
/// 30000/1001 fps, 4:2:0, keyframe granule shift 6.
pub fn identification_packet() -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_bytes(&theora_prefix(0x80));
    writer
        .write(3, 8)
        .write(2, 8)
        .write(1, 8)
        .write(20, 16)
        .write(15, 16)
        .write(320, 24)
        .write(240, 24)
        .write(0, 8)
        .write(0, 8)
        .write(30000, 32)
        .write(1001, 32)
        .write(1, 24)
        .write(1, 24)
        .write(2, 8)
        .write(500_000, 24)
        .write(48, 6)
        .write(6, 5)
        .write(0, 2)
        .write(0, 3);
    writer.into_bytes()
}

/// Comment header with a vendor string and KEY=value entries.
pub fn comment_packet(vendor: &str, comments: &[&str]) -> Vec<u8> {
    let mut bytes = theora_prefix(0x81);
    bytes.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    bytes.extend_from_slice(vendor.as_bytes());
    bytes.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in comments {
        bytes.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        bytes.extend_from_slice(comment.as_bytes());
    }
    bytes
}

/// Setup header exercising fresh, copied and previous-type quantization
/// ranges, followed by 80 single-leaf Huffman trees (tree `i` holds token
/// `i % 32`).
///
/// Ranges: (0,0) fresh `[63]` over matrices `[0, 1]`; (0,1) and (0,2) copy
/// their predecessor; (1,0) fresh `[32, 31]` over `[2, 0, 1]`; (1,1) copies
/// (0,1); (1,2) copies (1,1).
pub fn setup_packet() -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_bytes(&theora_prefix(0x82));

    // Loop filter limits: 3-bit values
    writer.write(3, 3);
    for qi in 0..64 {
        writer.write(qi % 8, 3);
    }
    // AC then DC scale: 10-bit values
    for scale in [10u32, 3] {
        writer.write(9, 4);
        for qi in 0..64 {
            writer.write(qi * scale, 10);
        }
    }
    // Three base matrices
    writer.write(2, 9);
    for matrix in 0..3u32 {
        for ci in 0..64u32 {
            writer.write((matrix * 64 + ci) % 256, 8);
        }
    }

    // Matrix indices take ilog(2) = 2 bits
    // (0,0): fresh
    writer.write(0, 2).write(62, 6).write(1, 2);
    // (0,1), (0,2): no new range
    writer.write_bit(false);
    writer.write_bit(false);
    // (1,0): fresh, sizes 32 then 31
    writer.write_bit(true);
    writer.write(2, 2).write(31, 6).write(0, 2).write(30, 5).write(1, 2);
    // (1,1): copy previous type
    writer.write_bit(false).write_bit(true);
    // (1,2): copy previous plane
    writer.write_bit(false).write_bit(false);

    for tree in 0..80u32 {
        writer.write_bit(true).write(tree % 32, 5);
    }
    writer.into_bytes()
}

/// Granule position bytes for a little-endian 64-bit value.
pub fn granule(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}
