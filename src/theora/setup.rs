// Theora setup header (packet 2)
//
// The setup header is one continuous bit walk starting right after the
// common prefix:
// 1. loop filter limit table (64 entries, 3-bit width field)
// 2. AC and DC scale tables (64 entries each, own 4-bit width fields)
// 3. base quantization matrices (9-bit count, 64 bytes each)
// 4. quantization ranges for 2 quantization types x 3 color planes,
//    either decoded fresh or shared with an earlier (type, plane) pair
// 5. 80 Huffman token tables, each a pre-order walk of a binary tree

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ogg::Packet;
use crate::theora::{expect_header, truncated, HeaderType, COMMON_HEADER_SIZE};
use crate::utils::bits::{ilog, BitCursor, BitReader};

/// Entries in the loop filter limit and scale tables.
pub const QUANT_INDEX_COUNT: usize = 64;

/// Coefficients per base matrix.
pub const MATRIX_COEFFICIENTS: usize = 64;

/// Upper bound on base matrices.
///
/// The 9-bit count field could describe 512, but the Theora format rejects
/// more than 384: one matrix per quantization index for each of the six
/// (type, plane) pairs.
pub const MAX_BASE_MATRICES: u32 = 384;

/// Intra and inter.
pub const QUANT_TYPES: usize = 2;

/// Y, Cb, Cr.
pub const COLOR_PLANES: usize = 3;

pub const HUFFMAN_TABLE_COUNT: usize = 80;
pub const MAX_HUFFMAN_TOKENS: usize = 32;
pub const MAX_HUFFMAN_CODE_LENGTH: u32 = 32;

/// Highest quantization index; every fresh range must end exactly here.
const LAST_QUANT_INDEX: u32 = 63;

/// Quantization ranges of one (type, plane) pair.
///
/// `base_matrix_indices` has one more entry than `sizes`: range `i` spans
/// `sizes[i]` indices, interpolating between matrices `i` and `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantRange {
    pub sizes: Vec<u8>,
    pub base_matrix_indices: Vec<u16>,
}

impl QuantRange {
    /// Number of ranges.
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Sum of range sizes; 63 for every valid range.
    pub fn span(&self) -> u32 {
        self.sizes.iter().map(|&s| s as u32).sum()
    }
}

/// One codeword of a Huffman token table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HuffmanCode {
    /// Codeword bits, right-aligned.
    pub code: u32,
    pub length: u8,
    pub token: u8,
}

impl HuffmanCode {
    /// Codeword as a string of '0' and '1'.
    pub fn bits(&self) -> String {
        (0..self.length)
            .rev()
            .map(|i| if (self.code >> i) & 1 == 1 { '1' } else { '0' })
            .collect()
    }
}

impl fmt::Display for HuffmanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.bits(), self.token)
    }
}

/// Codewords of one table, in the order the tree walk found them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HuffmanTree {
    pub codes: Vec<HuffmanCode>,
}

/// Decoded setup header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupHeader {
    pub loop_filter_limits: Vec<u8>,
    pub ac_scale: Vec<u16>,
    pub dc_scale: Vec<u16>,
    pub base_matrices: Vec<Vec<u8>>,
    /// Indexed by `type * COLOR_PLANES + plane`; inherited pairs share one allocation.
    pub quant_ranges: Vec<Arc<QuantRange>>,
    pub huffman_trees: Vec<HuffmanTree>,
}

impl SetupHeader {
    /// Ranges for quantization type `qti` (0 intra, 1 inter) and plane `pli`.
    pub fn quant_range(&self, qti: usize, pli: usize) -> Option<&Arc<QuantRange>> {
        if qti >= QUANT_TYPES || pli >= COLOR_PLANES {
            return None;
        }
        self.quant_ranges.get(qti * COLOR_PLANES + pli)
    }
}

fn read_loop_filter_limits(cursor: &mut BitCursor<'_, '_>) -> Result<Vec<u8>> {
    let nbits = cursor.read(3)?;
    (0..QUANT_INDEX_COUNT)
        .map(|_| cursor.read(nbits).map(|v| v as u8))
        .collect()
}

fn read_scale_table(cursor: &mut BitCursor<'_, '_>) -> Result<Vec<u16>> {
    let nbits = cursor.read(4)? + 1;
    (0..QUANT_INDEX_COUNT)
        .map(|_| cursor.read(nbits).map(|v| v as u16))
        .collect()
}

fn read_base_matrices(cursor: &mut BitCursor<'_, '_>) -> Result<Vec<Vec<u8>>> {
    let count = cursor.read(9)? + 1;
    if count > MAX_BASE_MATRICES {
        return Err(Error::invalid_field(
            "base matrix count",
            format!("{} exceeds {}", count, MAX_BASE_MATRICES),
        ));
    }
    (0..count)
        .map(|_| {
            (0..MATRIX_COEFFICIENTS)
                .map(|_| cursor.read(8).map(|v| v as u8))
                .collect::<Result<Vec<u8>>>()
        })
        .collect()
}

fn read_base_matrix_index(cursor: &mut BitCursor<'_, '_>, count: u32) -> Result<u16> {
    let index = cursor.read(ilog(count - 1))?;
    if index >= count {
        return Err(Error::BaseMatrixIndexOutOfRange { index, count });
    }
    Ok(index as u16)
}

/// Decode one fresh set of ranges; the sizes must add up to exactly 63.
pub(crate) fn read_quant_range(cursor: &mut BitCursor<'_, '_>, matrix_count: u32) -> Result<QuantRange> {
    let mut sizes = Vec::new();
    let mut base_matrix_indices = vec![read_base_matrix_index(cursor, matrix_count)?];
    let mut qi = 0u32;

    while qi < LAST_QUANT_INDEX {
        let size = cursor.read(ilog(LAST_QUANT_INDEX - 1 - qi))? + 1;
        qi += size;
        sizes.push(size as u8);
        base_matrix_indices.push(read_base_matrix_index(cursor, matrix_count)?);
    }

    if qi > LAST_QUANT_INDEX {
        return Err(Error::QuantRangeOverflow { index: qi });
    }

    Ok(QuantRange {
        sizes,
        base_matrix_indices,
    })
}

/// Decode the ranges of all six (type, plane) pairs in type-major order.
pub(crate) fn read_quant_ranges(
    cursor: &mut BitCursor<'_, '_>,
    matrix_count: u32,
) -> Result<Vec<Arc<QuantRange>>> {
    let mut ranges: Vec<Arc<QuantRange>> = Vec::with_capacity(QUANT_TYPES * COLOR_PLANES);

    for qti in 0..QUANT_TYPES {
        for pli in 0..COLOR_PLANES {
            let new_range = if qti == 0 && pli == 0 {
                true
            } else {
                cursor.read_bit()?
            };

            if new_range {
                ranges.push(Arc::new(read_quant_range(cursor, matrix_count)?));
                continue;
            }

            let reference_previous_type = qti > 0 && cursor.read_bit()?;
            let (qtj, plj) = if reference_previous_type {
                (qti - 1, pli)
            } else {
                ((3 * qti + pli - 1) / 3, (pli + 2) % 3)
            };
            let source = ranges.get(qtj * COLOR_PLANES + plj).cloned().ok_or_else(|| {
                Error::invalid_field("quantization range", format!("no ranges for ({}, {})", qtj, plj))
            })?;
            debug!(qti, pli, qtj, plj, "sharing quantization ranges");
            ranges.push(source);
        }
    }

    Ok(ranges)
}

fn read_huffman_node(
    cursor: &mut BitCursor<'_, '_>,
    tree: usize,
    code: u32,
    length: u32,
    codes: &mut Vec<HuffmanCode>,
) -> Result<()> {
    if cursor.read_bit()? {
        if codes.len() == MAX_HUFFMAN_TOKENS {
            return Err(Error::HuffmanTreeOverflow {
                tree,
                reason: "more than 32 tokens",
            });
        }
        let token = cursor.read(5)? as u8;
        codes.push(HuffmanCode {
            code,
            length: length as u8,
            token,
        });
        return Ok(());
    }

    // Checked before descending so recursion depth stays bounded
    if length >= MAX_HUFFMAN_CODE_LENGTH {
        return Err(Error::HuffmanTreeOverflow {
            tree,
            reason: "codeword longer than 32 bits",
        });
    }
    read_huffman_node(cursor, tree, code << 1, length + 1, codes)?;
    read_huffman_node(cursor, tree, (code << 1) | 1, length + 1, codes)
}

/// Decode one Huffman table, "0" subtree before "1" subtree.
pub(crate) fn read_huffman_tree(cursor: &mut BitCursor<'_, '_>, tree: usize) -> Result<HuffmanTree> {
    let mut codes = Vec::new();
    read_huffman_node(cursor, tree, 0, 0, &mut codes)?;
    Ok(HuffmanTree { codes })
}

/// Decode the setup header from packet 2.
pub fn decode_setup(packet: &Packet<'_>) -> Result<SetupHeader> {
    let reader = packet.reader();
    expect_header(&reader, HeaderType::Setup)?;
    read_setup(&reader).map_err(truncated)
}

fn read_setup(reader: &BitReader<'_>) -> Result<SetupHeader> {
    let mut cursor = reader.cursor(COMMON_HEADER_SIZE * 8);
    let loop_filter_limits = read_loop_filter_limits(&mut cursor)?;
    let ac_scale = read_scale_table(&mut cursor)?;
    let dc_scale = read_scale_table(&mut cursor)?;
    let base_matrices = read_base_matrices(&mut cursor)?;
    let quant_ranges = read_quant_ranges(&mut cursor, base_matrices.len() as u32)?;
    let huffman_trees = (0..HUFFMAN_TABLE_COUNT)
        .map(|tree| read_huffman_tree(&mut cursor, tree))
        .collect::<Result<Vec<_>>>()?;

    debug!(
        base_matrices = base_matrices.len(),
        bits = cursor.position(),
        "decoded theora setup header"
    );

    Ok(SetupHeader {
        loop_filter_limits,
        ac_scale,
        dc_scale,
        base_matrices,
        quant_ranges,
        huffman_trees,
    })
}
