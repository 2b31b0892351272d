// Bit-granular reads over one or more byte regions
//
// A logical packet may be split across several Ogg pages. Instead of copying
// the fragments together, the reader keeps the ordered list of slices plus
// their cumulative start offsets and resolves every byte through a binary
// search over those offsets.

use crate::error::{Error, Result};

/// MSB-first bit reader over an ordered list of byte regions.
#[derive(Debug, Clone, Default)]
pub struct BitReader<'a> {
    regions: Vec<&'a [u8]>,
    starts: Vec<usize>,
    len: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader over a single byte region.
    pub fn new(data: &'a [u8]) -> Self {
        Self::from_regions(vec![data])
    }

    /// Create a reader over regions that are concatenated virtually.
    pub fn from_regions(regions: Vec<&'a [u8]>) -> Self {
        let regions: Vec<&'a [u8]> = regions.into_iter().filter(|r| !r.is_empty()).collect();
        let mut starts = Vec::with_capacity(regions.len());
        let mut len = 0;
        for region in &regions {
            starts.push(len);
            len += region.len();
        }
        BitReader {
            regions,
            starts,
            len,
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total length in bits.
    pub fn len_bits(&self) -> usize {
        self.len * 8
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        if offset >= self.len {
            return None;
        }
        // Last region whose start is <= offset
        let index = self.starts.partition_point(|&start| start <= offset).checked_sub(1)?;
        self.regions
            .get(index)?
            .get(offset - self.starts[index])
            .copied()
    }

    fn out_of_range(&self, bit_offset: usize, width: u32) -> Error {
        Error::OutOfRange {
            bit_offset,
            width,
            len_bits: self.len_bits(),
        }
    }

    /// Read `width` bits (at most 32) starting at `bit_offset`, most significant bit first.
    pub fn read_bits(&self, bit_offset: usize, width: u32) -> Result<u32> {
        if width == 0 {
            return Ok(0);
        }
        let end = bit_offset.checked_add(width as usize);
        if width > 32 || end.map_or(true, |end| end > self.len_bits()) {
            return Err(self.out_of_range(bit_offset, width));
        }

        let mut value: u64 = 0;
        let mut position = bit_offset;
        let mut remaining = width;
        while remaining > 0 {
            let byte = self
                .byte_at(position / 8)
                .ok_or_else(|| self.out_of_range(bit_offset, width))?;
            let available = 8 - (position % 8) as u32;
            let take = available.min(remaining);
            let bits = (byte as u64 >> (available - take)) & ((1u64 << take) - 1);
            value = (value << take) | bits;
            position += take as usize;
            remaining -= take;
        }

        Ok(value as u32)
    }

    fn bit_offset_of(&self, byte_offset: usize, width: u32) -> Result<usize> {
        byte_offset
            .checked_mul(8)
            .ok_or_else(|| self.out_of_range(usize::MAX, width))
    }

    /// Read one byte at `byte_offset`.
    pub fn read_u8(&self, byte_offset: usize) -> Result<u8> {
        Ok(self.read_bits(self.bit_offset_of(byte_offset, 8)?, 8)? as u8)
    }

    /// Read a big-endian 16-bit integer at `byte_offset`.
    pub fn read_u16(&self, byte_offset: usize) -> Result<u16> {
        Ok(self.read_bits(self.bit_offset_of(byte_offset, 16)?, 16)? as u16)
    }

    /// Read a big-endian 32-bit integer at `byte_offset`.
    pub fn read_u32(&self, byte_offset: usize) -> Result<u32> {
        self.read_bits(self.bit_offset_of(byte_offset, 32)?, 32)
    }

    /// Copy `len` bytes starting at `byte_offset` out of the regions.
    pub fn read_bytes(&self, byte_offset: usize, len: usize) -> Result<Vec<u8>> {
        let in_range = byte_offset
            .checked_add(len)
            .map_or(false, |end| end <= self.len);
        if !in_range {
            return Err(self.out_of_range(byte_offset.saturating_mul(8), 8));
        }
        (byte_offset..byte_offset + len)
            .map(|offset| {
                self.byte_at(offset)
                    .ok_or_else(|| self.out_of_range(offset * 8, 8))
            })
            .collect()
    }

    /// Start a sequential walk at `bit_position`.
    pub fn cursor(&self, bit_position: usize) -> BitCursor<'_, 'a> {
        BitCursor {
            reader: self,
            position: bit_position,
        }
    }
}

/// Sequential reader that advances a bit position over a [`BitReader`].
#[derive(Debug, Clone)]
pub struct BitCursor<'r, 'a> {
    reader: &'r BitReader<'a>,
    position: usize,
}

impl BitCursor<'_, '_> {
    /// Read `width` bits and advance.
    pub fn read(&mut self, width: u32) -> Result<u32> {
        let value = self.reader.read_bits(self.position, width)?;
        self.position += width as usize;
        Ok(value)
    }

    /// Read a single bit as a flag.
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read(1)? == 1)
    }

    /// Current bit position.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// Number of bits needed to store any value in `0..=x`, i.e. `ceil(log2(x + 1))`.
///
/// `ilog(0)` is 0, so a field whose only legal value is 0 occupies no bits.
pub fn ilog(x: u32) -> u32 {
    u32::BITS - x.leading_zeros()
}

/// MSB-first bit writer for building test bitstreams.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

#[cfg(test)]
impl BitWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write(&mut self, value: u32, width: u32) -> &mut Self {
        for i in (0..width).rev() {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            let bit = ((value >> i) & 1) as u8;
            if let Some(last) = self.bytes.last_mut() {
                *last |= bit << (7 - self.bits % 8);
            }
            self.bits += 1;
        }
        self
    }

    pub(crate) fn write_bit(&mut self, bit: bool) -> &mut Self {
        self.write(bit as u32, 1)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_single_region() {
        let data = [0b1010_1100, 0b0101_0011];
        let reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(0, 1).unwrap(), 1);
        assert_eq!(reader.read_bits(1, 3).unwrap(), 0b010);
        assert_eq!(reader.read_bits(4, 8).unwrap(), 0b1100_0101);
        assert_eq!(reader.read_bits(0, 16).unwrap(), 0xAC53);
        assert_eq!(reader.read_bits(9, 0).unwrap(), 0);
    }

    #[test]
    fn test_read_across_regions() {
        let first = [0x12, 0x34];
        let second = [0x56];
        let third = [0x78, 0x9A];
        let empty: [u8; 0] = [];
        let reader =
            BitReader::from_regions(vec![&first[..], &empty[..], &second[..], &third[..]]);

        assert_eq!(reader.len(), 5);
        assert_eq!(reader.read_u32(0).unwrap(), 0x1234_5678);
        assert_eq!(reader.read_u16(1).unwrap(), 0x3456);
        assert_eq!(reader.read_u8(4).unwrap(), 0x9A);
        // 4 bits of 0x34, then 0x5 of 0x56
        assert_eq!(reader.read_bits(12, 8).unwrap(), 0x45);
        assert_eq!(reader.read_bytes(1, 3).unwrap(), vec![0x34, 0x56, 0x78]);
    }

    #[test]
    fn test_out_of_range() {
        let data = [0xFF; 4];
        let reader = BitReader::new(&data);

        assert!(reader.read_bits(25, 8).is_err());
        assert!(reader.read_bits(0, 33).is_err());
        assert!(reader.read_u32(1).is_err());
        assert!(reader.read_bytes(3, 2).is_err());
        assert_eq!(reader.read_bits(24, 8).unwrap(), 0xFF);
        assert!(BitReader::new(&[]).read_u8(0).is_err());
    }

    #[test]
    fn test_cursor_advances() {
        let data = [0b1101_0010, 0b1000_0000];
        let reader = BitReader::new(&data);
        let mut cursor = reader.cursor(0);

        assert!(cursor.read_bit().unwrap());
        assert_eq!(cursor.read(3).unwrap(), 0b101);
        assert_eq!(cursor.read(0).unwrap(), 0);
        assert_eq!(cursor.read(5).unwrap(), 0b00101);
        assert_eq!(cursor.position(), 9);
    }

    #[test]
    fn test_ilog() {
        assert_eq!(ilog(0), 0);
        assert_eq!(ilog(1), 1);
        assert_eq!(ilog(2), 2);
        assert_eq!(ilog(3), 2);
        assert_eq!(ilog(4), 3);
        assert_eq!(ilog(62), 6);
        assert_eq!(ilog(63), 6);
        assert_eq!(ilog(383), 9);
    }

    #[test]
    fn test_writer_matches_reader() {
        let mut writer = BitWriter::new();
        writer.write(0b101, 3).write(0x1FF, 9).write_bit(false).write(0xABCD, 16);
        let bytes = writer.into_bytes();
        let reader = BitReader::new(&bytes);

        assert_eq!(bytes.len(), 4);
        assert_eq!(reader.read_bits(0, 3).unwrap(), 0b101);
        assert_eq!(reader.read_bits(3, 9).unwrap(), 0x1FF);
        assert_eq!(reader.read_bits(12, 1).unwrap(), 0);
        assert_eq!(reader.read_bits(13, 16).unwrap(), 0xABCD);
    }
}
