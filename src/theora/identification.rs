// Theora identification header (packet 0)
//
// Layout after the 7-byte common prefix, big-endian, in bytes:
//   VMAJ 1, VMIN 1, VREV 1, FMBW 2, FMBH 2, PICW 3, PICH 3, PICX 1, PICY 1,
//   FRN 4, FRD 4, PARN 3, PARD 3, CS 1, NOMBR 3,
//   then QUAL 6 bits, KFGSHIFT 5 bits, PF 2 bits, reserved 3 bits.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::ogg::{GranulePosition, Packet};
use crate::theora::{expect_header, truncated, HeaderType};
use crate::utils::bits::BitReader;

pub const THEORA_VERSION_MAJOR: u8 = 3;
pub const THEORA_VERSION_MINOR: u8 = 2;

/// Identification header size in bytes, prefix included.
pub const IDENTIFICATION_HEADER_SIZE: usize = 42;

/// Codec version triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

/// Color space of the decoded frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorSpace {
    Unspecified,
    /// ITU-R Rec. 470M
    Rec470M,
    /// ITU-R Rec. 470BG
    Rec470BG,
    Reserved(u8),
}

impl ColorSpace {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => ColorSpace::Unspecified,
            1 => ColorSpace::Rec470M,
            2 => ColorSpace::Rec470BG,
            other => ColorSpace::Reserved(other),
        }
    }
}

/// Chroma subsampling of the coded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelFormat {
    Yuv420,
    Reserved,
    Yuv422,
    Yuv444,
}

impl PixelFormat {
    /// Map the 2-bit PF field.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => PixelFormat::Yuv420,
            1 => PixelFormat::Reserved,
            2 => PixelFormat::Yuv422,
            _ => PixelFormat::Yuv444,
        }
    }

    /// Super block and block counts for a frame of `width` x `height` macroblocks.
    ///
    /// `None` for the reserved format. A 65535 x 65535 frame needs more than
    /// 32 bits for its block count.
    pub fn block_counts(self, width: u64, height: u64) -> Option<(u64, u64)> {
        let luma_super_blocks = ((width + 1) / 2) * ((height + 1) / 2);
        let macroblocks = width * height;
        match self {
            PixelFormat::Yuv420 => Some((
                luma_super_blocks + 2 * ((width + 3) / 4) * ((height + 3) / 4),
                6 * macroblocks,
            )),
            PixelFormat::Yuv422 => Some((
                luma_super_blocks + 2 * ((width + 3) / 4) * ((height + 1) / 2),
                8 * macroblocks,
            )),
            PixelFormat::Yuv444 => Some((3 * luma_super_blocks, 12 * macroblocks)),
            PixelFormat::Reserved => None,
        }
    }
}

/// Decoded identification header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentificationHeader {
    pub version: Version,
    /// Coded frame width in macroblocks.
    pub frame_width_mbs: u16,
    /// Coded frame height in macroblocks.
    pub frame_height_mbs: u16,
    pub picture_width: u32,
    pub picture_height: u32,
    pub picture_x: u8,
    /// Measured from the bottom of the frame.
    pub picture_y: u8,
    pub frame_rate_numerator: u32,
    pub frame_rate_denominator: u32,
    pub aspect_numerator: u32,
    pub aspect_denominator: u32,
    pub color_space: ColorSpace,
    /// Target bitrate in bits per second, 0 when unspecified.
    pub nominal_bitrate: u32,
    pub quality: u8,
    pub keyframe_granule_shift: u8,
    pub pixel_format: PixelFormat,
    pub super_block_count: u64,
    pub block_count: u64,
    pub macroblock_count: u64,
}

impl IdentificationHeader {
    /// Coded frame width in pixels.
    pub fn frame_width(&self) -> u32 {
        self.frame_width_mbs as u32 * 16
    }

    /// Coded frame height in pixels.
    pub fn frame_height(&self) -> u32 {
        self.frame_height_mbs as u32 * 16
    }

    /// Split a granule position into (last keyframe number, frames since it).
    pub fn split_granule(&self, granule: GranulePosition) -> (u64, u64) {
        let value = granule.to_u64();
        let shift = self.keyframe_granule_shift as u32;
        let mask = (1u64 << shift) - 1;
        (value >> shift, value & mask)
    }
}

fn read_version(reader: &BitReader<'_>) -> Result<Version> {
    let version = Version {
        major: reader.read_u8(7)?,
        minor: reader.read_u8(8)?,
        revision: reader.read_u8(9)?,
    };
    if version.major != THEORA_VERSION_MAJOR || version.minor != THEORA_VERSION_MINOR {
        return Err(Error::UnsupportedVersion(format!(
            "theora {}.{}.{}",
            version.major, version.minor, version.revision
        )));
    }
    Ok(version)
}

/// Decode the identification header from packet 0.
pub fn decode_identification(packet: &Packet<'_>) -> Result<IdentificationHeader> {
    let reader = packet.reader();
    expect_header(&reader, HeaderType::Identification)?;
    read_identification(&reader).map_err(truncated)
}

fn read_identification(reader: &BitReader<'_>) -> Result<IdentificationHeader> {
    let version = read_version(reader)?;

    let frame_width_mbs = reader.read_u16(10)?;
    let frame_height_mbs = reader.read_u16(12)?;
    if frame_width_mbs == 0 || frame_height_mbs == 0 {
        return Err(Error::invalid_field(
            "frame size",
            format!("{}x{} macroblocks", frame_width_mbs, frame_height_mbs),
        ));
    }
    let frame_width = frame_width_mbs as u32 * 16;
    let frame_height = frame_height_mbs as u32 * 16;

    let picture_width = reader.read_bits(14 * 8, 24)?;
    let picture_height = reader.read_bits(17 * 8, 24)?;
    let picture_x = reader.read_u8(20)?;
    let picture_y = reader.read_u8(21)?;
    if picture_width > frame_width || picture_height > frame_height {
        return Err(Error::invalid_field(
            "picture size",
            format!(
                "{}x{} exceeds the {}x{} frame",
                picture_width, picture_height, frame_width, frame_height
            ),
        ));
    }
    if picture_x as u32 > frame_width - picture_width
        || picture_y as u32 > frame_height - picture_height
    {
        return Err(Error::invalid_field(
            "picture offset",
            format!("({}, {}) moves the picture outside the frame", picture_x, picture_y),
        ));
    }

    let frame_rate_numerator = reader.read_u32(22)?;
    let frame_rate_denominator = reader.read_u32(26)?;
    if frame_rate_numerator == 0 || frame_rate_denominator == 0 {
        return Err(Error::invalid_field(
            "frame rate",
            format!("{}/{}", frame_rate_numerator, frame_rate_denominator),
        ));
    }

    let aspect_numerator = reader.read_bits(30 * 8, 24)?;
    let aspect_denominator = reader.read_bits(33 * 8, 24)?;

    let color_space = ColorSpace::from_byte(reader.read_u8(36)?);
    if let ColorSpace::Reserved(value) = color_space {
        return Err(Error::invalid_field("color space", format!("reserved value {}", value)));
    }

    let nominal_bitrate = reader.read_bits(37 * 8, 24)?;

    let mut cursor = reader.cursor(40 * 8);
    let quality = cursor.read(6)? as u8;
    let keyframe_granule_shift = cursor.read(5)? as u8;
    let pixel_format = PixelFormat::from_bits(cursor.read(2)? as u8);
    let reserved = cursor.read(3)?;

    if reserved != 0 {
        return Err(Error::invalid_field("reserved bits", format!("{:#05b}", reserved)));
    }

    let (super_block_count, block_count) = pixel_format
        .block_counts(frame_width_mbs as u64, frame_height_mbs as u64)
        .ok_or_else(|| Error::invalid_field("pixel format", "reserved value 1"))?;

    Ok(IdentificationHeader {
        version,
        frame_width_mbs,
        frame_height_mbs,
        picture_width,
        picture_height,
        picture_x,
        picture_y,
        frame_rate_numerator,
        frame_rate_denominator,
        aspect_numerator,
        aspect_denominator,
        color_space,
        nominal_bitrate,
        quality,
        keyframe_granule_shift,
        pixel_format,
        super_block_count,
        block_count,
        macroblock_count: frame_width_mbs as u64 * frame_height_mbs as u64,
    })
}
