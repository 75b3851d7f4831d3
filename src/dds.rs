use std::io::Cursor;

use binread::{BinRead, BinReaderExt};

use crate::{ByteReader, DecodeError, Image, PixelFormat};

type Result<T> = std::result::Result<T, DecodeError>;

pub const DDS_MAGIC: u32 = 0x2053_4444;
const DDS_HEADER_SIZE: u32 = 124;
const DDPF_FOURCC: u32 = 0x4;
const FOURCC_DXT1: u32 = 0x3154_5844;
const FOURCC_DXT5: u32 = 0x3554_5844;

const BLOCK_WIDTH: usize = 4;
const BLOCK_HEIGHT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxtFormat {
    Dxt1,
    Dxt5,
}

impl DxtFormat {
    pub fn from_fourcc(code: u32) -> Option<Self> {
        match code {
            FOURCC_DXT1 => Some(DxtFormat::Dxt1),
            FOURCC_DXT5 => Some(DxtFormat::Dxt5),
            _ => None,
        }
    }
}

#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: u32,
    pub bit_count: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
}

/// The 124 byte header that follows the `DDS ` magic.
#[derive(BinRead, Debug, Clone)]
#[br(little)]
pub struct DdsHeader {
    pub header_size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

impl DdsHeader {
    /// Read the magic and header, leaving `reader` at the first block.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self> {
        let magic = reader.read_u32()?;
        if magic != DDS_MAGIC {
            return Err(DecodeError::BadMagic {
                expected: DDS_MAGIC,
                found: magic,
            });
        }
        let raw = reader.read_bytes(DDS_HEADER_SIZE as usize)?;
        let header: DdsHeader = Cursor::new(raw)
            .read_le()
            .map_err(|e| DecodeError::ParserError(format!("{:?}", e)))?;
        if header.header_size != DDS_HEADER_SIZE {
            return Err(DecodeError::InvalidField("header_size"));
        }
        Ok(header)
    }

    pub fn dxt_format(&self) -> Result<DxtFormat> {
        let code = self.pixel_format.fourcc;
        if self.pixel_format.flags & DDPF_FOURCC == 0 {
            return Err(DecodeError::UnsupportedFormat("dds pixel format flags", self.pixel_format.flags));
        }
        DxtFormat::from_fourcc(code).ok_or(DecodeError::UnsupportedFormat("dds compression", code))
    }
}

/// RGB endpoint expanded to the 8-bit range. The top five bits of the 565
/// value are red, the low five blue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockColor {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

impl BlockColor {
    pub fn from_565(value: u16) -> Self {
        BlockColor {
            r: (value >> 11) << 3,
            g: ((value >> 5) & 63) << 2,
            b: (value & 31) << 3,
        }
    }

    fn weighted(first: BlockColor, first_weight: u16, second: BlockColor, second_weight: u16) -> Self {
        let divisor = first_weight + second_weight;
        BlockColor {
            r: (first.r * first_weight + second.r * second_weight) / divisor,
            g: (first.g * first_weight + second.g * second_weight) / divisor,
            b: (first.b * first_weight + second.b * second_weight) / divisor,
        }
    }
}

pub fn decode_color_endpoints(color0: u16, color1: u16) -> [BlockColor; 4] {
    let c0 = BlockColor::from_565(color0);
    let c1 = BlockColor::from_565(color1);
    if color0 > color1 {
        [
            c0,
            c1,
            BlockColor::weighted(c0, 2, c1, 1),
            BlockColor::weighted(c0, 1, c1, 2),
        ]
    } else {
        [c0, c1, BlockColor::weighted(c0, 1, c1, 1), BlockColor::default()]
    }
}

pub fn decode_alpha_endpoints(alpha0: u8, alpha1: u8) -> [u8; 8] {
    let a0 = alpha0 as u32;
    let a1 = alpha1 as u32;
    let mut alpha = [alpha0, alpha1, 0, 0, 0, 0, 0, 0];
    if alpha0 > alpha1 {
        for k in 1..=6 {
            alpha[k + 1] = ((a0 * (7 - k as u32) + a1 * k as u32) / 7) as u8;
        }
    } else {
        for k in 1..=4 {
            alpha[k + 1] = ((a0 * (5 - k as u32) + a1 * k as u32) / 5) as u8;
        }
        alpha[6] = 0;
        alpha[7] = 255;
    }
    alpha
}

fn read_color_block(reader: &mut ByteReader) -> Result<([BlockColor; 4], u32)> {
    let color0 = reader.read_u16()?;
    let color1 = reader.read_u16()?;
    let lookup_table = reader.read_u32()?;
    Ok((decode_color_endpoints(color0, color1), lookup_table))
}

fn read_alpha_block(reader: &mut ByteReader) -> Result<([u8; 8], u64)> {
    let alpha0 = reader.read_u8()?;
    let alpha1 = reader.read_u8()?;
    let low = reader.read_u32()? as u64;
    let high = reader.read_u16()? as u64;
    Ok((decode_alpha_endpoints(alpha0, alpha1), low | (high << 32)))
}

/// Decode `width`x`height` pixels of DXT1 or DXT5 blocks.
///
/// DXT1 produces an `Rgb24` image, DXT5 an `Rgba32` one.
pub fn decode(reader: &mut ByteReader, width: usize, height: usize, format: DxtFormat) -> Result<Image> {
    if width == 0 || height == 0 || width % BLOCK_WIDTH != 0 || height % BLOCK_HEIGHT != 0 {
        return Err(DecodeError::InvalidField("texture dimensions"));
    }
    let pixel_format = match format {
        DxtFormat::Dxt1 => PixelFormat::Rgb24,
        DxtFormat::Dxt5 => PixelFormat::Rgba32,
    };
    let mut image = Image::packed(height, width, pixel_format)?;

    for block_y in (0..height).step_by(BLOCK_HEIGHT) {
        for block_x in (0..width).step_by(BLOCK_WIDTH) {
            let alpha = match format {
                DxtFormat::Dxt1 => None,
                DxtFormat::Dxt5 => Some(read_alpha_block(reader)?),
            };
            let (colors, lookup_table) = read_color_block(reader)?;

            for y in 0..BLOCK_HEIGHT {
                for x in 0..BLOCK_WIDTH {
                    let offset = y * BLOCK_WIDTH + x;
                    let color = colors[((lookup_table >> (offset * 2)) & 0x3) as usize];
                    match alpha {
                        None => {
                            let mut pixel = image.rgb_mut(block_x + x, block_y + y)?;
                            pixel.set_red(color.r as u8);
                            pixel.set_green(color.g as u8);
                            pixel.set_blue(color.b as u8);
                        }
                        Some((alphas, alpha_table)) => {
                            let mut pixel = image.rgba_mut(block_x + x, block_y + y)?;
                            pixel.set_red(color.r as u8);
                            pixel.set_green(color.g as u8);
                            pixel.set_blue(color.b as u8);
                            pixel.set_alpha(alphas[((alpha_table >> (offset * 3)) & 0x7) as usize]);
                        }
                    }
                }
            }
        }
    }
    Ok(image)
}

/// Decode a complete DDS file.
pub fn load(bytes: &[u8]) -> Result<Image> {
    let mut reader = ByteReader::new(bytes);
    let header = DdsHeader::read_from(&mut reader)?;
    let format = header.dxt_format()?;
    decode(
        &mut reader,
        header.width as usize,
        header.height as usize,
        format,
    )
}

#[cfg(test)]
pub(crate) fn build_dds(width: u32, height: u32, fourcc: u32, blocks: &[u8]) -> Vec<u8> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let mut bytes = Vec::new();
    bytes.write_u32::<LittleEndian>(DDS_MAGIC).unwrap();
    bytes.write_u32::<LittleEndian>(DDS_HEADER_SIZE).unwrap();
    bytes.write_u32::<LittleEndian>(0x000A_1007).unwrap();
    bytes.write_u32::<LittleEndian>(height).unwrap();
    bytes.write_u32::<LittleEndian>(width).unwrap();
    bytes.write_u32::<LittleEndian>(blocks.len() as u32).unwrap();
    bytes.write_u32::<LittleEndian>(0).unwrap();
    bytes.write_u32::<LittleEndian>(1).unwrap();
    bytes.extend_from_slice(&[0; 44]);
    bytes.write_u32::<LittleEndian>(32).unwrap();
    bytes.write_u32::<LittleEndian>(0x5).unwrap();
    bytes.write_u32::<LittleEndian>(fourcc).unwrap();
    bytes.extend_from_slice(&[0; 20]);
    bytes.write_u32::<LittleEndian>(0x0040_1008).unwrap();
    bytes.extend_from_slice(&[0; 16]);
    bytes.extend_from_slice(blocks);
    bytes
}
