use std::io::Cursor;

use binread::{BinRead, BinReaderExt};

use crate::image::{swap_red_blue, PALETTE_SIZE};
use crate::{ByteReader, DecodeError, Image, PixelFormat};

type Result<T> = std::result::Result<T, DecodeError>;

pub const P32_MAGIC: u32 = 0x4632_3350;
const P32_HEADER_SIZE: usize = 40;

#[derive(BinRead, Debug, Clone)]
#[br(little, magic = b"P32F")]
pub struct P32Header {
    pub reserved: u32,
    pub bits_per_pixel: u32,
    pub raw_size: u32,
    pub header_size: u32,
    pub data_size: u32,
    pub width: u32,
    pub height: u32,
    pub unknown8: u32,
    pub unknown9: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcxHeader {
    pub size: u32,
    pub width: u32,
    pub height: u32,
}

fn check_size(field: &'static str, expected: u64, actual: u32) -> Result<()> {
    if expected != actual as u64 {
        return Err(DecodeError::SizeMismatch {
            field,
            expected: expected as usize,
            actual: actual as usize,
        });
    }
    Ok(())
}

/// Decode either raster variant, picking by the leading magic.
pub fn load(bytes: &[u8]) -> Result<Image> {
    let mut reader = ByteReader::new(bytes);
    if reader.peek_u32()? == P32_MAGIC {
        load_p32(&mut reader)
    } else {
        load_pcx(&mut reader)
    }
}

/// 32-bit raster of BGRA pixels with rows stored bottom to top.
pub fn load_p32(reader: &mut ByteReader) -> Result<Image> {
    let raw = reader.read_bytes(P32_HEADER_SIZE)?;
    let header: P32Header = Cursor::new(raw)
        .read_le()
        .map_err(|e| DecodeError::ParserError(format!("{:?}", e)))?;
    if header.bits_per_pixel != 32 {
        return Err(DecodeError::UnsupportedFormat("bits per pixel", header.bits_per_pixel));
    }
    if header.header_size as usize != P32_HEADER_SIZE {
        return Err(DecodeError::InvalidField("header_size"));
    }
    check_size(
        "raw_size",
        header.header_size as u64 + header.data_size as u64,
        header.raw_size,
    )?;
    check_size(
        "data_size",
        header.width as u64 * header.height as u64 * 4,
        header.data_size,
    )?;

    let width = header.width as usize;
    let height = header.height as usize;
    let mut image = Image::packed(height, width, PixelFormat::Rgba32)?;
    for y in 0..height {
        let row = image.row_mut(height - y - 1)?;
        reader.read_into(row)?;
        swap_red_blue(row, PixelFormat::Rgba32);
    }
    Ok(image)
}

/// Legacy raster: 8-bit indexed with a trailing RGB palette, or 24-bit BGR.
pub fn load_pcx(reader: &mut ByteReader) -> Result<Image> {
    let header = PcxHeader {
        size: reader.read_u32()?,
        width: reader.read_u32()?,
        height: reader.read_u32()?,
    };
    let width = header.width as usize;
    let height = header.height as usize;
    let area = header.width as u64 * header.height as u64;

    if header.size as u64 == area {
        let mut image = Image::packed(height, width, PixelFormat::Indexed8)?;
        for y in 0..height {
            reader.read_into(image.row_mut(y)?)?;
        }
        let mut palette = [0; PALETTE_SIZE];
        reader.read_into(&mut palette)?;
        image.set_palette(&palette)?;
        Ok(image)
    } else if header.size as u64 == area * 3 {
        let mut image = Image::packed(height, width, PixelFormat::Rgb24)?;
        for y in 0..height {
            let row = image.row_mut(y)?;
            reader.read_into(row)?;
            swap_red_blue(row, PixelFormat::Rgb24);
        }
        Ok(image)
    } else {
        Err(DecodeError::UnsupportedFormat("pcx size", header.size))
    }
}

#[cfg(test)]
pub(crate) fn build_pcx(width: u32, height: u32, pixels: &[u8], palette: Option<&[u8]>) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend(&(pixels.len() as u32).to_le_bytes());
    bytes.extend(&width.to_le_bytes());
    bytes.extend(&height.to_le_bytes());
    bytes.extend(pixels);
    if let Some(palette) = palette {
        bytes.extend(palette);
    }
    bytes
}
