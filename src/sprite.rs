use std::convert::TryFrom;

use crate::image::PALETTE_SIZE;
use crate::{ByteReader, DecodeError, Image, ImageError, PixelFormat};

type Result<T> = std::result::Result<T, DecodeError>;

/// Size of the four dimension fields re-read by the legacy correction.
const STORED_FIELDS_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFormat {
    Uncompressed,
    RowOffsets,
    SharedOffset,
    PackedRowOffsets,
}

impl TryFrom<u32> for SpriteFormat {
    type Error = DecodeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(SpriteFormat::Uncompressed),
            1 => Ok(SpriteFormat::RowOffsets),
            2 => Ok(SpriteFormat::SharedOffset),
            3 => Ok(SpriteFormat::PackedRowOffsets),
            _ => Err(DecodeError::UnsupportedFormat("sprite format", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub size: u32,
    pub format: u32,
    pub full_width: u32,
    pub full_height: u32,
    pub stored_width: u32,
    pub stored_height: u32,
    pub margin_left: u32,
    pub margin_top: u32,
}

impl FrameHeader {
    pub fn read(reader: &mut ByteReader) -> Result<Self> {
        Ok(FrameHeader {
            size: reader.read_u32()?,
            format: reader.read_u32()?,
            full_width: reader.read_u32()?,
            full_height: reader.read_u32()?,
            stored_width: reader.read_u32()?,
            stored_height: reader.read_u32()?,
            margin_left: reader.read_u32()?,
            margin_top: reader.read_u32()?,
        })
    }

    /// Some old sheets store format 1 frames with garbage stored dimensions
    /// that exceed the full frame.
    pub fn has_legacy_dimensions(&self) -> bool {
        self.format == 1
            && self.stored_width > self.full_width
            && self.stored_height > self.full_height
    }

    /// Replace garbage dimensions with the full frame. Returns whether the
    /// header was changed; the caller must then re-read the last 16 bytes.
    pub fn fix_legacy_dimensions(&mut self) -> bool {
        if !self.has_legacy_dimensions() {
            return false;
        }
        self.stored_width = self.full_width;
        self.stored_height = self.full_height;
        self.margin_left = 0;
        self.margin_top = 0;
        true
    }
}

/// Read a frame header at the reader's position and decode the frame.
pub fn read_frame(reader: &mut ByteReader, palette: &[u8; PALETTE_SIZE]) -> Result<Image> {
    let mut header = FrameHeader::read(reader)?;
    if header.fix_legacy_dimensions() {
        log::debug!("Correcting legacy frame dimensions {}x{}", header.full_width, header.full_height);
        reader.rewind(STORED_FIELDS_SIZE)?;
    }
    decode(reader, &header, palette)
}

/// Decode one frame. `reader` must sit right after the frame header, which
/// is the origin all segment offsets are relative to.
pub fn decode(reader: &mut ByteReader, header: &FrameHeader, palette: &[u8; PALETTE_SIZE]) -> Result<Image> {
    let format = SpriteFormat::try_from(header.format)?;
    let mut image = Image::packed(
        header.full_height as usize,
        header.full_width as usize,
        PixelFormat::Indexed8,
    )?;
    image.set_palette(palette)?;

    let origin = reader.tell();
    let stored_width = header.stored_width as usize;
    let stored_height = header.stored_height as usize;
    if stored_width == 0 || stored_height == 0 {
        return Ok(image);
    }
    let mut rows = Rows {
        image: &mut image,
        left: header.margin_left as usize,
        top: header.margin_top as usize,
        width: stored_width,
    };

    match format {
        SpriteFormat::Uncompressed => {
            for y in 0..stored_height {
                let span = rows.span(0, y, stored_width)?;
                reader.read_into(span)?;
            }
        }
        SpriteFormat::RowOffsets => {
            let mut offsets = Vec::new();
            for _ in 0..stored_height {
                offsets.push(reader.read_u32()? as usize);
            }
            for (y, offset) in offsets.into_iter().enumerate() {
                reader.seek(origin + offset)?;
                decode_wide_segments(reader, &mut rows, y)?;
            }
        }
        SpriteFormat::SharedOffset => {
            let offset = reader.read_u16()? as usize;
            reader.seek(origin + offset)?;
            for y in 0..stored_height {
                decode_packed_segments(reader, &mut rows, y)?;
            }
        }
        SpriteFormat::PackedRowOffsets => {
            for y in 0..stored_height {
                reader.seek(origin + y * 2 * (stored_width / 32))?;
                let offset = reader.read_u16()? as usize;
                reader.seek(origin + offset)?;
                decode_packed_segments(reader, &mut rows, y)?;
            }
        }
    }
    Ok(image)
}

/// The stored rectangle of a frame, addressed relative to its margins.
struct Rows<'a> {
    image: &'a mut Image,
    left: usize,
    top: usize,
    width: usize,
}

impl<'a> Rows<'a> {
    fn span(&mut self, x: usize, y: usize, count: usize) -> Result<&mut [u8]> {
        if x + count > self.width {
            return Err(ImageError::PixelOutOfBounds(
                self.left + x + count - 1,
                self.top + y,
                self.left + self.width,
                self.image.height(),
            )
            .into());
        }
        Ok(self.image.span_mut(self.left + x, self.top + y, count)?)
    }
}

/// Two byte segments: a type (0xFF for literals, otherwise the fill index)
/// and the length minus one.
fn decode_wide_segments(reader: &mut ByteReader, rows: &mut Rows, y: usize) -> Result<()> {
    let mut x = 0;
    while x < rows.width {
        let segment_type = reader.read_u8()?;
        let length = reader.read_u8()? as usize + 1;
        let span = rows.span(x, y, length)?;
        if segment_type == 0xFF {
            reader.read_into(span)?;
        } else {
            fill(span, segment_type);
        }
        x += length;
    }
    Ok(())
}

/// One byte segments: the top three bits are the type (7 for literals,
/// otherwise the fill index), the low five the length minus one.
fn decode_packed_segments(reader: &mut ByteReader, rows: &mut Rows, y: usize) -> Result<()> {
    let mut x = 0;
    while x < rows.width {
        let value = reader.read_u8()?;
        let segment_type = value / 32;
        let length = (value & 31) as usize + 1;
        let span = rows.span(x, y, length)?;
        if segment_type == 7 {
            reader.read_into(span)?;
        } else {
            fill(span, segment_type);
        }
        x += length;
    }
    Ok(())
}

fn fill(span: &mut [u8], value: u8) {
    for pixel in span.iter_mut() {
        *pixel = value;
    }
}
