use std::collections::BTreeMap;
use std::path::Path;

use crate::encoded_strings::EncodedStringReader;
use crate::image::{swap_red_blue, PALETTE_SIZE};
use crate::sprite;
use crate::{ByteReader, DecodeError, Image, PixelFormat};

type Result<T> = std::result::Result<T, DecodeError>;

pub const D32_MAGIC: u32 = 0x4632_3344;
const FRAME_NAME_SIZE: usize = 13;
const D32_BITS_PER_PIXEL: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    /// Palette plus groups of RLE sprite frames.
    Def,
    /// Groups of raw 32-bit frames.
    D32,
}

impl SheetKind {
    pub fn detect(reader: &ByteReader) -> Result<Self> {
        if reader.peek_u32()? == D32_MAGIC {
            Ok(SheetKind::D32)
        } else {
            Ok(SheetKind::Def)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEntry {
    pub name: String,
    pub offset: u32,
}

/// One animation group. The unknown fields are stored as read; in D32
/// sheets `unknown1` holds the group header size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub index: u32,
    pub unknown1: u32,
    pub unknown2: u32,
    pub frames: Vec<FrameEntry>,
}

#[derive(Debug, Clone)]
pub struct SpriteSheet {
    pub kind: SheetKind,
    pub sheet_type: u32,
    pub width: u32,
    pub height: u32,
    pub palette: Option<Box<[u8; PALETTE_SIZE]>>,
    pub groups: BTreeMap<u32, Group>,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub group: u32,
    pub index: usize,
    pub file_name: String,
    pub image: Image,
}

impl SpriteSheet {
    pub fn frame_count(&self) -> usize {
        self.groups.values().map(|g| g.frames.len()).sum()
    }
}

fn insert_group(groups: &mut BTreeMap<u32, Group>, group: Group) -> Result<()> {
    if groups.contains_key(&group.index) {
        return Err(DecodeError::DuplicateGroup(group.index));
    }
    groups.insert(group.index, group);
    Ok(())
}

fn read_frame_entries(reader: &mut ByteReader, count: usize) -> Result<Vec<FrameEntry>> {
    let mut names = Vec::new();
    for _ in 0..count {
        names.push(reader.read_fixed_string(FRAME_NAME_SIZE)?);
    }
    let mut frames = Vec::new();
    for name in names {
        frames.push(FrameEntry {
            name,
            offset: reader.read_u32()?,
        });
    }
    Ok(frames)
}

/// Parse the sheet header and group directory.
pub fn parse(bytes: &[u8]) -> Result<SpriteSheet> {
    let mut reader = ByteReader::new(bytes);
    match SheetKind::detect(&reader)? {
        SheetKind::Def => parse_def(&mut reader),
        SheetKind::D32 => parse_d32(&mut reader),
    }
}

fn parse_def(reader: &mut ByteReader) -> Result<SpriteSheet> {
    let sheet_type = reader.read_u32()?;
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    let group_count = reader.read_u32()?;
    let palette: [u8; PALETTE_SIZE] = reader.read_array()?;

    let mut groups = BTreeMap::new();
    for _ in 0..group_count {
        let index = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let unknown1 = reader.read_u32()?;
        let unknown2 = reader.read_u32()?;
        let frames = read_frame_entries(reader, count)?;
        insert_group(
            &mut groups,
            Group {
                index,
                unknown1,
                unknown2,
                frames,
            },
        )?;
    }

    Ok(SpriteSheet {
        kind: SheetKind::Def,
        sheet_type,
        width,
        height,
        palette: Some(Box::new(palette)),
        groups,
    })
}

fn parse_d32(reader: &mut ByteReader) -> Result<SpriteSheet> {
    reader.skip(4)?;
    let _version = reader.read_u32()?;
    let _header_size = reader.read_u32()?;
    let width = reader.read_u32()?;
    let height = reader.read_u32()?;
    let group_count = reader.read_u32()?;
    let _unknown6 = reader.read_u32()?;
    let sheet_type = reader.read_u32()?;

    let mut groups = BTreeMap::new();
    for _ in 0..group_count {
        let header_size = reader.read_u32()?;
        let index = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let unknown2 = reader.read_u32()?;
        let expected = 17 * count + 16;
        if header_size as usize != expected {
            return Err(DecodeError::SizeMismatch {
                field: "group header_size",
                expected,
                actual: header_size as usize,
            });
        }
        let frames = read_frame_entries(reader, count)?;
        insert_group(
            &mut groups,
            Group {
                index,
                unknown1: header_size,
                unknown2,
                frames,
            },
        )?;
    }

    Ok(SpriteSheet {
        kind: SheetKind::D32,
        sheet_type,
        width,
        height,
        palette: None,
        groups,
    })
}

/// Decode every frame, in ascending group order.
pub fn decode_frames(bytes: &[u8], sheet: &SpriteSheet) -> Result<Vec<Frame>> {
    let mut reader = ByteReader::new(bytes);
    let mut frames = Vec::with_capacity(sheet.frame_count());
    for group in sheet.groups.values() {
        for (index, entry) in group.frames.iter().enumerate() {
            reader.seek(entry.offset as usize)?;
            let image = match sheet.kind {
                SheetKind::Def => {
                    let palette = sheet
                        .palette
                        .as_ref()
                        .ok_or(DecodeError::InvalidField("palette"))?;
                    sprite::read_frame(&mut reader, palette)?
                }
                SheetKind::D32 => read_d32_frame(&mut reader)?,
            };
            frames.push(Frame {
                group: group.index,
                index,
                file_name: frame_file_name(&entry.name),
                image,
            });
        }
    }
    log::debug!("Decoded {} frames from {} groups", frames.len(), sheet.groups.len());
    Ok(frames)
}

/// A full-size RGBA frame. The stored rectangle is BGRA, kept bottom-up at
/// its margins.
pub fn read_d32_frame(reader: &mut ByteReader) -> Result<Image> {
    let bits_per_pixel = reader.read_u32()?;
    let image_size = reader.read_u32()?;
    let full_width = reader.read_u32()? as usize;
    let full_height = reader.read_u32()? as usize;
    let stored_width = reader.read_u32()? as usize;
    let stored_height = reader.read_u32()? as usize;
    let margin_left = reader.read_u32()? as usize;
    let margin_top = reader.read_u32()? as usize;
    reader.skip(8)?;

    if bits_per_pixel != D32_BITS_PER_PIXEL {
        return Err(DecodeError::UnsupportedFormat("bits per pixel", bits_per_pixel));
    }
    let expected = stored_width
        .checked_mul(stored_height)
        .and_then(|area| area.checked_mul(4));
    if expected != Some(image_size as usize) {
        return Err(DecodeError::SizeMismatch {
            field: "image_size",
            expected: expected.unwrap_or(usize::MAX),
            actual: image_size as usize,
        });
    }

    let mut image = Image::packed(full_height, full_width, PixelFormat::Rgba32)?;
    if stored_width == 0 || stored_height == 0 {
        return Ok(image);
    }
    for y in 0..stored_height {
        let row = margin_top + stored_height - y - 1;
        let span = image.span_mut(margin_left, row, stored_width)?;
        reader.read_into(span)?;
        swap_red_blue(span, PixelFormat::Rgba32);
    }
    Ok(image)
}

fn frame_file_name(name: &str) -> String {
    Path::new(name)
        .with_extension("png")
        .to_string_lossy()
        .into_owned()
}

/// The `animation.json` listing of every frame. The group key is only
/// written when the sheet has more than one group.
pub fn manifest(sheet: &SpriteSheet) -> String {
    let with_group = sheet.groups.len() > 1;
    let mut entries = Vec::with_capacity(sheet.frame_count());
    for group in sheet.groups.values() {
        for (index, entry) in group.frames.iter().enumerate() {
            let mut line = String::from("\t\t{ ");
            if with_group {
                line += &format!("\"group\" : {}, ", group.index);
            }
            line += &format!(
                "\"frame\" : {}, \"file\" : \"{}\" }}",
                index,
                frame_file_name(&entry.name)
            );
            entries.push(line);
        }
    }
    format!("{{\n\t\"images\" : [\n{}\n\t]\n}}\n", entries.join(",\n"))
}
