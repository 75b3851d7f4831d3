use encoding_rs::WINDOWS_1252;

use crate::dispatch::{png_name, ExtractOptions, Extraction};
use crate::encoded_strings::EncodedStringReader;
use crate::{dds, zlib};
use crate::{ArchiveError, ByteReader, DecodeError};

type Result<T> = std::result::Result<T, ArchiveError>;

const PAK_MAGIC: u32 = 4;
const NAME_SIZE: usize = 20;
const FIELDS_WITHOUT_SHADOW: usize = 12;
const FIELDS_WITH_SHADOW: usize = 18;

/// Where one sprite sits on its sheet and how it is offset when drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub sheet_index: i32,
    pub sprite_offset_x: i32,
    pub unknown1: i32,
    pub sprite_offset_y: i32,
    pub unknown2: i32,
    pub sheet_offset_x: i32,
    pub sheet_offset_y: i32,
    pub width: i32,
    pub height: i32,
    pub rotation: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowPlacement {
    pub sheet_index: i32,
    pub sheet_offset_x: i32,
    pub sheet_offset_y: i32,
    pub width: i32,
    pub height: i32,
    pub rotation: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PakImage {
    WithoutShadow(Placement),
    WithShadow(Placement, ShadowPlacement),
}

impl PakImage {
    pub fn placement(&self) -> &Placement {
        match self {
            PakImage::WithoutShadow(placement) => placement,
            PakImage::WithShadow(placement, _) => placement,
        }
    }

    pub fn shadow(&self) -> Option<&ShadowPlacement> {
        match self {
            PakImage::WithoutShadow(_) => None,
            PakImage::WithShadow(_, shadow) => Some(shadow),
        }
    }
}

struct Row<'a> {
    number: usize,
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    fn int(&self, index: usize) -> std::result::Result<i32, DecodeError> {
        self.fields[index]
            .parse()
            .map_err(|_| DecodeError::BadMetadata {
                row: self.number,
                reason: format!("field {} is not an integer: '{}'", index, self.fields[index]),
            })
    }
}

/// Parse the whitespace separated placement table of a PAK entry. Blank
/// lines are skipped; every other row has 12 fields, or 18 when its shadow
/// flag is set.
pub fn parse_metadata(text: &str) -> std::result::Result<Vec<PakImage>, DecodeError> {
    let mut images = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let row = Row {
            number,
            fields: line.split_whitespace().collect(),
        };
        if row.fields.is_empty() {
            continue;
        }
        if row.fields.len() != FIELDS_WITHOUT_SHADOW && row.fields.len() != FIELDS_WITH_SHADOW {
            return Err(DecodeError::BadMetadata {
                row: number,
                reason: format!("expected 12 or 18 fields, found {}", row.fields.len()),
            });
        }

        let placement = Placement {
            name: row.fields[0].to_string(),
            sheet_index: row.int(1)?,
            sprite_offset_x: row.int(2)?,
            unknown1: row.int(3)?,
            sprite_offset_y: row.int(4)?,
            unknown2: row.int(5)?,
            sheet_offset_x: row.int(6)?,
            sheet_offset_y: row.int(7)?,
            width: row.int(8)?,
            height: row.int(9)?,
            rotation: row.int(10)?,
        };
        if row.int(11)? == 0 {
            images.push(PakImage::WithoutShadow(placement));
            continue;
        }
        if row.fields.len() != FIELDS_WITH_SHADOW {
            return Err(DecodeError::BadMetadata {
                row: number,
                reason: "shadow flag set without shadow fields".to_string(),
            });
        }
        let shadow = ShadowPlacement {
            sheet_index: row.int(12)?,
            sheet_offset_x: row.int(13)?,
            sheet_offset_y: row.int(14)?,
            width: row.int(15)?,
            height: row.int(16)?,
            rotation: row.int(17)?,
        };
        images.push(PakImage::WithShadow(placement, shadow));
    }
    Ok(images)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PakSheet {
    pub compressed_size: u32,
    pub full_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PakEntry {
    pub name: String,
    pub metadata_offset: u32,
    pub metadata_size: u32,
    pub sheets: Vec<PakSheet>,
    pub compressed_size: u32,
    pub full_size: u32,
}

impl PakEntry {
    /// The first sheet's compressed bytes follow the metadata directly.
    pub fn sheet_offset(&self) -> usize {
        self.metadata_offset as usize + self.metadata_size as usize
    }

    /// Parse the entry's placement table.
    pub fn read_images(&self, archive: &[u8]) -> std::result::Result<Vec<PakImage>, DecodeError> {
        let mut reader = ByteReader::new(archive);
        reader.seek(self.metadata_offset as usize)?;
        let raw = reader.read_bytes(self.metadata_size as usize)?;
        let (text, _, _) = WINDOWS_1252.decode(raw);
        parse_metadata(&text)
    }

    /// Inflate the first sheet into the DDS file it stores.
    pub fn read_sheet(&self, archive: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
        let sheet = self
            .sheets
            .first()
            .ok_or(DecodeError::InvalidField("sheet count"))?;
        let mut reader = ByteReader::new(archive);
        reader.seek(self.sheet_offset())?;
        let compressed = reader.read_bytes(sheet.compressed_size as usize)?;
        Ok(zlib::inflate(compressed, sheet.full_size as usize)?)
    }
}

pub fn parse(archive: &[u8]) -> Result<Vec<PakEntry>> {
    let mut reader = ByteReader::new(archive);
    let magic = reader.read_u32()?;
    if magic != PAK_MAGIC {
        return Err(ArchiveError::BadMagic(magic));
    }
    let header_offset = reader.read_u32()?;
    reader.seek(header_offset as usize)?;

    let count = reader.read_u32()?;
    log::debug!("PAK directory at 0x{:x} holds {} entries", header_offset, count);
    let mut entries = Vec::new();
    for _ in 0..count {
        let name = reader.read_fixed_string(NAME_SIZE)?;
        let metadata_offset = reader.read_u32()?;
        let metadata_size = reader.read_u32()?;
        let sheet_count = reader.read_u32()?;
        let mut sheets = Vec::new();
        for _ in 0..sheet_count {
            sheets.push(PakSheet {
                compressed_size: reader.read_u32()?,
                full_size: reader.read_u32()?,
            });
        }
        entries.push(PakEntry {
            name,
            metadata_offset,
            metadata_size,
            sheets,
            compressed_size: reader.read_u32()?,
            full_size: reader.read_u32()?,
        });
    }
    Ok(entries)
}

/// Decode the first sheet of every entry to `<name>.png`. Undecodable sheets
/// are written as `<name>.dds`; an entry whose placement table is malformed
/// is reported and skipped.
pub fn extract(archive: &[u8], options: &ExtractOptions) -> Result<Extraction> {
    let mut extraction = Extraction::new();
    for entry in parse(archive)? {
        match entry.read_images(archive) {
            Ok(images) => log::debug!("PAK entry '{}' places {} images", entry.name, images.len()),
            Err(err) => {
                extraction.fail(&entry.name, entry.metadata_offset as usize, err);
                continue;
            }
        }
        let offset = entry.sheet_offset();
        let dds_name = format!("{}.dds", entry.name);
        let sheet = match entry.read_sheet(archive) {
            Ok(sheet) => sheet,
            Err(err) => {
                extraction.fail(&entry.name, offset, err);
                continue;
            }
        };
        if !options.decode_images {
            extraction.push_blob(dds_name, sheet);
            continue;
        }
        match dds::load(&sheet) {
            Ok(image) => extraction.push_image(png_name(&dds_name), image),
            Err(err) => {
                extraction.fail(&entry.name, offset, err);
                extraction.push_blob(dds_name, sheet);
            }
        }
    }
    Ok(extraction)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dispatch::Contents;
    use crate::ErrorKind;
    use byteorder::{LittleEndian, WriteBytesExt};

    const FOURCC_DXT1: u32 = 0x3154_5844;

    const METADATA: &str = "tree 0 -3 7 -9 1 16 32 64 48 0 0\r\n\
                            \r\n\
                            rock 1 0 0 0 0 80 0 4 4 90 1 1 2 3 4 5 270\r\n";

    fn build_pak(entries: &[(&str, &str, Vec<u8>, u32)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(PAK_MAGIC).unwrap();
        bytes.write_u32::<LittleEndian>(0).unwrap();
        let mut directory = Vec::new();
        directory.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
        for (name, metadata, sheet, full_size) in entries {
            let metadata_offset = bytes.len() as u32;
            bytes.extend(metadata.as_bytes());
            bytes.extend(sheet);

            let mut raw_name = [0; NAME_SIZE];
            raw_name[..name.len()].copy_from_slice(name.as_bytes());
            directory.extend(&raw_name[..]);
            for value in &[
                metadata_offset,
                metadata.len() as u32,
                1,
                sheet.len() as u32,
                *full_size,
                sheet.len() as u32,
                *full_size,
            ] {
                directory.write_u32::<LittleEndian>(*value).unwrap();
            }
        }
        let header_offset = bytes.len() as u32;
        bytes[4..8].copy_from_slice(&header_offset.to_le_bytes());
        bytes.extend(directory);
        bytes
    }

    fn white_dds() -> Vec<u8> {
        dds::build_dds(4, 4, FOURCC_DXT1, &[0xFF, 0xFF, 0, 0, 0, 0, 0, 0])
    }

    #[test]
    fn metadata_rows() {
        let images = parse_metadata(METADATA).unwrap();
        assert_eq!(2, images.len());
        let tree = images[0].placement();
        assert_eq!("tree", tree.name);
        assert_eq!((-3, 7, -9, 1), (tree.sprite_offset_x, tree.unknown1, tree.sprite_offset_y, tree.unknown2));
        assert_eq!((16, 32, 64, 48), (tree.sheet_offset_x, tree.sheet_offset_y, tree.width, tree.height));
        assert!(images[0].shadow().is_none());

        let shadow = images[1].shadow().unwrap();
        assert_eq!(90, images[1].placement().rotation);
        assert_eq!((1, 2, 3, 4, 5, 270), (
            shadow.sheet_index,
            shadow.sheet_offset_x,
            shadow.sheet_offset_y,
            shadow.width,
            shadow.height,
            shadow.rotation
        ));
    }

    #[test]
    fn metadata_errors_name_the_row() {
        let err = parse_metadata("a 1 2 3\n").unwrap_err();
        assert!(matches!(err, DecodeError::BadMetadata { row: 0, .. }));
        let err = parse_metadata("\na 1 2 3 4 5 6 7 8 9 x 0\n").unwrap_err();
        assert!(matches!(err, DecodeError::BadMetadata { row: 1, .. }));
        let err = parse_metadata("a 1 2 3 4 5 6 7 8 9 10 1\n").unwrap_err();
        assert_eq!(ErrorKind::Format, err.kind());
    }

    #[test]
    fn sheet_decodes_to_png() {
        let dds = white_dds();
        let archive = build_pak(&[("trees", METADATA, zlib::deflate(&dds), dds.len() as u32)]);
        let entries = parse(&archive).unwrap();
        assert_eq!("trees", entries[0].name);
        assert_eq!(2, entries[0].read_images(&archive).unwrap().len());
        assert_eq!(8 + METADATA.len(), entries[0].sheet_offset());

        let extraction = extract(&archive, &ExtractOptions::default()).unwrap();
        assert!(extraction.failures.is_empty());
        assert_eq!("trees.png", extraction.outputs[0].path.to_str().unwrap());
        match &extraction.outputs[0].contents {
            Contents::Image(image) => {
                let pixel = image.rgb(3, 3).unwrap();
                assert_eq!((248, 252, 248), (pixel.red(), pixel.green(), pixel.blue()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn raw_mode_writes_dds() {
        let dds = white_dds();
        let archive = build_pak(&[("trees", "", zlib::deflate(&dds), dds.len() as u32)]);
        let options = ExtractOptions {
            decode_images: false,
            ..ExtractOptions::default()
        };
        let extraction = extract(&archive, &options).unwrap();
        assert_eq!("trees.dds", extraction.outputs[0].path.to_str().unwrap());
        assert!(matches!(&extraction.outputs[0].contents, Contents::Blob(b) if *b == dds));
    }

    #[test]
    fn corrupt_sheet_is_reported() {
        let dds = white_dds();
        let archive = build_pak(&[
            ("broken", "", vec![1, 2, 3, 4], 64),
            ("fine", "", zlib::deflate(&dds), dds.len() as u32),
        ]);
        let extraction = extract(&archive, &ExtractOptions::default()).unwrap();
        assert_eq!(1, extraction.outputs.len());
        assert_eq!("broken", extraction.failures[0].name);
    }

    #[test]
    fn bad_magic_aborts() {
        let mut archive = build_pak(&[]);
        archive[0] = 5;
        assert!(matches!(parse(&archive), Err(ArchiveError::BadMagic(5))));
    }

    #[test]
    fn bad_metadata_skips_only_its_entry() {
        let dds = white_dds();
        let archive = build_pak(&[
            ("odd", "x y\n", zlib::deflate(&dds), dds.len() as u32),
            ("good", "", zlib::deflate(&dds), dds.len() as u32),
        ]);
        assert_eq!(2, parse(&archive).unwrap().len());

        let extraction = extract(&archive, &ExtractOptions::default()).unwrap();
        assert_eq!(1, extraction.outputs.len());
        assert_eq!("good.png", extraction.outputs[0].path.to_str().unwrap());
        assert_eq!(1, extraction.failures.len());
        let failure = &extraction.failures[0];
        assert_eq!(("odd", 8), (failure.name.as_str(), failure.offset));
        assert!(matches!(failure.error, DecodeError::BadMetadata { row: 0, .. }));
    }
}
