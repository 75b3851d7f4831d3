use crate::dispatch::{self, ExtractOptions, Extraction};
use crate::encoded_strings::EncodedStringReader;
use crate::zlib;
use crate::{ArchiveError, ByteReader, DecodeError};

type Result<T> = std::result::Result<T, ArchiveError>;

const FILE_COUNT_OFFSET: usize = 0x08;
const DIRECTORY_OFFSET: usize = 0x5C;
const NAME_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LodEntry {
    pub name: String,
    pub offset: u32,
    pub full_size: u32,
    pub unused: u32,
    pub compressed_size: u32,
}

impl LodEntry {
    pub fn is_compressed(&self) -> bool {
        self.compressed_size != 0
    }

    /// The entry payload, inflated if the entry is compressed.
    pub fn read(&self, archive: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
        let mut reader = ByteReader::new(archive);
        reader.seek(self.offset as usize)?;
        if self.is_compressed() {
            let compressed = reader.read_bytes(self.compressed_size as usize)?;
            Ok(zlib::inflate(compressed, self.full_size as usize)?)
        } else {
            Ok(reader.read_bytes(self.full_size as usize)?.to_vec())
        }
    }
}

pub fn parse(archive: &[u8]) -> Result<Vec<LodEntry>> {
    let mut reader = ByteReader::new(archive);
    reader.seek(FILE_COUNT_OFFSET)?;
    let count = reader.read_u32()?;
    log::debug!("LOD directory holds {} entries", count);

    reader.seek(DIRECTORY_OFFSET)?;
    let mut entries = Vec::new();
    for _ in 0..count {
        entries.push(LodEntry {
            name: reader.read_fixed_string(NAME_SIZE)?,
            offset: reader.read_u32()?,
            full_size: reader.read_u32()?,
            unused: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
        });
    }
    Ok(entries)
}

pub fn extract(archive: &[u8], options: &ExtractOptions) -> Result<Extraction> {
    let entries = parse(archive)?;
    let mut extraction = Extraction::new();
    for entry in &entries {
        match entry.read(archive) {
            Ok(bytes) => {
                dispatch::dispatch_entry(&mut extraction, &entry.name, entry.offset as usize, bytes, options)
            }
            Err(err) => extraction.fail(&entry.name, entry.offset as usize, err),
        }
    }
    Ok(extraction)
}

#[cfg(test)]
pub(crate) fn build_lod(entries: &[(&str, &[u8], bool)]) -> Vec<u8> {
    use byteorder::{LittleEndian, WriteBytesExt};

    let mut bytes = b"LOD\0".to_vec();
    bytes.write_u32::<LittleEndian>(200).unwrap();
    bytes.write_u32::<LittleEndian>(entries.len() as u32).unwrap();
    bytes.resize(DIRECTORY_OFFSET, 0);

    let mut offset = DIRECTORY_OFFSET + entries.len() * 32;
    let mut payloads = Vec::new();
    for (name, data, compress) in entries {
        let mut raw_name = [0; NAME_SIZE];
        raw_name[..name.len()].copy_from_slice(name.as_bytes());
        bytes.extend(&raw_name);
        let stored = if *compress { zlib::deflate(data) } else { data.to_vec() };
        bytes.write_u32::<LittleEndian>(offset as u32).unwrap();
        bytes.write_u32::<LittleEndian>(data.len() as u32).unwrap();
        bytes.write_u32::<LittleEndian>(1).unwrap();
        let compressed_size = if *compress { stored.len() as u32 } else { 0 };
        bytes.write_u32::<LittleEndian>(compressed_size).unwrap();
        offset += stored.len();
        payloads.extend(stored);
    }
    bytes.extend(payloads);
    bytes
}
