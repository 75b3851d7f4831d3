use crate::dispatch::Extraction;
use crate::encoded_strings::EncodedStringReader;
use crate::{ArchiveError, ByteReader, DecodeError};

type Result<T> = std::result::Result<T, ArchiveError>;

const NAME_SIZE: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SndEntry {
    pub name: String,
    pub offset: u32,
    pub full_size: u32,
}

impl SndEntry {
    /// Names are stored without their extension.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.name)
    }

    pub fn read<'a>(&self, archive: &'a [u8]) -> std::result::Result<&'a [u8], DecodeError> {
        let mut reader = ByteReader::new(archive);
        reader.seek(self.offset as usize)?;
        Ok(reader.read_bytes(self.full_size as usize)?)
    }
}

pub fn parse(archive: &[u8]) -> Result<Vec<SndEntry>> {
    let mut reader = ByteReader::new(archive);
    let count = reader.read_u32()?;
    log::debug!("SND directory holds {} entries", count);
    let mut entries = Vec::new();
    for _ in 0..count {
        entries.push(SndEntry {
            name: reader.read_fixed_string(NAME_SIZE)?,
            offset: reader.read_u32()?,
            full_size: reader.read_u32()?,
        });
    }
    Ok(entries)
}

pub fn extract(archive: &[u8]) -> Result<Extraction> {
    let mut extraction = Extraction::new();
    for entry in parse(archive)? {
        match entry.read(archive) {
            Ok(bytes) => extraction.push_blob(entry.file_name(), bytes.to_vec()),
            Err(err) => extraction.fail(&entry.name, entry.offset as usize, err),
        }
    }
    Ok(extraction)
}
