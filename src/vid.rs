use crate::dispatch::Extraction;
use crate::encoded_strings::EncodedStringReader;
use crate::{ArchiveError, ByteReader, DecodeError};

type Result<T> = std::result::Result<T, ArchiveError>;

const NAME_SIZE: usize = 40;

/// A video entry spans from its own start to the next entry's start; the
/// last one runs to the end of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VidEntry {
    pub name: String,
    pub begin: usize,
    pub end: usize,
}

impl VidEntry {
    pub fn read<'a>(&self, archive: &'a [u8]) -> std::result::Result<&'a [u8], DecodeError> {
        if self.end < self.begin {
            return Err(DecodeError::InvalidField("entry end"));
        }
        let mut reader = ByteReader::new(archive);
        reader.seek(self.begin)?;
        Ok(reader.read_bytes(self.end - self.begin)?)
    }
}

pub fn parse(archive: &[u8]) -> Result<Vec<VidEntry>> {
    let mut reader = ByteReader::new(archive);
    let count = reader.read_u32()?;
    log::debug!("VID directory holds {} entries", count);
    let mut entries: Vec<VidEntry> = Vec::new();
    for _ in 0..count {
        let name = reader.read_fixed_string(NAME_SIZE)?;
        let begin = reader.read_u32()? as usize;
        if let Some(previous) = entries.last_mut() {
            previous.end = begin;
        }
        entries.push(VidEntry {
            name,
            begin,
            end: archive.len(),
        });
    }
    Ok(entries)
}

pub fn extract(archive: &[u8]) -> Result<Extraction> {
    let mut extraction = Extraction::new();
    for entry in parse(archive)? {
        match entry.read(archive) {
            Ok(bytes) => extraction.push_blob(&entry.name, bytes.to_vec()),
            Err(err) => extraction.fail(&entry.name, entry.begin, err),
        }
    }
    Ok(extraction)
}
