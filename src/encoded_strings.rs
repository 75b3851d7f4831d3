use encoding_rs::WINDOWS_1252;

use crate::{ByteReader, MemoryFileError};

type Result<T> = std::result::Result<T, MemoryFileError>;

/// Decode a NUL-padded name. Everything from the first NUL on is ignored.
pub fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    let (result, _, _) = WINDOWS_1252.decode(&raw[..end]);
    result.into()
}

pub trait EncodedStringReader {
    fn read_fixed_string(&mut self, size: usize) -> Result<String>;
}

impl<'a> EncodedStringReader for ByteReader<'a> {
    fn read_fixed_string(&mut self, size: usize) -> Result<String> {
        Ok(decode_name(self.read_bytes(size)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stops_at_nul() {
        assert_eq!("AVWANGL.DEF", decode_name(b"AVWANGL.DEF\0\x7f\x13"));
        assert_eq!("", decode_name(&[0; 16]));
        assert_eq!("NONUL", decode_name(b"NONUL"));
    }

    #[test]
    fn decodes_windows_1252() {
        assert_eq!("Ch\u{e2}teau", decode_name(b"Ch\xe2teau\0"));
    }

    #[test]
    fn reader_consumes_full_width() {
        let bytes = b"ab\0\0cdef";
        let mut reader = ByteReader::new(bytes);
        assert_eq!("ab", reader.read_fixed_string(4).unwrap());
        assert_eq!(4, reader.tell());
        assert!(reader.read_fixed_string(5).is_err());
    }
}
