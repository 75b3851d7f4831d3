use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::CompressionError;

type Result<T> = std::result::Result<T, CompressionError>;

/// Inflate a zlib stream that must expand to exactly `size` bytes.
///
/// Partial output is never returned: a short stream, trailing output or a
/// corrupt stream are all errors.
pub fn inflate(bytes: &[u8], size: usize) -> Result<Vec<u8>> {
    let mut decompressed = Vec::new();
    // Read one byte past the expected size so oversized streams are detected.
    let mut decoder = ZlibDecoder::new(bytes).take(size as u64 + 1);
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|err| CompressionError::InvalidInput(err.to_string()))?;
    if decompressed.len() != size {
        return Err(CompressionError::SizeMismatch {
            expected: size,
            actual: decompressed.len(),
        });
    }
    Ok(decompressed)
}

#[cfg(test)]
pub(crate) fn deflate(bytes: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn inflate_round_trip() {
        let original: Vec<u8> = (0..2000u32).map(|i| (i % 7) as u8).collect();
        let compressed = deflate(&original);
        assert_eq!(original, inflate(&compressed, original.len()).unwrap());
    }

    #[test]
    fn inflate_rejects_wrong_size() {
        let compressed = deflate(b"abcdefgh");
        assert!(matches!(
            inflate(&compressed, 4),
            Err(CompressionError::SizeMismatch { expected: 4, actual: 5 })
        ));
        assert!(matches!(
            inflate(&compressed, 10),
            Err(CompressionError::SizeMismatch {
                expected: 10,
                actual: 8
            })
        ));
    }

    #[test]
    fn huge_declared_size_does_not_preallocate() {
        let compressed = deflate(b"abc");
        assert!(matches!(
            inflate(&compressed, usize::MAX - 1),
            Err(CompressionError::SizeMismatch { actual: 3, .. })
        ));
    }

    #[test]
    fn inflate_rejects_garbage() {
        assert!(inflate(&[0x12, 0x34, 0x56, 0x78], 4).is_err());
    }

    #[test]
    fn inflate_rejects_truncated_stream() {
        let original: Vec<u8> = (0..300u32).map(|i| (i * 7919 % 251) as u8).collect();
        let compressed = deflate(&original);
        assert!(inflate(&compressed[..compressed.len() / 2], 300).is_err());
    }
}
