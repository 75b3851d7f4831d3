use thiserror::Error;

/// Coarse classification of a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A read or write would leave the buffer.
    Bounds,
    /// Magic mismatch, unsupported code or an invalid field combination.
    Format,
    /// A declared size disagrees with the size derived from other fields.
    ArithmeticInvariant,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryFileError {
    #[error("Access of {count} bytes at 0x{position:x} is out of bounds for a buffer of size 0x{size:x}.")]
    OutOfBounds {
        position: usize,
        count: usize,
        size: usize,
    },

    #[error("Cannot move to 0x{0:x} in a buffer of size 0x{1:x}.")]
    BadPosition(usize, usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("Invalid image geometry {width}x{height} with stride {stride}.")]
    InvalidGeometry {
        width: usize,
        height: usize,
        stride: usize,
    },

    #[error("Pixel ({0}, {1}) is outside of a {2}x{3} image.")]
    PixelOutOfBounds(usize, usize, usize, usize),

    #[error("Image has format {actual:?} but {expected:?} was requested.")]
    FormatMismatch {
        expected: crate::PixelFormat,
        actual: crate::PixelFormat,
    },

    #[error("Image has no palette.")]
    NoPalette,

    #[error("Palette index {0} is out of range.")]
    PaletteIndexOutOfBounds(usize),
}

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Input is not a valid zlib stream: {0}")]
    InvalidInput(String),

    #[error("Decompressed size mismatch. Expected {expected} bytes, got {actual}.")]
    SizeMismatch { expected: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error(transparent)]
    MemoryFileError(#[from] MemoryFileError),

    #[error(transparent)]
    ImageError(#[from] ImageError),

    #[error(transparent)]
    CompressionError(#[from] CompressionError),

    #[error("Bad magic number. Expected 0x{expected:08x}, found 0x{found:08x}.")]
    BadMagic { expected: u32, found: u32 },

    #[error("Unsupported {0} value {1}.")]
    UnsupportedFormat(&'static str, u32),

    #[error("Invalid header field '{0}'.")]
    InvalidField(&'static str),

    #[error("Field '{field}' is {actual} but {expected} was derived from the image geometry.")]
    SizeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate group index {0}.")]
    DuplicateGroup(u32),

    #[error("Malformed metadata row {row}: {reason}")]
    BadMetadata { row: usize, reason: String },

    #[error("Failed to parse header: {0}")]
    ParserError(String),
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::MemoryFileError(_) => ErrorKind::Bounds,
            DecodeError::ImageError(ImageError::PixelOutOfBounds(..)) => ErrorKind::Bounds,
            DecodeError::ImageError(_) => ErrorKind::Format,
            DecodeError::CompressionError(CompressionError::SizeMismatch { .. }) => {
                ErrorKind::ArithmeticInvariant
            }
            DecodeError::CompressionError(_) => ErrorKind::Format,
            DecodeError::SizeMismatch { .. } => ErrorKind::ArithmeticInvariant,
            DecodeError::BadMagic { .. }
            | DecodeError::UnsupportedFormat(..)
            | DecodeError::InvalidField(_)
            | DecodeError::DuplicateGroup(_)
            | DecodeError::BadMetadata { .. }
            | DecodeError::ParserError(_) => ErrorKind::Format,
        }
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Bad archive magic 0x{0:x}.")]
    BadMagic(u32),

    #[error(transparent)]
    MemoryFileError(#[from] MemoryFileError),

    #[error(transparent)]
    DecodeError(#[from] DecodeError),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unrecognized file type '{0}'.")]
    UnrecognizedFileType(String),

    #[error("Output path '{0}' is not a directory.")]
    NotADirectory(String),

    #[error("Unable to encode '{0}' as png: {1}")]
    EncodingFailed(String, String),

    #[error(transparent)]
    ArchiveError(#[from] ArchiveError),

    #[error(transparent)]
    DecodeError(#[from] DecodeError),

    #[error(transparent)]
    GlobError(#[from] glob::PatternError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}
