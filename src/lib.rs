mod bin_streams;
mod encoded_strings;
mod errors;
mod extract;
mod zlib;

pub mod dds;
pub mod def;
pub mod dispatch;
pub mod image;
pub mod lod;
pub mod pak;
pub mod pcx;
pub mod png;
pub mod snd;
pub mod sprite;
pub mod vid;

pub use bin_streams::{ByteReader, ByteWriter};
pub use dispatch::{Contents, EntryFailure, ExtractOptions, Extraction, Output};
pub use encoded_strings::{decode_name, EncodedStringReader};
pub use extract::{
    default_destination, expand_inputs, extract_bytes, extract_file, write_outputs, ArchiveKind,
    Report,
};
pub use image::{Image, PixelFormat};
pub use zlib::inflate;

pub use errors::{
    ArchiveError, CompressionError, DecodeError, ErrorKind, ExtractError, ImageError,
    MemoryFileError,
};
