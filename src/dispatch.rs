use std::path::{Path, PathBuf};

use crate::def;
use crate::pcx;
use crate::{DecodeError, Image};

/// Knobs for turning archive entries into output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Decode rasters and sprite sheets. When off every entry is written raw.
    pub decode_images: bool,
    /// Keep the raw `.def`/`.d32` entry next to its decoded frames.
    pub keep_sprite_sources: bool,
    /// Write fully opaque RGBA images as RGB.
    pub drop_opaque_alpha: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            decode_images: true,
            keep_sprite_sources: true,
            drop_opaque_alpha: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Contents {
    Blob(Vec<u8>),
    Image(Image),
    Text(String),
}

/// A file to be written, relative to the extraction directory.
#[derive(Debug, Clone)]
pub struct Output {
    pub path: PathBuf,
    pub contents: Contents,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub name: String,
    pub offset: usize,
    pub error: DecodeError,
}

/// Everything an archive produced, plus the entries that failed.
#[derive(Debug, Default)]
pub struct Extraction {
    pub outputs: Vec<Output>,
    pub failures: Vec<EntryFailure>,
}

impl Extraction {
    pub fn new() -> Self {
        Extraction::default()
    }

    pub fn push_blob<P: Into<PathBuf>>(&mut self, path: P, bytes: Vec<u8>) {
        self.outputs.push(Output {
            path: path.into(),
            contents: Contents::Blob(bytes),
        });
    }

    pub fn push_image<P: Into<PathBuf>>(&mut self, path: P, image: Image) {
        self.outputs.push(Output {
            path: path.into(),
            contents: Contents::Image(image),
        });
    }

    pub fn push_text<P: Into<PathBuf>>(&mut self, path: P, text: String) {
        self.outputs.push(Output {
            path: path.into(),
            contents: Contents::Text(text),
        });
    }

    pub fn fail(&mut self, name: &str, offset: usize, error: DecodeError) {
        log::warn!("Entry '{}' at 0x{:x} failed: {}", name, offset, error);
        self.failures.push(EntryFailure {
            name: name.to_string(),
            offset,
            error,
        });
    }
}

/// How an archive entry is handled, chosen by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Raster,
    SpriteSheet,
    Other,
}

impl EntryKind {
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("pcx") | Some("p32") => EntryKind::Raster,
            Some("def") | Some("d32") => EntryKind::SpriteSheet,
            _ => EntryKind::Other,
        }
    }
}

pub fn png_name(name: &str) -> PathBuf {
    Path::new(name).with_extension("png")
}

/// Decoded frames and the `animation.json` manifest of a sprite sheet,
/// placed under `directory`.
pub fn sprite_sheet_outputs(bytes: &[u8], directory: &Path) -> Result<Vec<Output>, DecodeError> {
    let sheet = def::parse(bytes)?;
    let frames = def::decode_frames(bytes, &sheet)?;
    let mut outputs = Vec::with_capacity(frames.len() + 1);
    for frame in frames {
        outputs.push(Output {
            path: directory.join(frame.file_name),
            contents: Contents::Image(frame.image),
        });
    }
    outputs.push(Output {
        path: directory.join("animation.json"),
        contents: Contents::Text(def::manifest(&sheet)),
    });
    Ok(outputs)
}

/// Turn one archive entry into outputs. A decode failure is recorded and
/// the raw bytes are written instead.
pub fn dispatch_entry(
    extraction: &mut Extraction,
    name: &str,
    offset: usize,
    bytes: Vec<u8>,
    options: &ExtractOptions,
) {
    let kind = if options.decode_images {
        EntryKind::from_name(name)
    } else {
        EntryKind::Other
    };
    log::debug!("Dispatching '{}' ({} bytes) as {:?}", name, bytes.len(), kind);
    match kind {
        EntryKind::Raster => match pcx::load(&bytes) {
            Ok(image) => extraction.push_image(png_name(name), image),
            Err(err) => {
                extraction.fail(name, offset, err);
                extraction.push_blob(name, bytes);
            }
        },
        EntryKind::SpriteSheet => {
            let directory = Path::new(name).with_extension("");
            match sprite_sheet_outputs(&bytes, &directory) {
                Ok(outputs) => {
                    extraction.outputs.extend(outputs);
                    if options.keep_sprite_sources {
                        extraction.push_blob(name, bytes);
                    }
                }
                Err(err) => {
                    extraction.fail(name, offset, err);
                    extraction.push_blob(name, bytes);
                }
            }
        }
        EntryKind::Other => extraction.push_blob(name, bytes),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pcx::build_pcx;
    use crate::{ErrorKind, PixelFormat};

    fn paths(extraction: &Extraction) -> Vec<String> {
        extraction
            .outputs
            .iter()
            .map(|o| o.path.to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn kind_from_extension_ignores_case() {
        assert_eq!(EntryKind::Raster, EntryKind::from_name("BOARD.PCX"));
        assert_eq!(EntryKind::Raster, EntryKind::from_name("bg.p32"));
        assert_eq!(EntryKind::SpriteSheet, EntryKind::from_name("AvWAngl.Def"));
        assert_eq!(EntryKind::SpriteSheet, EntryKind::from_name("x.d32"));
        assert_eq!(EntryKind::Other, EntryKind::from_name("CRTRAITS.TXT"));
        assert_eq!(EntryKind::Other, EntryKind::from_name("pcx"));
    }

    #[test]
    fn raster_becomes_png() {
        let bytes = build_pcx(1, 1, &[1, 2, 3], None);
        let mut extraction = Extraction::new();
        dispatch_entry(&mut extraction, "TEST.PCX", 0, bytes, &ExtractOptions::default());
        assert_eq!(vec!["TEST.png"], paths(&extraction));
        match &extraction.outputs[0].contents {
            Contents::Image(image) => assert_eq!(PixelFormat::Rgb24, image.format()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(extraction.failures.is_empty());
    }

    #[test]
    fn broken_raster_passes_through() {
        let bytes = vec![9, 0, 0, 0, 2, 0, 0, 0, 2, 0, 0, 0];
        let mut extraction = Extraction::new();
        dispatch_entry(&mut extraction, "bad.pcx", 0x40, bytes.clone(), &ExtractOptions::default());
        assert_eq!(vec!["bad.pcx"], paths(&extraction));
        assert!(matches!(&extraction.outputs[0].contents, Contents::Blob(b) if *b == bytes));
        assert_eq!(1, extraction.failures.len());
        assert_eq!("bad.pcx", extraction.failures[0].name);
        assert_eq!(0x40, extraction.failures[0].offset);
        assert_eq!(ErrorKind::Format, extraction.failures[0].error.kind());
    }

    #[test]
    fn raw_mode_skips_decoding() {
        let bytes = build_pcx(1, 1, &[1, 2, 3], None);
        let options = ExtractOptions {
            decode_images: false,
            ..ExtractOptions::default()
        };
        let mut extraction = Extraction::new();
        dispatch_entry(&mut extraction, "TEST.PCX", 0, bytes, &options);
        assert_eq!(vec!["TEST.PCX"], paths(&extraction));
    }

    #[test]
    fn other_entries_are_verbatim() {
        let mut extraction = Extraction::new();
        dispatch_entry(&mut extraction, "a.txt", 0, b"hello".to_vec(), &ExtractOptions::default());
        assert!(matches!(&extraction.outputs[0].contents, Contents::Blob(b) if b.as_slice() == b"hello"));
    }

    #[test]
    fn broken_sprite_sheet_keeps_raw_entry() {
        let options = ExtractOptions {
            keep_sprite_sources: false,
            ..ExtractOptions::default()
        };
        let mut extraction = Extraction::new();
        dispatch_entry(&mut extraction, "x.def", 0, vec![1, 2], &options);
        assert_eq!(vec!["x.def"], paths(&extraction));
        assert_eq!(ErrorKind::Bounds, extraction.failures[0].error.kind());
    }
}
