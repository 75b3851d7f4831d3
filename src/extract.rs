use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use strum_macros::EnumString;

use crate::dispatch::{self, Contents, EntryFailure, ExtractOptions, Extraction};
use crate::{lod, pak, png, snd, vid};
use crate::{ArchiveError, ExtractError};

type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString)]
pub enum ArchiveKind {
    #[strum(serialize = "lod")]
    Lod,
    #[strum(serialize = "snd")]
    Snd,
    #[strum(serialize = "vid")]
    Vid,
    #[strum(serialize = "pak")]
    Pak,
    #[strum(serialize = "def")]
    Def,
    #[strum(serialize = "d32")]
    D32,
}

impl ArchiveKind {
    /// Kind from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        ArchiveKind::from_str(&extension).ok()
    }
}

/// Result of extracting one file.
#[derive(Debug)]
pub struct Report {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub written: usize,
    pub failures: Vec<EntryFailure>,
}

/// Decode an archive held in memory. `name` is the archive's own file name,
/// used when a sprite sheet is passed through undecoded.
pub fn extract_bytes(
    kind: ArchiveKind,
    name: &str,
    bytes: &[u8],
    options: &ExtractOptions,
) -> std::result::Result<Extraction, ArchiveError> {
    match kind {
        ArchiveKind::Lod => lod::extract(bytes, options),
        ArchiveKind::Snd => snd::extract(bytes),
        ArchiveKind::Vid => vid::extract(bytes),
        ArchiveKind::Pak => pak::extract(bytes, options),
        ArchiveKind::Def | ArchiveKind::D32 => {
            let mut extraction = Extraction::new();
            if options.decode_images {
                extraction.outputs = dispatch::sprite_sheet_outputs(bytes, Path::new(""))?;
            } else {
                extraction.push_blob(name, bytes.to_vec());
            }
            Ok(extraction)
        }
    }
}

/// A directory named after the file's stem, next to the file.
pub fn default_destination(source: &Path) -> PathBuf {
    source.with_extension("")
}

/// Archive names come from untrusted data; only plain relative paths are written.
fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

pub fn write_outputs(extraction: &Extraction, destination: &Path, options: &ExtractOptions) -> Result<usize> {
    fs::create_dir_all(destination)?;
    let mut written = 0;
    for output in &extraction.outputs {
        if !is_contained(&output.path) {
            log::warn!("Skipping output with unsafe path '{}'", output.path.display());
            continue;
        }
        let path = destination.join(&output.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match &output.contents {
            Contents::Blob(bytes) => fs::write(&path, bytes)?,
            Contents::Text(text) => fs::write(&path, text)?,
            Contents::Image(image) => {
                let encoded = if options.drop_opaque_alpha {
                    png::encode(image)
                } else {
                    png::encode_exact(image)
                };
                let encoded = encoded.map_err(|err| {
                    ExtractError::EncodingFailed(path.display().to_string(), err.to_string())
                })?;
                fs::write(&path, encoded)?;
            }
        }
        written += 1;
    }
    Ok(written)
}

/// Extract `source` into `destination`, dispatching on the file extension.
pub fn extract_file(source: &Path, destination: &Path, options: &ExtractOptions) -> Result<Report> {
    let kind = ArchiveKind::from_path(source)
        .ok_or_else(|| ExtractError::UnrecognizedFileType(source.display().to_string()))?;
    if destination.is_file() {
        return Err(ExtractError::NotADirectory(destination.display().to_string()));
    }
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = fs::read(source)?;
    log::debug!("Read {} bytes from {}", bytes.len(), source.display());
    let extraction = extract_bytes(kind, &name, &bytes, options)?;
    let written = write_outputs(&extraction, destination, options)?;
    log::info!(
        "Extracted {} files from {} ({} failed)",
        written,
        source.display(),
        extraction.failures.len()
    );
    Ok(Report {
        source: source.to_path_buf(),
        destination: destination.to_path_buf(),
        written,
        failures: extraction.failures,
    })
}

/// Expand glob patterns. Arguments without glob characters are kept as-is
/// so a missing file still surfaces as an error later.
pub fn expand_inputs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !pattern.contains(&['*', '?', '['][..]) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        paths.extend(glob::glob(pattern)?.filter_map(|r| r.ok()));
    }
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lod::build_lod;
    use crate::pcx::build_pcx;
    use tempfile::TempDir;

    #[test]
    fn kind_from_path() {
        assert_eq!(Some(ArchiveKind::Lod), ArchiveKind::from_path(Path::new("H3bitmap.LOD")));
        assert_eq!(Some(ArchiveKind::D32), ArchiveKind::from_path(Path::new("dir/x.d32")));
        assert_eq!(None, ArchiveKind::from_path(Path::new("readme.txt")));
        assert_eq!(None, ArchiveKind::from_path(Path::new("lod")));
    }

    #[test]
    fn containment() {
        assert!(is_contained(Path::new("a/b.png")));
        assert!(!is_contained(Path::new("../b.png")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }

    #[test]
    fn lod_to_directory() {
        let pcx = build_pcx(2, 1, &[1, 2, 3, 4, 5, 6], None);
        let archive = build_lod(&[("BOARD.PCX", pcx.as_slice(), true), ("DATA.TXT", &b"text"[..], false)]);
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("H3bitmap.lod");
        fs::write(&source, &archive).unwrap();

        let destination = default_destination(&source);
        let report = extract_file(&source, &destination, &ExtractOptions::default()).unwrap();
        assert_eq!(2, report.written);
        assert!(report.failures.is_empty());
        assert_eq!(dir.path().join("H3bitmap"), report.destination);
        assert_eq!(b"text".to_vec(), fs::read(destination.join("DATA.TXT")).unwrap());
        let png = fs::read(destination.join("BOARD.png")).unwrap();
        assert_eq!(&[0x89, b'P', b'N', b'G'], &png[..4]);
    }

    #[test]
    fn rejects_unknown_and_file_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("notes.txt");
        fs::write(&source, b"x").unwrap();
        assert!(matches!(
            extract_file(&source, dir.path(), &ExtractOptions::default()),
            Err(ExtractError::UnrecognizedFileType(_))
        ));

        let source = dir.path().join("a.snd");
        fs::write(&source, [0u8; 4]).unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        assert!(matches!(
            extract_file(&source, &blocker, &ExtractOptions::default()),
            Err(ExtractError::NotADirectory(_))
        ));
    }

    #[test]
    fn raw_sprite_sheet_is_copied() {
        let options = ExtractOptions {
            decode_images: false,
            ..ExtractOptions::default()
        };
        let extraction = extract_bytes(ArchiveKind::Def, "x.def", &[1, 2, 3], &options).unwrap();
        assert_eq!(Path::new("x.def"), extraction.outputs[0].path);
        assert!(extract_bytes(ArchiveKind::Def, "x.def", &[1, 2, 3], &ExtractOptions::default()).is_err());
    }

    #[test]
    fn glob_expansion() {
        let dir = TempDir::new().unwrap();
        for name in &["a.lod", "b.lod", "c.snd"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let pattern = format!("{}/*.lod", dir.path().display());
        let mut paths = expand_inputs(&[pattern, "missing.vid".to_string()]).unwrap();
        paths.sort();
        assert_eq!(
            vec![dir.path().join("a.lod"), dir.path().join("b.lod"), PathBuf::from("missing.vid")],
            paths
        );
    }
}
