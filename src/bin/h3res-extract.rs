//! h3res-extract - unpack Heroes III resource archives
//!
//! Extracts LOD, SND, VID and PAK archives and DEF/D32 sprite sheets into
//! directories, converting images to PNG.

use clap::Parser;
use h3res::{default_destination, expand_inputs, extract_file, ExtractOptions, Report};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "h3res-extract")]
#[command(about = "Extract Heroes III resource archives and sprite sheets")]
#[command(version)]
struct Cli {
    /// Archives to extract, as paths or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Directory to extract into. Each archive gets a subdirectory named after it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write entries as stored, without decoding images
    #[arg(long)]
    raw: bool,

    /// Quiet mode (only print errors)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every entry as it is dispatched
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::DEBUG
        } else if self.quiet {
            LevelFilter::ERROR
        } else {
            LevelFilter::WARN
        }
    }
}

fn destination_for(source: &Path, output: Option<&Path>) -> PathBuf {
    match (output, source.file_stem()) {
        (Some(root), Some(stem)) => root.join(stem),
        _ => default_destination(source),
    }
}

fn print_report(report: &Report) {
    println!(
        "{} -> {}: {} files written",
        report.source.display(),
        report.destination.display(),
        report.written
    );
    for failure in &report.failures {
        println!(
            "  {} (0x{:x}): {:?}: {}",
            failure.name,
            failure.offset,
            failure.error.kind(),
            failure.error
        );
    }
}

fn main() {
    let cli = Cli::parse();
    // Also forwards the library's `log` records.
    let _ = tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .try_init();

    let options = ExtractOptions {
        decode_images: !cli.raw,
        ..ExtractOptions::default()
    };

    let inputs = match expand_inputs(&cli.inputs) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut failed = false;
    for source in inputs {
        let destination = destination_for(&source, cli.output.as_deref());
        match extract_file(&source, &destination, &options) {
            Ok(report) => {
                if !cli.quiet {
                    print_report(&report);
                }
                failed |= !report.failures.is_empty();
            }
            Err(e) => {
                eprintln!("Error: {}: {}", source.display(), e);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn log_level_follows_flags() {
        let level = |args: &[&str]| Cli::try_parse_from(args).unwrap().log_level();
        assert_eq!(LevelFilter::WARN, level(&["h3res-extract", "a.lod"]));
        assert_eq!(LevelFilter::ERROR, level(&["h3res-extract", "-q", "a.lod"]));
        assert_eq!(LevelFilter::DEBUG, level(&["h3res-extract", "--verbose", "a.lod"]));
        assert!(Cli::try_parse_from(&["h3res-extract", "-q", "-v", "a.lod"]).is_err());
    }
}
