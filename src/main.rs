use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use clap::Parser;
use log::warn;

use gb_tile_decoder::{
    persist::{self, TileReport},
    DecodeOutcome, DecoderConfig, TiledImage,
};

/// Decode .2bpp, .2bpp.lz and grayscale .png tile graphics.
#[derive(Parser, Debug)]
struct Args {
    /// Graphics files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Decoder config (JSON); defaults to the per-user config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum number of tiles per input
    #[arg(long)]
    max_tiles: Option<usize>,

    /// Write a PNG tile sheet for each decoded input into this directory
    #[arg(long)]
    png_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 16)]
    tiles_per_row: usize,

    /// Write a JSON report of all inputs
    #[arg(long)]
    report: Option<PathBuf>,

    /// Include per-tile hues in the report
    #[arg(long)]
    hues: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = vec![];
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(pattern));
            continue;
        }
        let start = paths.len();
        for entry in glob::glob(pattern)? {
            paths.push(entry?);
        }
        if paths.len() == start {
            warn!("{}: no matching files", pattern);
        }
    }
    Ok(paths)
}

// Keeps the whole input name so `a.png`, `a.2bpp` and `a.2bpp.lz` get
// distinct sheets and an input is never overwritten by its own sheet.
fn sheet_path(dir: &Path, input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tiles".to_string());
    dir.join(format!("{}.png", name))
}

// A failed sheet is logged so the remaining inputs and the report still get written.
fn save_sheet(image: &TiledImage, dir: &Path, input: &Path, tiles_per_row: usize) -> bool {
    let out = sheet_path(dir, input);
    match persist::save_tiles_png(image, &out, tiles_per_row) {
        Ok(()) => true,
        Err(err) => {
            warn!("{}: {:#}", out.display(), err);
            false
        }
    }
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = DecoderConfig::load_or_default(args.config.as_deref())?;
    if let Some(max_tiles) = args.max_tiles {
        config.max_tiles = max_tiles;
        config.validate()?;
    }

    let mut reports = vec![];
    let mut failures = 0;
    for path in expand_inputs(&args.inputs)? {
        let image = TiledImage::open(&path, &config);
        println!(
            "{}: {} ({} tiles)",
            path.display(),
            image.result(),
            image.num_tiles()
        );
        match image.result() {
            DecodeOutcome::Ok if image.num_tiles() > 0 => {
                if let Some(dir) = &args.png_dir {
                    if !save_sheet(&image, dir, &path, args.tiles_per_row) {
                        failures += 1;
                    }
                }
            }
            DecodeOutcome::Ok => {}
            DecodeOutcome::Null => warn!("{}: not a recognized graphics file", path.display()),
            result => {
                warn!("{}: {}", path.display(), result);
                failures += 1;
            }
        }
        reports.push(TileReport::new(&path, &image, args.hues));
    }

    if let Some(report) = &args.report {
        persist::save_report_json(report, &reports)?;
    }
    ensure!(
        failures == 0,
        "{} of {} inputs failed",
        failures,
        reports.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_tile_image() -> TiledImage {
        let mut image = TiledImage::new();
        image.read_2bpp_bytes(&[0xFF; 16], &DecoderConfig::default());
        image
    }

    #[test]
    fn test_save_sheet_reports_failure() {
        let dir = std::env::temp_dir().join("gb_tile_decoder_main_sheets");
        let image = one_tile_image();
        assert!(!save_sheet(&image, &dir, Path::new("a.2bpp"), 0));
        assert!(!save_sheet(&TiledImage::new(), &dir, Path::new("b.2bpp"), 16));

        assert!(save_sheet(&image, &dir, Path::new("c.2bpp"), 16));
        assert!(dir.join("c.2bpp.png").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sheet_path_never_matches_input() {
        let input = Path::new("gfx/a.png");
        let out = sheet_path(Path::new("gfx"), input);
        assert_ne!(out, input);
        assert_eq!(out, Path::new("gfx/a.png.png"));
    }

    #[test]
    fn test_sheet_paths_are_distinct_per_format() {
        let dir = Path::new("out");
        let raw = sheet_path(dir, Path::new("gfx/a.2bpp"));
        let lz = sheet_path(dir, Path::new("gfx/a.2bpp.lz"));
        let png = sheet_path(dir, Path::new("gfx/a.png"));
        assert_eq!(raw, Path::new("out/a.2bpp.png"));
        assert_eq!(lz, Path::new("out/a.2bpp.lz.png"));
        assert_ne!(raw, png);
        assert_ne!(lz, png);
    }
}
