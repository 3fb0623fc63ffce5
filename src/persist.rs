use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use itertools::iproduct;
use json_pretty_compact::PrettyCompactFormatter;
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Serializer;

use crate::{
    common::{Hue, TILE_SIZE},
    tiled_image::{DecodeOutcome, TiledImage},
};

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    create_parent_dir(path)?;
    fs::write(path, &data_bytes)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = fs::read(path)?;
    let data: T = serde_json::from_slice(&data_bytes)?;
    Ok(data)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TileReport {
    pub path: PathBuf,
    pub result: DecodeOutcome,
    pub num_tiles: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiles: Option<Vec<Vec<Hue>>>,
}

impl TileReport {
    pub fn new(path: &Path, image: &TiledImage, include_hues: bool) -> Self {
        TileReport {
            path: path.to_owned(),
            result: image.result(),
            num_tiles: image.num_tiles(),
            tiles: include_hues.then(|| image.tiles().map(|t| t.to_vec()).collect()),
        }
    }
}

pub fn save_report_json(path: &Path, reports: &[TileReport]) -> Result<()> {
    save_json(path, &reports)
}

/// Lays the tiles out `tiles_per_row` wide as 8-bit gray pixels. Cells past
/// the last tile are white.
pub fn render_tile_sheet(image: &TiledImage, tiles_per_row: usize) -> Result<(usize, usize, Vec<u8>)> {
    ensure!(tiles_per_row > 0, "tiles per row must be positive");
    let num_tiles = image.num_tiles();
    ensure!(num_tiles > 0, "no tiles to render");

    let cols = tiles_per_row.min(num_tiles);
    let rows = num_tiles.div_ceil(cols);
    let (width, height) = (cols * TILE_SIZE, rows * TILE_SIZE);
    let mut pixels = vec![Hue::White.gray(); width * height];
    for (i, tile) in image.tiles().enumerate() {
        let (x0, y0) = ((i % cols) * TILE_SIZE, (i / cols) * TILE_SIZE);
        for (y, x) in iproduct!(0..TILE_SIZE, 0..TILE_SIZE) {
            pixels[(y0 + y) * width + x0 + x] = tile[y * TILE_SIZE + x].gray();
        }
    }
    Ok((width, height, pixels))
}

pub fn save_tiles_png(image: &TiledImage, path: &Path, tiles_per_row: usize) -> Result<()> {
    let (width, height, pixels) = render_tile_sheet(image, tiles_per_row)?;
    info!("Saving {}", path.display());
    create_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    writer.finish()?;
    Ok(())
}
