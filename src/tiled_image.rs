//! Decoded tile sets and the dispatch from file name to decoder.
//!
//! [`TiledImage`] owns the hues of the last successful decode and the
//! [`DecodeOutcome`] of the last attempt.

use std::{
    fmt::Display,
    fs, io,
    path::Path,
};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    common::{Hue, TILE_AREA, TILE_SIZE},
    config::DecoderConfig,
    lz, planar,
    raster::{self, HueQuantizer, PngLoader, RasterImage, RasterLoader},
};

/// Result of the last decode attempt on a [`TiledImage`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecodeOutcome {
    Ok,
    Null,
    BadFile,
    BadDimensions,
    TooLarge,
    NotGrayscale,
    BadCommand,
}

impl DecodeOutcome {
    // Display and DecodeError's Display both use these.
    pub fn message(self) -> &'static str {
        match self {
            DecodeOutcome::Ok => "OK",
            DecodeOutcome::Null => "No graphics decoded",
            DecodeOutcome::BadFile => "Cannot read file",
            DecodeOutcome::BadDimensions => "Dimensions are not a multiple of the tile size",
            DecodeOutcome::TooLarge => "Too many tiles",
            DecodeOutcome::NotGrayscale => "Image is not grayscale",
            DecodeOutcome::BadCommand => "Invalid LZ command",
        }
    }
}

impl Display for DecodeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// The failing subset of [`DecodeOutcome`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecodeError {
    BadFile,
    BadDimensions,
    TooLarge,
    NotGrayscale,
    BadCommand,
}

impl From<DecodeError> for DecodeOutcome {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::BadFile => DecodeOutcome::BadFile,
            DecodeError::BadDimensions => DecodeOutcome::BadDimensions,
            DecodeError::TooLarge => DecodeOutcome::TooLarge,
            DecodeError::NotGrayscale => DecodeOutcome::NotGrayscale,
            DecodeError::BadCommand => DecodeOutcome::BadCommand,
        }
    }
}

// Missing files and short reads are not told apart.
impl From<io::Error> for DecodeError {
    fn from(_: io::Error) -> Self {
        DecodeError::BadFile
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(DecodeOutcome::from(*self).message())
    }
}

impl std::error::Error for DecodeError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GraphicsFormat {
    Lz2bpp,
    Raw2bpp,
    Png,
}

impl GraphicsFormat {
    /// Picks a format from the file name suffix, ignoring ASCII case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
        // ".2bpp.lz" has to be tested before ".2bpp".
        if name.ends_with(".2bpp.lz") {
            Some(GraphicsFormat::Lz2bpp)
        } else if name.ends_with(".2bpp") {
            Some(GraphicsFormat::Raw2bpp)
        } else if name.ends_with(".png") {
            Some(GraphicsFormat::Png)
        } else {
            None
        }
    }
}

/// A set of 8x8 tiles, stored as one hue per pixel, tile after tile.
///
/// A failed decode keeps the previous tiles, with one exception: once data
/// reaches the shared 2bpp parsing step the old tiles are dropped before the
/// tile count is checked, so a `TooLarge` from that step leaves the set
/// empty.
#[derive(Clone, Debug)]
pub struct TiledImage {
    hues: Vec<Hue>,
    result: DecodeOutcome,
}

impl Default for TiledImage {
    fn default() -> Self {
        Self::new()
    }
}

impl TiledImage {
    pub fn new() -> Self {
        TiledImage {
            hues: Vec::new(),
            result: DecodeOutcome::Null,
        }
    }

    pub fn open(path: &Path, config: &DecoderConfig) -> Self {
        let mut image = Self::new();
        image.read_graphics(path, config);
        image
    }

    pub fn result(&self) -> DecodeOutcome {
        self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result == DecodeOutcome::Ok
    }

    pub fn num_tiles(&self) -> usize {
        self.hues.len() / TILE_AREA
    }

    pub fn hues(&self) -> &[Hue] {
        &self.hues
    }

    pub fn tile(&self, i: usize) -> Option<&[Hue]> {
        let start = i.checked_mul(TILE_AREA)?;
        self.hues.get(start..start.checked_add(TILE_AREA)?)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &[Hue]> {
        self.hues.chunks_exact(TILE_AREA)
    }

    pub fn hue_at(&self, tile: usize, x: usize, y: usize) -> Option<Hue> {
        if x >= TILE_SIZE || y >= TILE_SIZE {
            return None;
        }
        self.tile(tile).map(|t| t[y * TILE_SIZE + x])
    }

    pub fn read_graphics(&mut self, path: &Path, config: &DecoderConfig) -> DecodeOutcome {
        self.read_graphics_with(&PngLoader, path, config)
    }

    /// Decodes `path` according to its suffix. Unknown suffixes decode
    /// nothing and report `Null`.
    pub fn read_graphics_with(
        &mut self,
        loader: &dyn RasterLoader,
        path: &Path,
        config: &DecoderConfig,
    ) -> DecodeOutcome {
        match GraphicsFormat::from_path(path) {
            Some(GraphicsFormat::Lz2bpp) => self.read_lz_graphics(path, config),
            Some(GraphicsFormat::Raw2bpp) => self.read_2bpp_graphics(path, config),
            Some(GraphicsFormat::Png) => self.read_png_graphics_with(loader, path, config),
            None => {
                debug!("{}: unrecognized graphics suffix", path.display());
                self.result = DecodeOutcome::Null;
                self.result
            }
        }
    }

    pub fn read_png_graphics(&mut self, path: &Path, config: &DecoderConfig) -> DecodeOutcome {
        self.read_png_graphics_with(&PngLoader, path, config)
    }

    pub fn read_png_graphics_with(
        &mut self,
        loader: &dyn RasterLoader,
        path: &Path,
        config: &DecoderConfig,
    ) -> DecodeOutcome {
        info!("Loading {}", path.display());
        match loader.load(path) {
            Ok(mut image) => self.read_raster(image.as_mut(), &config.quantizer(), config.max_tiles),
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                self.finish(Err(DecodeError::BadFile))
            }
        }
    }

    pub fn read_raster(
        &mut self,
        image: &mut dyn RasterImage,
        quantizer: &dyn HueQuantizer,
        max_tiles: usize,
    ) -> DecodeOutcome {
        let result = raster::decode_raster(image, quantizer, max_tiles).map(|hues| {
            self.hues = hues;
        });
        self.finish(result)
    }

    pub fn read_2bpp_graphics(&mut self, path: &Path, config: &DecoderConfig) -> DecodeOutcome {
        info!("Loading {}", path.display());
        match fs::read(path) {
            Ok(data) => self.read_2bpp_bytes(&data, config),
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                self.finish(Err(err.into()))
            }
        }
    }

    pub fn read_2bpp_bytes(&mut self, data: &[u8], config: &DecoderConfig) -> DecodeOutcome {
        let result = planar::check_2bpp_len(data.len())
            .and_then(|()| self.parse_2bpp_data(data, config.max_tiles));
        self.finish(result)
    }

    pub fn read_lz_graphics(&mut self, path: &Path, config: &DecoderConfig) -> DecodeOutcome {
        info!("Loading {}", path.display());
        match fs::read(path) {
            Ok(data) => self.read_lz_bytes(&data, config),
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                self.finish(Err(err.into()))
            }
        }
    }

    pub fn read_lz_bytes(&mut self, data: &[u8], config: &DecoderConfig) -> DecodeOutcome {
        let result = lz::decompress(data, config.capacity_bytes()).and_then(|twobpp| {
            debug!("decompressed {} bytes to {}", data.len(), twobpp.len());
            self.parse_2bpp_data(&twobpp, config.max_tiles)
        });
        self.finish(result)
    }

    fn parse_2bpp_data(&mut self, data: &[u8], max_tiles: usize) -> Result<(), DecodeError> {
        self.hues = Vec::new();
        self.hues = planar::parse_2bpp(data, max_tiles)?;
        Ok(())
    }

    fn finish(&mut self, result: Result<(), DecodeError>) -> DecodeOutcome {
        self.result = match result {
            Ok(()) => DecodeOutcome::Ok,
            Err(err) => err.into(),
        };
        info!("{} ({} tiles)", self.result, self.num_tiles());
        self.result
    }
}
