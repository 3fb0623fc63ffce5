//! Tiled graphics from raster images.
//!
//! Loading and grayscale reduction sit behind [`RasterLoader`] and
//! [`RasterImage`] so the tile decoding can run on in-memory pixels.

use std::{fs::File, io, path::Path};

use itertools::iproduct;
use log::debug;

use crate::{
    common::{Hue, TILE_AREA, TILE_SIZE},
    tiled_image::DecodeError,
};

pub trait HueQuantizer {
    fn hue(&self, luma: u8) -> Hue;
}

/// Splits the luminance range at three descending thresholds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MonoQuantizer {
    thresholds: [u8; 3],
}

impl MonoQuantizer {
    pub const DEFAULT_THRESHOLDS: [u8; 3] = [0xC0, 0x80, 0x40];

    pub fn new(thresholds: [u8; 3]) -> Self {
        MonoQuantizer { thresholds }
    }
}

impl Default for MonoQuantizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLDS)
    }
}

impl HueQuantizer for MonoQuantizer {
    fn hue(&self, luma: u8) -> Hue {
        let [white, light, dark] = self.thresholds;
        if luma >= white {
            Hue::White
        } else if luma >= light {
            Hue::Light
        } else if luma >= dark {
            Hue::Dark
        } else {
            Hue::Black
        }
    }
}

pub trait RasterImage {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Reduces color channels to luminance. Alpha is kept.
    fn desaturate(&mut self);
    fn channels(&self) -> usize;
    /// Row-major pixels, `channels()` bytes each.
    fn pixels(&self) -> &[u8];
}

pub trait RasterLoader {
    fn load(&self, path: &Path) -> io::Result<Box<dyn RasterImage>>;
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
}

/// 8-bit pixels held in memory.
#[derive(Clone, Debug)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    channels: usize,
    pixels: Vec<u8>,
}

impl MemoryRaster {
    pub fn new(width: usize, height: usize, channels: usize, pixels: Vec<u8>) -> Self {
        MemoryRaster {
            width,
            height,
            channels,
            pixels,
        }
    }

    pub fn gray(width: usize, height: usize, pixels: Vec<u8>) -> Self {
        Self::new(width, height, 1, pixels)
    }
}

impl RasterImage for MemoryRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn desaturate(&mut self) {
        let keep_alpha = match self.channels {
            3 => false,
            4 => true,
            _ => return,
        };
        self.pixels = self
            .pixels
            .chunks_exact(self.channels)
            .flat_map(|p| {
                let y = luma(p[0], p[1], p[2]);
                if keep_alpha {
                    vec![y, p[3]]
                } else {
                    vec![y]
                }
            })
            .collect();
        self.channels = if keep_alpha { 2 } else { 1 };
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Loads PNG files, normalized to 8 bits per sample.
#[derive(Copy, Clone, Debug, Default)]
pub struct PngLoader;

impl RasterLoader for PngLoader {
    fn load(&self, path: &Path) -> io::Result<Box<dyn RasterImage>> {
        let mut decoder = png::Decoder::new(File::open(path)?);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().map_err(io::Error::other)?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).map_err(io::Error::other)?;
        buf.truncate(info.buffer_size());
        debug!(
            "{}: {}x{} {:?}",
            path.display(),
            info.width,
            info.height,
            info.color_type
        );
        Ok(Box::new(MemoryRaster::new(
            info.width as usize,
            info.height as usize,
            info.color_type.samples(),
            buf,
        )))
    }
}

/// Cuts a grayscale image into tiles, left to right then top to bottom, and
/// quantizes each pixel to a hue.
pub fn decode_raster(
    image: &mut dyn RasterImage,
    quantizer: &dyn HueQuantizer,
    max_tiles: usize,
) -> Result<Vec<Hue>, DecodeError> {
    let (w, h) = (image.width(), image.height());
    if w % TILE_SIZE != 0 || h % TILE_SIZE != 0 {
        return Err(DecodeError::BadDimensions);
    }

    let (tiles_w, tiles_h) = (w / TILE_SIZE, h / TILE_SIZE);
    if tiles_w * tiles_h > max_tiles {
        return Err(DecodeError::TooLarge);
    }

    image.desaturate();
    if image.channels() != 1 {
        return Err(DecodeError::NotGrayscale);
    }

    let pixels = image.pixels();
    if pixels.len() < w * h {
        return Err(DecodeError::BadFile);
    }

    let mut hues = Vec::with_capacity(tiles_w * tiles_h * TILE_AREA);
    for (y, x) in iproduct!(0..tiles_h, 0..tiles_w) {
        for (ty, tx) in iproduct!(0..TILE_SIZE, 0..TILE_SIZE) {
            let i = (y * TILE_SIZE + ty) * w + x * TILE_SIZE + tx;
            hues.push(quantizer.hue(pixels[i]));
        }
    }
    Ok(hues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufWriter;

    fn write_png(path: &Path, width: u32, height: u32, color: png::ColorType, data: &[u8]) {
        let file = File::create(path).unwrap();
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }

    #[test]
    fn test_mono_quantizer() {
        let q = MonoQuantizer::default();
        assert_eq!(q.hue(0xFF), Hue::White);
        assert_eq!(q.hue(0xC0), Hue::White);
        assert_eq!(q.hue(0xBF), Hue::Light);
        assert_eq!(q.hue(0x80), Hue::Light);
        assert_eq!(q.hue(0x7F), Hue::Dark);
        assert_eq!(q.hue(0x40), Hue::Dark);
        assert_eq!(q.hue(0x3F), Hue::Black);
        assert_eq!(q.hue(0x00), Hue::Black);
    }

    #[test]
    fn test_tile_order() {
        // 16x8: left tile black, right tile white.
        let mut pixels = vec![0u8; 16 * 8];
        for row in pixels.chunks_exact_mut(16) {
            row[8..].fill(0xFF);
        }
        let mut image = MemoryRaster::gray(16, 8, pixels);
        let hues = decode_raster(&mut image, &MonoQuantizer::default(), 4).unwrap();
        assert_eq!(hues.len(), 2 * TILE_AREA);
        assert!(hues[..TILE_AREA].iter().all(|&h| h == Hue::Black));
        assert!(hues[TILE_AREA..].iter().all(|&h| h == Hue::White));
    }

    #[test]
    fn test_pixel_order_within_tile() {
        // 8x16: pixel (x, y) of the second tile lands at 64 + y * 8 + x.
        let mut pixels = vec![0xFFu8; 8 * 16];
        pixels[9 * 8 + 2] = 0x00;
        let mut image = MemoryRaster::gray(8, 16, pixels);
        let hues = decode_raster(&mut image, &MonoQuantizer::default(), 4).unwrap();
        assert_eq!(hues[TILE_AREA + 8 + 2], Hue::Black);
        assert_eq!(hues.iter().filter(|&&h| h == Hue::Black).count(), 1);
    }

    #[test]
    fn test_bad_dimensions() {
        let mut image = MemoryRaster::gray(12, 8, vec![0; 12 * 8]);
        assert_eq!(
            decode_raster(&mut image, &MonoQuantizer::default(), 4),
            Err(DecodeError::BadDimensions)
        );
    }

    #[test]
    fn test_too_large() {
        let mut image = MemoryRaster::gray(24, 8, vec![0; 24 * 8]);
        assert_eq!(
            decode_raster(&mut image, &MonoQuantizer::default(), 2),
            Err(DecodeError::TooLarge)
        );
    }

    #[test]
    fn test_rgb_is_desaturated() {
        let pixels: Vec<u8> = [0xFF, 0xFF, 0xFF].repeat(64);
        let mut image = MemoryRaster::new(8, 8, 3, pixels);
        let hues = decode_raster(&mut image, &MonoQuantizer::default(), 1).unwrap();
        assert!(hues.iter().all(|&h| h == Hue::White));
        assert_eq!(image.channels(), 1);
    }

    #[test]
    fn test_alpha_is_not_grayscale() {
        let mut image = MemoryRaster::new(8, 8, 4, vec![0xFF; 64 * 4]);
        assert_eq!(
            decode_raster(&mut image, &MonoQuantizer::default(), 1),
            Err(DecodeError::NotGrayscale)
        );
        let mut image = MemoryRaster::new(8, 8, 2, vec![0xFF; 64 * 2]);
        assert_eq!(
            decode_raster(&mut image, &MonoQuantizer::default(), 1),
            Err(DecodeError::NotGrayscale)
        );
    }

    #[test]
    fn test_png_loader_gray() {
        let path = std::env::temp_dir().join("gb_tile_decoder_raster_gray.png");
        let pixels: Vec<u8> = (0..64).map(|i| if i < 32 { 0x00 } else { 0xAA }).collect();
        write_png(&path, 8, 8, png::ColorType::Grayscale, &pixels);

        let mut image = PngLoader.load(&path).unwrap();
        assert_eq!((image.width(), image.height(), image.channels()), (8, 8, 1));
        let hues = decode_raster(image.as_mut(), &MonoQuantizer::default(), 1).unwrap();
        assert!(hues[..32].iter().all(|&h| h == Hue::Black));
        assert!(hues[32..].iter().all(|&h| h == Hue::Light));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_png_loader_rgba() {
        let path = std::env::temp_dir().join("gb_tile_decoder_raster_rgba.png");
        write_png(&path, 8, 8, png::ColorType::Rgba, &[0x80; 64 * 4]);

        let mut image = PngLoader.load(&path).unwrap();
        assert_eq!(image.channels(), 4);
        assert_eq!(
            decode_raster(image.as_mut(), &MonoQuantizer::default(), 1),
            Err(DecodeError::NotGrayscale)
        );
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_png_loader_missing_file() {
        let path = std::env::temp_dir().join("gb_tile_decoder_does_not_exist.png");
        assert!(PngLoader.load(&path).is_err());
    }
}
