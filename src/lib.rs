//! Decoding of Game Boy style tile graphics into 2-bit hues.
//!
//! Three inputs are understood: raw 2bpp tile data (`.2bpp`), LZ-compressed
//! 2bpp data (`.2bpp.lz`) and grayscale images (`.png`). All of them end up
//! in a [`TiledImage`]: one [`Hue`] per pixel, 64 per 8x8 tile.

pub mod common;
pub mod config;
pub mod lz;
pub mod persist;
pub mod planar;
pub mod raster;
pub mod tiled_image;

pub use common::Hue;
pub use config::DecoderConfig;
pub use tiled_image::{DecodeError, DecodeOutcome, GraphicsFormat, TiledImage};
