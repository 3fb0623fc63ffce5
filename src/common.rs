use serde_repr::{Deserialize_repr, Serialize_repr};

pub const TILE_SIZE: usize = 8; // Tile edge in pixels
pub const TILE_AREA: usize = TILE_SIZE * TILE_SIZE;
pub const BYTES_PER_2BPP_TILE: usize = TILE_SIZE * 2; // Two bit planes per row
pub const MAX_NUM_TILES: usize = 256;

/// A 2-bit color index. The names describe the usual monochrome rendering
/// only; mapping a hue to an actual color happens downstream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Hue {
    #[default]
    White = 0,
    Light = 1,
    Dark = 2,
    Black = 3,
}

impl Hue {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Hue::White,
            1 => Hue::Light,
            2 => Hue::Dark,
            _ => Hue::Black,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    // Gray level used when dumping hues as an image.
    pub fn gray(self) -> u8 {
        match self {
            Hue::White => 0xFF,
            Hue::Light => 0xAA,
            Hue::Dark => 0x55,
            Hue::Black => 0x00,
        }
    }
}
