//! Conversion of packed 2bpp tile data into hues.
//!
//! Each 8-pixel row is two bytes: the low bit plane then the high bit plane,
//! most significant bit leftmost. A tile is 8 such rows.

use crate::{
    common::{Hue, BYTES_PER_2BPP_TILE, TILE_SIZE},
    tiled_image::DecodeError,
};

// %ABCD_EFGH %abcd_efgh -> %aA %bB %cC %dD %eE %fF %gG %hH
pub fn convert_2bytes_to_8hues(low: u8, high: u8) -> [Hue; TILE_SIZE] {
    let mut hues = [Hue::White; TILE_SIZE];
    for (i, hue) in hues.iter_mut().enumerate() {
        let j = 7 - i;
        *hue = Hue::from_bits((high >> j & 1) << 1 | (low >> j & 1));
    }
    hues
}

/// Raw 2bpp files must hold a whole number of tiles.
pub fn check_2bpp_len(len: usize) -> Result<(), DecodeError> {
    if len % BYTES_PER_2BPP_TILE != 0 {
        return Err(DecodeError::BadDimensions);
    }
    Ok(())
}

pub fn num_2bpp_tiles(len: usize) -> usize {
    len / BYTES_PER_2BPP_TILE
}

/// Decodes every whole tile in `data`. A trailing partial tile is dropped.
pub fn parse_2bpp(data: &[u8], max_tiles: usize) -> Result<Vec<Hue>, DecodeError> {
    let num_tiles = num_2bpp_tiles(data.len());
    if num_tiles > max_tiles {
        return Err(DecodeError::TooLarge);
    }
    Ok(data[..num_tiles * BYTES_PER_2BPP_TILE]
        .chunks_exact(2)
        .flat_map(|row| convert_2bytes_to_8hues(row[0], row[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TILE_AREA;

    #[test]
    fn test_row_bit_mapping() {
        let hues = convert_2bytes_to_8hues(0b1010_0000, 0b1100_0000);
        assert_eq!(
            hues,
            [
                Hue::Black,
                Hue::Dark,
                Hue::Light,
                Hue::White,
                Hue::White,
                Hue::White,
                Hue::White,
                Hue::White
            ]
        );
        assert_eq!(convert_2bytes_to_8hues(0x01, 0x00)[7], Hue::Light);
        assert_eq!(convert_2bytes_to_8hues(0x00, 0x01)[7], Hue::Dark);
    }

    #[test]
    fn test_single_tile() {
        let mut data = [0u8; 16];
        // Row 0 all black, row 7 all light.
        data[0] = 0xFF;
        data[1] = 0xFF;
        data[14] = 0xFF;
        let hues = parse_2bpp(&data, 1).unwrap();
        assert_eq!(hues.len(), TILE_AREA);
        assert!(hues[0..8].iter().all(|&h| h == Hue::Black));
        assert!(hues[8..56].iter().all(|&h| h == Hue::White));
        assert!(hues[56..64].iter().all(|&h| h == Hue::Light));
    }

    #[test]
    fn test_tiles_in_order() {
        let mut data = vec![0u8; 32];
        data[16..].fill(0xFF);
        let hues = parse_2bpp(&data, 2).unwrap();
        assert_eq!(hues.len(), 2 * TILE_AREA);
        assert!(hues[..TILE_AREA].iter().all(|&h| h == Hue::White));
        assert!(hues[TILE_AREA..].iter().all(|&h| h == Hue::Black));
    }

    #[test]
    fn test_partial_tile_truncated() {
        let data = vec![0xFFu8; 16 + 7];
        assert_eq!(parse_2bpp(&data, 4).unwrap().len(), TILE_AREA);
        assert_eq!(parse_2bpp(&data[..15], 4).unwrap().len(), 0);
    }

    #[test]
    fn test_too_many_tiles() {
        let data = vec![0u8; 16 * 3];
        assert_eq!(parse_2bpp(&data, 2), Err(DecodeError::TooLarge));
        assert!(parse_2bpp(&data, 3).is_ok());
    }

    #[test]
    fn test_check_len() {
        assert!(check_2bpp_len(0).is_ok());
        assert!(check_2bpp_len(48).is_ok());
        assert_eq!(check_2bpp_len(17), Err(DecodeError::BadDimensions));
    }
}
