//! Decompression of LZ-packed 2bpp graphics.
//!
//! Each command byte holds a control code in bits 5-7 and a length in bits
//! 0-4 (stored minus one). Control code 7 is an escape: bits 2-4 then hold
//! the real code and bits 0-1 become bits 8-9 of a 10-bit length whose low
//! byte follows. A `0xFF` byte in command position ends the stream.

use log::debug;

use crate::tiled_image::DecodeError;

pub const LZ_END: u8 = 0xFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LzCommand {
    Literal,   // n values for n bytes
    Iterate,   // one value for n bytes
    Alternate, // two values alternating for n bytes
    Blank,     // zero for n bytes
    Repeat,    // n bytes of earlier output
    Flip,      // n bytes of earlier output, bit order reversed
    Reverse,   // n bytes of earlier output, read backwards
    Long,      // 10-bit length escape
}

impl LzCommand {
    fn from_bits(bits: u8) -> Self {
        match bits & 7 {
            0 => LzCommand::Literal,
            1 => LzCommand::Iterate,
            2 => LzCommand::Alternate,
            3 => LzCommand::Blank,
            4 => LzCommand::Repeat,
            5 => LzCommand::Flip,
            6 => LzCommand::Reverse,
            _ => LzCommand::Long,
        }
    }
}

// BIT_FLIPPED[b] has bit 7 of b in bit 0, bit 6 in bit 1, and so on.
static BIT_FLIPPED: [u8; 256] = bit_flipped_table();

const fn bit_flipped_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = (i as u8).reverse_bits();
        i += 1;
    }
    table
}

struct LzReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> LzReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        LzReader { data, pos: 0 }
    }

    // Running out of input before the end marker counts as a short read.
    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let b = *self.data.get(self.pos).ok_or(DecodeError::BadFile)?;
        self.pos += 1;
        Ok(b)
    }

    fn read_n(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::BadFile)?;
        let bytes = self.data.get(self.pos..end).ok_or(DecodeError::BadFile)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Reads the start of a back-reference. A byte with the high bit set is a
    /// distance back from `marker`; otherwise it is the high byte of a
    /// big-endian absolute position in the output.
    fn read_offset(&mut self, marker: usize) -> Result<usize, DecodeError> {
        let b = self.read_u8()?;
        if b >= 0x80 {
            marker
                .checked_sub((b & 0x7F) as usize + 1)
                .ok_or(DecodeError::BadCommand)
        } else {
            Ok((b as usize) << 8 | self.read_u8()? as usize)
        }
    }
}

/// Expands `data` into raw 2bpp bytes. `capacity` bounds the output size;
/// a command that would take the output past it fails with `TooLarge`.
pub fn decompress(data: &[u8], capacity: usize) -> Result<Vec<u8>, DecodeError> {
    let mut input = LzReader::new(data);
    let mut out: Vec<u8> = Vec::new();
    loop {
        let byte = input.read_u8()?;
        if byte == LZ_END {
            debug!("LZ end marker at 0x{:X}, {} bytes out", input.pos - 1, out.len());
            return Ok(out);
        }

        let mut cmd = LzCommand::from_bits(byte >> 5);
        let length = if cmd == LzCommand::Long {
            cmd = LzCommand::from_bits(byte >> 2);
            if cmd == LzCommand::Long {
                debug!("nested long command 0x{:02X} at 0x{:X}", byte, input.pos - 1);
                return Err(DecodeError::BadCommand);
            }
            (((byte & 3) as usize) << 8 | input.read_u8()? as usize) + 1
        } else {
            (byte & 0x1F) as usize + 1
        };

        if out.len() + length > capacity {
            debug!(
                "{:?} of {} bytes at output 0x{:X} exceeds capacity {}",
                cmd,
                length,
                out.len(),
                capacity
            );
            return Err(DecodeError::TooLarge);
        }

        match cmd {
            LzCommand::Literal => {
                out.extend_from_slice(input.read_n(length)?);
            }
            LzCommand::Iterate => {
                let value = input.read_u8()?;
                out.resize(out.len() + length, value);
            }
            LzCommand::Alternate => {
                let pair = [input.read_u8()?, input.read_u8()?];
                out.extend((0..length).map(|i| pair[i & 1]));
            }
            LzCommand::Blank => {
                out.resize(out.len() + length, 0);
            }
            LzCommand::Repeat | LzCommand::Flip => {
                let offset = input.read_offset(out.len())?;
                if offset >= out.len() {
                    return Err(DecodeError::BadCommand);
                }
                // The source may overlap what this command writes, so copy
                // one byte at a time.
                for i in offset..(offset + length) {
                    let b = out[i];
                    out.push(if cmd == LzCommand::Flip { BIT_FLIPPED[b as usize] } else { b });
                }
            }
            LzCommand::Reverse => {
                let offset = input.read_offset(out.len())?;
                if offset >= out.len() || offset + 1 < length {
                    return Err(DecodeError::BadCommand);
                }
                for i in 0..length {
                    out.push(out[offset - i]);
                }
            }
            LzCommand::Long => return Err(DecodeError::BadCommand),
        }
    }
}
