//! Indexed-color PNG encoding from first principles.
//!
//! A [`PngEncoder`] is one encoding session. It lays the whole file out in a
//! single zero-filled buffer when it is created:
//!
//! ```text
//! signature | IHDR | PLTE | tRNS | IDAT | IEND
//! ```
//!
//! The IDAT payload is a zlib stream made of stored (uncompressed) DEFLATE
//! blocks, so every pixel has a fixed byte position in the file and
//! [`PngEncoder::set_pixel`] is a single store. Checksums are filled in by
//! [`PngEncoder::encode`].

pub mod base64;
pub mod checksum;

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::raster::{buffer_len, BYTES_PER_PIXEL};
use crate::{Color, Error, Result};

use self::checksum::{crc32, Adler32};

/// PNG file signature
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Largest palette a PNG can carry at bit depth 8
pub const MAX_PALETTE_DEPTH: u16 = 256;

/// Prefix of the `data:` URL produced by [`PngEncoder::data_url`]
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

const IHDR_LEN: usize = 13;
const ZLIB_HEADER_LEN: usize = 2;
const BLOCK_HEADER_LEN: usize = 5;
const MAX_BLOCK_LEN: usize = 0xFFFF;
const ADLER_LEN: usize = 4;

const BIT_DEPTH: u8 = 8;
const COLOR_TYPE_INDEXED: u8 = 3;

// CMF: deflate with a 32K window; FLG: level 3, FCHECK makes it a multiple of 31
const fn zlib_header() -> u16 {
    let header: u16 = ((8 + (7 << 4)) << 8) | (3 << 6);
    header + 31 - (header % 31)
}

/// What `register_color` does once the palette is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteOverflow {
    /// Fail with `Error::PaletteExhausted`
    #[default]
    Error,
    /// Map the color to palette index 0, which the RGBA path reserves for
    /// full transparency
    Transparent,
}

#[derive(Debug, Clone, Copy)]
struct Chunk {
    offset: usize,
    len: usize,
}

impl Chunk {
    fn data(&self) -> usize {
        self.offset + 8
    }

    fn crc(&self) -> usize {
        self.data() + self.len
    }

    fn end(&self) -> usize {
        self.crc() + 4
    }
}

#[derive(Debug, Clone)]
struct Layout {
    ihdr: Chunk,
    plte: Chunk,
    trns: Chunk,
    idat: Chunk,
    iend: Chunk,
    /// filter byte + one index byte per pixel, per row
    raw_len: usize,
    blocks: usize,
}

impl Layout {
    fn new(width: u32, height: u32, depth: u16) -> Result<Self> {
        let too_large = || Error::ImageTooLarge { width, height };

        let raw_len = (height as u64)
            .checked_mul(width as u64 + 1)
            .ok_or_else(too_large)?;
        if raw_len > i32::MAX as u64 {
            return Err(too_large());
        }
        let blocks = raw_len.div_ceil(MAX_BLOCK_LEN as u64);
        let idat_len = ZLIB_HEADER_LEN as u64 + raw_len + BLOCK_HEADER_LEN as u64 * blocks + ADLER_LEN as u64;
        // chunk lengths are 31-bit in PNG
        if idat_len > i32::MAX as u64 {
            return Err(too_large());
        }

        let ihdr = Chunk { offset: SIGNATURE.len(), len: IHDR_LEN };
        let plte = Chunk { offset: ihdr.end(), len: 3 * depth as usize };
        let trns = Chunk { offset: plte.end(), len: depth as usize };
        let idat = Chunk { offset: trns.end(), len: idat_len as usize };
        let iend = Chunk { offset: idat.end(), len: 0 };

        Ok(Self {
            ihdr,
            plte,
            trns,
            idat,
            iend,
            raw_len: raw_len as usize,
            blocks: blocks as usize,
        })
    }

    fn total(&self) -> usize {
        self.iend.end()
    }

    fn chunks(&self) -> [(&'static [u8; 4], Chunk); 5] {
        [
            (b"IHDR", self.ihdr),
            (b"PLTE", self.plte),
            (b"tRNS", self.trns),
            (b"IDAT", self.idat),
            (b"IEND", self.iend),
        ]
    }

    /// File offset of raw stream byte `i`, skipping the zlib header and
    /// one 5-byte header per stored block up to and including i's block.
    fn raw_offset(&self, i: usize) -> usize {
        self.idat.data() + ZLIB_HEADER_LEN + BLOCK_HEADER_LEN * (i / MAX_BLOCK_LEN + 1) + i
    }

    /// (header offset, payload length, final) for every stored block
    fn block_spans(&self) -> impl Iterator<Item = (usize, usize, bool)> + '_ {
        (0..self.blocks).map(move |k| {
            let start = k * MAX_BLOCK_LEN;
            let len = (self.raw_len - start).min(MAX_BLOCK_LEN);
            let header = self.idat.data() + ZLIB_HEADER_LEN + k * (MAX_BLOCK_LEN + BLOCK_HEADER_LEN);
            (header, len, k + 1 == self.blocks)
        })
    }

    fn adler(&self) -> usize {
        self.idat.crc() - ADLER_LEN
    }
}

/// One PNG encoding session with its own palette.
///
/// ```
/// use linebench::{Color, encode::PngEncoder};
///
/// # fn main() -> linebench::Result<()> {
/// let mut png = PngEncoder::new(2, 1, 2)?;
/// let clear = png.register_color(Color::TRANSPARENT)?;
/// let red = png.register_color(Color::RED)?;
/// png.set_pixel(0, 0, red)?;
/// png.set_pixel(1, 0, clear)?;
/// let bytes = png.encode();
/// assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PngEncoder {
    width: u32,
    height: u32,
    depth: u16,
    layout: Layout,
    buffer: Vec<u8>,
    palette: HashMap<Color, u8>,
    next_index: u16,
}

impl PngEncoder {
    /// Lay out a `width` x `height` image with room for `depth` palette
    /// entries (1..=256). Every pixel starts at palette index 0.
    pub fn new(width: u32, height: u32, depth: u16) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if depth == 0 || depth > MAX_PALETTE_DEPTH {
            return Err(Error::InvalidPaletteDepth(depth));
        }

        let layout = Layout::new(width, height, depth)?;
        let mut encoder = Self {
            width,
            height,
            depth,
            buffer: vec![0; layout.total()],
            layout,
            palette: HashMap::new(),
            next_index: 0,
        };
        encoder.write_skeleton();
        debug!(
            "png session {}x{} depth {}: {} bytes, {} stored blocks",
            width,
            height,
            depth,
            encoder.buffer.len(),
            encoder.layout.blocks
        );
        Ok(encoder)
    }

    /// Build a session from an RGBA8 buffer: full transparency gets index 0,
    /// then every pixel's exact color is registered in row-major order.
    ///
    /// With `PaletteOverflow::Transparent` colors beyond the 256th become
    /// transparent; with `PaletteOverflow::Error` they fail the call.
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8], overflow: PaletteOverflow) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if rgba.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: rgba.len(),
            });
        }

        let mut png = Self::new(width, height, MAX_PALETTE_DEPTH)?;
        png.register_color(Color::TRANSPARENT)?;

        let mut dropped = 0usize;
        for (i, px) in rgba.chunks_exact(BYTES_PER_PIXEL).enumerate() {
            let color = Color::rgba(px[0], px[1], px[2], px[3]);
            let index = match png.register_color(color) {
                Ok(index) => index,
                Err(Error::PaletteExhausted { .. }) if overflow == PaletteOverflow::Transparent => {
                    dropped += 1;
                    0
                }
                Err(e) => return Err(e),
            };
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            png.set_pixel(x, y, index)?;
        }
        if dropped > 0 {
            warn!(
                "palette full: {} of {} pixels mapped to transparent",
                dropped,
                rgba.len() / BYTES_PER_PIXEL
            );
        }
        Ok(png)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Number of colors registered so far
    pub fn palette_len(&self) -> usize {
        self.next_index as usize
    }

    /// Registered colors in palette order
    pub fn palette(&self) -> Vec<Color> {
        let plte = self.layout.plte.data();
        let trns = self.layout.trns.data();
        (0..self.palette_len())
            .map(|i| {
                let rgb = &self.buffer[plte + 3 * i..plte + 3 * i + 3];
                Color::rgba(rgb[0], rgb[1], rgb[2], self.buffer[trns + i])
            })
            .collect()
    }

    /// Palette index for an exact RGBA quadruple, assigning the next free
    /// slot the first time a color is seen.
    pub fn register_color(&mut self, color: Color) -> Result<u8> {
        if let Some(&index) = self.palette.get(&color) {
            return Ok(index);
        }
        if self.next_index == self.depth {
            return Err(Error::PaletteExhausted { depth: self.depth });
        }

        let index = self.next_index as u8;
        let plte = self.layout.plte.data() + 3 * index as usize;
        self.buffer[plte] = color.r;
        self.buffer[plte + 1] = color.g;
        self.buffer[plte + 2] = color.b;
        self.buffer[self.layout.trns.data() + index as usize] = color.a;

        self.palette.insert(color, index);
        self.next_index += 1;
        Ok(index)
    }

    /// `register_color` with an explicit overflow policy
    pub fn register_color_or(&mut self, color: Color, overflow: PaletteOverflow) -> Result<u8> {
        match self.register_color(color) {
            Err(Error::PaletteExhausted { .. }) if overflow == PaletteOverflow::Transparent => Ok(0),
            other => other,
        }
    }

    /// Store a palette index for pixel (x, y)
    pub fn set_pixel(&mut self, x: u32, y: u32, index: u8) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::PixelOutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        if index as u16 >= self.depth {
            return Err(Error::InvalidPaletteIndex {
                index,
                depth: self.depth,
            });
        }
        let at = self.pixel_offset(x, y);
        self.buffer[at] = index;
        Ok(())
    }

    /// Palette index currently stored for pixel (x, y)
    pub fn pixel_index(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.buffer[self.pixel_offset(x, y)])
    }

    /// Finish the checksums and return the complete PNG file.
    ///
    /// Safe to call repeatedly: checksums are recomputed from the current
    /// contents, so encoding twice without changes yields identical bytes.
    pub fn encode(&mut self) -> Vec<u8> {
        self.finalize();
        self.buffer.clone()
    }

    /// [`encode`](Self::encode), Base64-encoded
    pub fn encode_base64(&mut self) -> String {
        self.finalize();
        self::base64::encode(&self.buffer)
    }

    /// `data:image/png;base64,...`
    pub fn data_url(&mut self) -> String {
        let mut url = String::from(DATA_URL_PREFIX);
        url.push_str(&self.encode_base64());
        url
    }

    fn pixel_offset(&self, x: u32, y: u32) -> usize {
        let i = y as usize * (self.width as usize + 1) + x as usize + 1;
        self.layout.raw_offset(i)
    }

    fn write_skeleton(&mut self) {
        self.buffer[..SIGNATURE.len()].copy_from_slice(&SIGNATURE);

        for (tag, chunk) in self.layout.chunks() {
            let at = chunk.offset;
            self.buffer[at..at + 4].copy_from_slice(&(chunk.len as u32).to_be_bytes());
            self.buffer[at + 4..at + 8].copy_from_slice(tag);
        }

        // IHDR: width, height, bit depth, color type; compression, filter
        // and interlace methods stay 0
        let ihdr = self.layout.ihdr.data();
        self.buffer[ihdr..ihdr + 4].copy_from_slice(&self.width.to_be_bytes());
        self.buffer[ihdr + 4..ihdr + 8].copy_from_slice(&self.height.to_be_bytes());
        self.buffer[ihdr + 8] = BIT_DEPTH;
        self.buffer[ihdr + 9] = COLOR_TYPE_INDEXED;

        let zlib = self.layout.idat.data();
        self.buffer[zlib..zlib + ZLIB_HEADER_LEN].copy_from_slice(&zlib_header().to_be_bytes());

        for (at, len, last) in self.layout.block_spans() {
            let len = len as u16;
            self.buffer[at] = last as u8;
            self.buffer[at + 1..at + 3].copy_from_slice(&len.to_le_bytes());
            self.buffer[at + 3..at + 5].copy_from_slice(&(!len).to_le_bytes());
        }
    }

    fn finalize(&mut self) {
        let mut adler = Adler32::new();
        for (at, len, _) in self.layout.block_spans() {
            let start = at + BLOCK_HEADER_LEN;
            adler.update_slice(&self.buffer[start..start + len]);
        }
        let at = self.layout.adler();
        self.buffer[at..at + ADLER_LEN].copy_from_slice(&adler.finish().to_be_bytes());

        for (_, chunk) in self.layout.chunks() {
            let crc = crc32(&self.buffer[chunk.offset + 4..chunk.crc()]);
            let at = chunk.crc();
            self.buffer[at..at + 4].copy_from_slice(&crc.to_be_bytes());
        }
    }
}
