//! Line rasterization into flat RGBA8 buffers
//!
//! Two interchangeable line algorithms share a single blend primitive:
//!
//! - [`bresenham`]: aliased integer stepping, one pixel per step
//! - [`wu`]: Xiaolin Wu anti-aliasing, two coverage-weighted pixels per step
//!
//! Buffers are row-major, 4 bytes per pixel in R, G, B, A order. The
//! rasterizer never owns pixel memory: it draws through a [`Canvas`] that
//! borrows the caller's bytes.

pub mod blend;
pub mod bresenham;
pub mod wu;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bytes per RGBA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// An 8-bit straight-alpha RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

/// Integer pixel coordinate. May lie outside the target buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// A line segment between two integer endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub from: Point,
    pub to: Point,
}

impl Line {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            from: Point::new(x0, y0),
            to: Point::new(x1, y1),
        }
    }
}

/// Which line algorithm to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    /// Integer Bresenham stepping
    Aliased,
    /// Xiaolin Wu coverage weighting
    #[default]
    AntiAliased,
}

impl LineMode {
    pub fn from_anti_alias(anti_alias: bool) -> Self {
        if anti_alias {
            LineMode::AntiAliased
        } else {
            LineMode::Aliased
        }
    }
}

/// How the blend primitive decides a point is inside the buffer.
///
/// `Inclusive` accepts `x == width` and `y == height`, the way the browser
/// benchmark always did. Such a point resolves to the flat byte offset
/// `4 * (y * width + x)`: column `width` of one row lands on column 0 of the
/// next, and anything past the end of the buffer is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clipping {
    #[default]
    Inclusive,
    /// Only `0 <= x < width` and `0 <= y < height` are written
    Strict,
}

/// Borrowed, mutable view of an RGBA8 pixel buffer, or of a band of whole
/// rows of one (see [`Canvas::band`])
#[derive(Debug)]
pub struct Canvas<'a> {
    data: &'a mut [u8],
    width: u32,
    height: u32,
    clipping: Clipping,
    // flat pixel index of data[0] in the full image
    first_pixel: usize,
}

impl<'a> Canvas<'a> {
    /// Wrap `data` as a `width` x `height` canvas.
    ///
    /// Fails with `InvalidDimensions` for an empty size and `BufferSize`
    /// when `data` is not exactly `width * height * 4` bytes.
    pub fn new(data: &'a mut [u8], width: u32, height: u32) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            clipping: Clipping::default(),
            first_pixel: 0,
        })
    }

    /// Wrap `data` as rows `first_row..first_row + data.len() / (4 * width)`
    /// of a `width` x `height` canvas.
    ///
    /// Coordinates stay those of the full image. Points landing outside the
    /// band are dropped, so every pixel of the image sees exactly the writes
    /// a full canvas would give it, in the same order.
    pub fn band(data: &'a mut [u8], width: u32, height: u32, first_row: u32) -> Result<Self> {
        let full = buffer_len(width, height)?;
        let row = width as usize * BYTES_PER_PIXEL;
        let start = first_row as usize * row;
        if data.len() % row != 0 || start + data.len() > full {
            return Err(Error::BufferSize {
                expected: full.saturating_sub(start),
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            clipping: Clipping::default(),
            first_pixel: first_row as usize * width as usize,
        })
    }

    pub fn with_clipping(mut self, clipping: Clipping) -> Self {
        self.clipping = clipping;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clipping(&self) -> Clipping {
        self.clipping
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    /// Plot one point at the color's own alpha
    pub fn draw_point(&mut self, x: i32, y: i32, color: Color) {
        blend::blend_point(self, x as i64, y as i64, color, color.a as f64);
    }

    /// Draw a line with the chosen algorithm. Never fails: points outside
    /// the canvas are dropped one by one.
    pub fn draw_line(&mut self, from: Point, to: Point, color: Color, mode: LineMode) {
        match mode {
            LineMode::Aliased => bresenham::draw_line(self, from, to, color),
            LineMode::AntiAliased => wu::draw_line(self, from, to, color),
        }
    }

    /// Draw every line in order; later lines blend over earlier ones.
    pub fn draw_lines<'l, I>(&mut self, lines: I, color: Color, mode: LineMode)
    where
        I: IntoIterator<Item = &'l Line>,
    {
        for line in lines {
            self.draw_line(line.from, line.to, color, mode);
        }
    }

    // Byte offset of a point within `data`, or None when the point is
    // clipped or belongs to another band.
    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        let (w, h) = (self.width as i64, self.height as i64);
        let inside = match self.clipping {
            Clipping::Inclusive => x >= 0 && x <= w && y >= 0 && y <= h,
            Clipping::Strict => x >= 0 && x < w && y >= 0 && y < h,
        };
        if !inside {
            return None;
        }
        let pixel = (y * w + x) as usize;
        if pixel < self.first_pixel {
            return None;
        }
        let at = (pixel - self.first_pixel) * BYTES_PER_PIXEL;
        if at + BYTES_PER_PIXEL > self.data.len() {
            return None;
        }
        Some(at)
    }
}

/// Owned RGBA8 pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A fully transparent buffer
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = buffer_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0; len],
        })
    }

    /// Adopt existing RGBA bytes
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(width, height)?;
        if data.len() != expected {
            return Err(Error::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Color stored at (x, y), or None outside the buffer
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[at..at + BYTES_PER_PIXEL];
        Some(Color::rgba(px[0], px[1], px[2], px[3]))
    }

    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas {
            data: &mut self.data,
            width: self.width,
            height: self.height,
            clipping: Clipping::default(),
            first_pixel: 0,
        }
    }
}

/// Byte length of a `width` x `height` RGBA8 buffer
pub fn buffer_len(width: u32, height: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
        .ok_or(Error::InvalidDimensions { width, height })
}

/// Draw one line straight into a caller-owned RGBA buffer.
///
/// This is the flat form of [`Canvas::draw_line`] with the historic
/// inclusive bounds check.
#[allow(clippy::too_many_arguments)]
pub fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: Color,
    anti_alias: bool,
) -> Result<()> {
    let mut canvas = Canvas::new(buffer, width, height)?;
    canvas.draw_line(
        Point::new(x0, y0),
        Point::new(x1, y1),
        color,
        LineMode::from_anti_alias(anti_alias),
    );
    Ok(())
}

/// Plot one point into a caller-owned RGBA buffer.
pub fn draw_point(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: Color) -> Result<()> {
    let mut canvas = Canvas::new(buffer, width, height)?;
    canvas.draw_point(x, y, color);
    Ok(())
}
