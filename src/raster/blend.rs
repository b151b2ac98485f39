//! The single pixel-write primitive shared by both line algorithms.
//!
//! An alpha of exactly 255 overwrites the pixel. Anything lower is a
//! straight-alpha blend applied to every channel, the stored alpha included:
//!
//! ```text
//! out = min(255, src * a / 255 + dst * (1 - a / 255))
//! ```
//!
//! For the alpha channel `src` is the effective alpha `a` itself, so a
//! half-covered pixel drawn over transparency ends up with alpha ~64, not
//! 128. Results are rounded to the nearest byte.

use super::{Canvas, Color, BYTES_PER_PIXEL};

/// Blend `color` at (x, y) with an effective alpha in `0.0..=255.0`.
///
/// Clipped points are ignored. Anti-aliased callers pass the color's alpha
/// scaled by pixel coverage.
pub fn blend_point(canvas: &mut Canvas<'_>, x: i64, y: i64, color: Color, alpha: f64) {
    if let Some(at) = canvas.offset(x, y) {
        blend_at(&mut canvas.data[at..at + BYTES_PER_PIXEL], color, alpha);
    }
}

/// Blend into a single 4-byte pixel slice.
pub fn blend_at(px: &mut [u8], color: Color, alpha: f64) {
    let alpha = alpha.clamp(0.0, 255.0);
    if alpha == 255.0 {
        px[0] = color.r;
        px[1] = color.g;
        px[2] = color.b;
        px[3] = 255;
        return;
    }

    let k = alpha / 255.0;
    px[0] = mix(color.r as f64, px[0], k);
    px[1] = mix(color.g as f64, px[1], k);
    px[2] = mix(color.b as f64, px[2], k);
    px[3] = mix(alpha, px[3], k);
}

// `f64::round` rounds halves away from zero; a browser's Uint8ClampedArray
// rounds them to even, so x.5 results can differ by one.
#[inline]
fn mix(src: f64, dst: u8, k: f64) -> u8 {
    let v = src * k + dst as f64 * (1.0 - k);
    v.min(255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PixelBuffer;

    #[test]
    fn opaque_overwrites() {
        let mut px = [10, 20, 30, 40];
        blend_at(&mut px, Color::rgba(1, 2, 3, 255), 255.0);
        assert_eq!(px, [1, 2, 3, 255]);
    }

    #[test]
    fn halves_round_away_from_zero() {
        // k = 0.5 exactly: red lands on 126.5, alpha on 63.75
        let mut px = [0, 0, 0, 0];
        blend_at(&mut px, Color::rgba(253, 0, 0, 255), 127.5);
        assert_eq!(px, [127, 0, 0, 64]);
    }

    #[test]
    fn zero_alpha_is_a_no_op() {
        let mut px = [10, 20, 30, 40];
        blend_at(&mut px, Color::RED, 0.0);
        assert_eq!(px, [10, 20, 30, 40]);
    }

    #[test]
    fn half_alpha_blends_every_channel() {
        let mut px = [0, 0, 0, 0];
        blend_at(&mut px, Color::rgba(255, 0, 0, 255), 127.5);
        // red: 255 * 0.5; alpha: 127.5 * 0.5
        assert_eq!(px, [128, 0, 0, 64]);
    }

    #[test]
    fn blend_over_opaque_background() {
        let mut px = [0, 0, 255, 255];
        blend_at(&mut px, Color::rgba(255, 0, 0, 51), 51.0);
        // k = 0.2
        assert_eq!(px, [51, 0, 204, 214]);
    }

    #[test]
    fn clipped_points_are_ignored() {
        let mut buf = PixelBuffer::new(2, 2).unwrap();
        let mut canvas = buf.canvas();
        blend_point(&mut canvas, -1, 0, Color::RED, 255.0);
        blend_point(&mut canvas, 0, -5, Color::RED, 255.0);
        blend_point(&mut canvas, 100, 100, Color::RED, 255.0);
        assert!(canvas.as_bytes().iter().all(|&b| b == 0));
    }
}
