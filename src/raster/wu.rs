//! Anti-aliased line drawing (Xiaolin Wu).
//!
//! The line is walked along its major axis in increasing order. At every
//! step the exact minor-axis intersection is split between the two pixels
//! that straddle it, each receiving the requested alpha scaled by its share
//! of coverage.
//!
//! Endpoints are integer pixel centers, so the endpoint gap along the major
//! axis is a whole pixel and endpoints are plotted at full coverage. As a
//! consequence axis-aligned lines come out identical to the aliased ones.

use super::{blend, Canvas, Clipping, Color, Point};

// Coverage of the endpoint pixels. Textbook Wu uses rfpart(x + 0.5), which is
// 0.5 for integer endpoints; here they get the whole pixel.
const ENDPOINT_GAP: f64 = 1.0;

#[inline]
fn fpart(x: f64) -> f64 {
    x - x.floor()
}

#[inline]
fn rfpart(x: f64) -> f64 {
    1.0 - fpart(x)
}

// Plot in major/minor space, swapping back for steep lines.
#[inline]
fn plot(canvas: &mut Canvas<'_>, steep: bool, major: i64, minor: i64, color: Color, coverage: f64) {
    if coverage <= 0.0 {
        return;
    }
    let alpha = color.a as f64 * coverage;
    if steep {
        blend::blend_point(canvas, minor, major, color, alpha);
    } else {
        blend::blend_point(canvas, major, minor, color, alpha);
    }
}

// The pixel pair straddling a minor-axis intersection.
#[inline]
fn plot_pair(canvas: &mut Canvas<'_>, steep: bool, major: i64, inter: f64, color: Color, gap: f64) {
    let minor = inter.floor() as i64;
    plot(canvas, steep, major, minor, color, rfpart(inter) * gap);
    plot(canvas, steep, major, minor + 1, color, fpart(inter) * gap);
}

/// Draw an anti-aliased line from `from` to `to`.
pub fn draw_line(canvas: &mut Canvas<'_>, from: Point, to: Point, color: Color) {
    let (mut x0, mut y0) = (from.x as f64, from.y as f64);
    let (mut x1, mut y1) = (to.x as f64, to.y as f64);

    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }

    let dx = x1 - x0;
    let dy = y1 - y0;
    let gradient = if dx == 0.0 { 1.0 } else { dy / dx };

    // first endpoint
    let xpxl1 = x0 as i64;
    plot_pair(canvas, steep, xpxl1, y0, color, ENDPOINT_GAP);

    // second endpoint, unless the line is a single pixel
    let xpxl2 = x1 as i64;
    if xpxl2 != xpxl1 {
        plot_pair(canvas, steep, xpxl2, y1, color, ENDPOINT_GAP);
    }

    // Interior steps. Major positions past the visible extent can only be
    // dropped by the bounds check, so the walk is limited to it.
    let extent = if steep { canvas.height() } else { canvas.width() } as i64;
    let limit = match canvas.clipping() {
        Clipping::Inclusive => extent,
        Clipping::Strict => extent - 1,
    };
    let start = (xpxl1 + 1).max(0);
    let end = (xpxl2 - 1).min(limit);
    for x in start..=end {
        let intery = y0 + gradient * (x as f64 - x0);
        plot_pair(canvas, steep, x, intery, color, 1.0);
    }
}
