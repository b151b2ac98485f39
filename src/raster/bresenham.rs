//! Aliased line drawing (integer Bresenham, all octants).

use super::{blend, Canvas, Color, Point};

/// Step one pixel at a time from `from` to `to`, plotting every visited
/// point including both endpoints.
///
/// Arithmetic runs in `i64` so `2 * err` cannot overflow for any pair of
/// `i32` endpoints. Each step moves at least one axis towards the end point
/// and neither axis ever overshoots, so the loop always reaches `to`.
pub fn draw_line(canvas: &mut Canvas<'_>, from: Point, to: Point, color: Color) {
    let (mut x, mut y) = (from.x as i64, from.y as i64);
    let (x1, y1) = (to.x as i64, to.y as i64);

    let dx = (x1 - x).abs();
    let dy = (y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let alpha = color.a as f64;

    loop {
        blend::blend_point(canvas, x, y, color, alpha);
        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}
