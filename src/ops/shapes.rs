// ============================================================================
// DEPTH-TESTED STROKE RASTERIZATION
// ============================================================================
//
// Painted dots and brush strokes are solid, opaque, hard-edged circles. Each
// stroke carries a depth `z`; a pixel only takes the stroke colour when `z` is
// strictly above the depth already recorded there (see `DepthBuffer`).

use crate::canvas::{DepthBuffer, PixelBuffer};

/// Paint the inclusive span `x_a..=x_b` on row `y`. Endpoints may be given in
/// either order; anything off-canvas is clipped. Returns the number of pixels
/// that passed the depth test.
pub fn draw_horizontal_span(
    canvas: &mut PixelBuffer,
    x_a: i32,
    x_b: i32,
    y: i32,
    rgb: [u8; 3],
    z: u8,
    depth: &mut DepthBuffer,
) -> usize {
    if y < 0 || y >= canvas.height() as i32 || canvas.width() == 0 {
        return 0;
    }
    let (lo, hi) = if x_a <= x_b { (x_a, x_b) } else { (x_b, x_a) };
    let lo = lo.max(0);
    let hi = hi.min(canvas.width() as i32 - 1);
    let rgba = [rgb[0], rgb[1], rgb[2], 255];

    let mut painted = 0;
    for x in lo..=hi {
        if depth.test_and_set(x as u32, y as u32, z) {
            canvas.set_pixel(x as u32, y as u32, rgba);
            painted += 1;
        }
    }
    painted
}

/// Filled midpoint circle centred on `center`, written as horizontal spans.
///
/// A radius of 1 or less covers only the centre pixel. Returns the number of
/// pixels written; a pixel covered by two spans of the same circle is counted
/// once because the second write fails the strict depth test.
pub fn draw_circle(
    canvas: &mut PixelBuffer,
    center: (i32, i32),
    rgb: [u8; 3],
    radius: i32,
    z: u8,
    depth: &mut DepthBuffer,
) -> usize {
    let (cx, cy) = center;
    if radius <= 1 {
        return draw_horizontal_span(canvas, cx, cx, cy, rgb, z, depth);
    }

    let mut x = -1;
    let mut y = radius;
    let mut d = 1 - radius;
    let mut delta_e = -1;
    let mut delta_se = -2 * radius + 3;
    let mut painted = 0;

    while y > x {
        delta_e += 2;
        x += 1;
        if d < 0 {
            d += delta_e;
            delta_se += 2;
        } else {
            d += delta_se;
            delta_se += 4;
            y -= 1;
        }

        painted += draw_horizontal_span(canvas, cx - x, cx + x, cy + y, rgb, z, depth);
        painted += draw_horizontal_span(canvas, cx - y, cx + y, cy + x, rgb, z, depth);
        painted += draw_horizontal_span(canvas, cx - y, cx + y, cy - x, rgb, z, depth);
        painted += draw_horizontal_span(canvas, cx - x, cx + x, cy - y, rgb, z, depth);
    }
    painted
}
