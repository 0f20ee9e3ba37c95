// ============================================================================
// LAYERED STROKES: painterly rendering with curved brush strokes
// ============================================================================
//
// The canvas starts white and is painted in three passes with decreasing
// brush sizes. Each pass compares the canvas against a blurred reference on a
// grid and starts a stroke wherever the local colour error is too high. A
// stroke is a chain of overlapping circles that follows the isophotes of the
// reference (perpendicular to its luminance gradient).

use rand::Rng;

use crate::canvas::{DepthBuffer, PixelBuffer};
use crate::ops::color::{color_distance, luminance};
use crate::ops::filters::{DEFAULT_SIGMA, SOBEL_X, SOBEL_Y, gaussian_blur, odd_kernel_size};
use crate::ops::shapes::draw_circle;

/// Tunables for the layered-strokes filter. Values outside the documented
/// ranges are clamped, never rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayeredStrokesParams {
    /// Radius of the first (coarsest) brush pass.
    pub max_brush_size: i32,
    /// Radius of the last (finest) brush pass.
    pub min_brush_size: i32,
    /// Grid-normalized colour error above which a stroke is started.
    pub error_threshold: i32,
}

impl LayeredStrokesParams {
    pub const DEFAULT_MAX_BRUSH_SIZE: i32 = 7;
    pub const DEFAULT_MIN_BRUSH_SIZE: i32 = 2;
    pub const DEFAULT_ERROR_THRESHOLD: i32 = 200;
    pub const BRUSH_SIZE_RANGE: (i32, i32) = (1, 100);
    pub const ERROR_THRESHOLD_RANGE: (i32, i32) = (0, 600);

    /// Clamp every field into its range; the minimum brush never exceeds the
    /// maximum brush.
    pub fn clamped(self) -> Self {
        let (lo, hi) = Self::BRUSH_SIZE_RANGE;
        let max_brush_size = self.max_brush_size.clamp(lo, hi);
        let min_brush_size = self.min_brush_size.clamp(lo, hi).min(max_brush_size);
        let (tlo, thi) = Self::ERROR_THRESHOLD_RANGE;
        Self {
            max_brush_size,
            min_brush_size,
            error_threshold: self.error_threshold.clamp(tlo, thi),
        }
    }

    /// Brush radius for each of the three passes, coarsest first.
    pub fn brush_sizes(&self) -> [i32; 3] {
        [
            self.max_brush_size,
            (self.max_brush_size + self.min_brush_size) / 2,
            self.min_brush_size,
        ]
    }
}

impl Default for LayeredStrokesParams {
    fn default() -> Self {
        Self {
            max_brush_size: Self::DEFAULT_MAX_BRUSH_SIZE,
            min_brush_size: Self::DEFAULT_MIN_BRUSH_SIZE,
            error_threshold: Self::DEFAULT_ERROR_THRESHOLD,
        }
    }
}

/// Strokes started during each brush pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrokeStats {
    pub strokes_per_pass: [usize; 3],
}

impl StrokeStats {
    pub fn total(&self) -> usize {
        self.strokes_per_pass.iter().sum()
    }
}

/// Render `src` as a layered brush-stroke painting.
pub fn transform<R: Rng + ?Sized>(
    src: &PixelBuffer,
    params: &LayeredStrokesParams,
    rng: &mut R,
) -> PixelBuffer {
    paint(src, params, rng).0
}

/// Like [`transform`], also reporting how many strokes each pass started.
pub fn paint<R: Rng + ?Sized>(
    src: &PixelBuffer,
    params: &LayeredStrokesParams,
    rng: &mut R,
) -> (PixelBuffer, StrokeStats) {
    let params = params.clamped();
    let (w, h) = (src.width(), src.height());
    let mut canvas = PixelBuffer::filled(w, h, [255, 255, 255, 255]);
    let mut stats = StrokeStats::default();
    if w == 0 || h == 0 {
        return (canvas, stats);
    }

    let brushes = params.brush_sizes();
    let max_stroke_length = brushes[0] as usize * 4;
    let mut depth = DepthBuffer::new(w, h);

    for (pass, &brush) in brushes.iter().enumerate() {
        depth.clear();
        let reference = gaussian_blur(src, odd_kernel_size(brush, 1), DEFAULT_SIGMA);
        let stroke = StrokeContext {
            reference: &reference,
            radius: brush,
            max_length: max_stroke_length,
        };

        let grid = brush.max(2);
        let mut y = grid / 2;
        while y < h as i32 {
            let mut x = grid / 2;
            while x < w as i32 {
                let cell = sample_cell(&canvas, &reference, x, y, grid);
                let mut total = cell.total_error;
                if brush == 1 {
                    total /= 2.0;
                }
                if total / grid as f64 > params.error_threshold as f64 {
                    let (px, py) = cell.worst;
                    let rgb = reference.rgb(px as u32, py as u32);
                    let z = rng.random_range(0..=255u8);
                    stroke.draw(&mut canvas, &mut depth, (px, py), rgb, z);
                    stats.strokes_per_pass[pass] += 1;
                }
                x += grid;
            }
            y += grid;
        }
        crate::log_debug!(
            "Layered strokes: pass {} (brush {}) painted {} strokes",
            pass + 1,
            brush,
            stats.strokes_per_pass[pass]
        );
    }

    (canvas, stats)
}

// ---- grid error ------------------------------------------------------------

struct CellError {
    total_error: f64,
    worst: (i32, i32),
}

/// Summed canvas/reference colour distance over the grid cell anchored at
/// `(x, y)`, plus the first pixel with the largest distance.
fn sample_cell(
    canvas: &PixelBuffer,
    reference: &PixelBuffer,
    x: i32,
    y: i32,
    grid: i32,
) -> CellError {
    let x_min = (x - grid / 2).max(0);
    let y_min = (y - grid / 2).max(0);
    let x_max = (x_min + grid + 1).min(canvas.width() as i32);
    let y_max = (y_min + grid + 1).min(canvas.height() as i32);

    let mut total_error = 0.0;
    let mut max_error = 0.0;
    let mut worst = (x_min, y_min);
    for j in y_min..y_max {
        for i in x_min..x_max {
            let err = color_distance(
                canvas.rgb(i as u32, j as u32),
                reference.rgb(i as u32, j as u32),
            );
            total_error += err;
            if err > max_error {
                max_error = err;
                worst = (i, j);
            }
        }
    }
    CellError { total_error, worst }
}

// ---- strokes ---------------------------------------------------------------

struct StrokeContext<'a> {
    reference: &'a PixelBuffer,
    radius: i32,
    max_length: usize,
}

impl StrokeContext<'_> {
    /// Luminance gradient of the reference at `(x, y)` in image orientation
    /// (y grows downwards).
    fn gradient(&self, x: i32, y: i32) -> (f64, f64) {
        let mut gx = 0.0;
        let mut gy_up = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let px = self.reference.pixel_clamped(x + dx, y + dy);
                let lum = luminance([px[0], px[1], px[2]]);
                let k = ((dy + 1) * 3 + (dx + 1)) as usize;
                gx += lum * SOBEL_X[k];
                gy_up += lum * SOBEL_Y[k];
            }
        }
        (gx, -gy_up)
    }

    fn draw(
        &self,
        canvas: &mut PixelBuffer,
        depth: &mut DepthBuffer,
        start: (i32, i32),
        rgb: [u8; 3],
        z: u8,
    ) {
        let step = (self.radius as f64 / 4.0).max(1.0);
        let (w, h) = (canvas.width() as f64, canvas.height() as f64);

        draw_circle(canvas, start, rgb, self.radius, z, depth);

        let (mut x, mut y) = (start.0 as f64, start.1 as f64);
        let mut heading: Option<(f64, f64)> = None;

        for segment in 0..self.max_length {
            let (gx, gy) = self.gradient(x as i32, y as i32);
            let magnitude = (gx * gx + gy * gy).sqrt();
            if magnitude * step < 1.0 {
                break;
            }

            // Follow the isophote, never doubling back on the previous segment.
            let (mut dx, mut dy) = (-gy / magnitude, gx / magnitude);
            if let Some((px, py)) = heading
                && dx * px + dy * py < 0.0
            {
                dx = -dx;
                dy = -dy;
            }
            heading = Some((dx, dy));

            x += step * dx;
            y += step * dy;
            if x < 0.0 || y < 0.0 || x >= w || y >= h {
                break;
            }

            let (ix, iy) = (x as i32, y as i32);
            let target = self.reference.rgb(ix as u32, iy as u32);
            let canvas_error = color_distance(target, canvas.rgb(ix as u32, iy as u32));
            let stroke_error = color_distance(target, rgb);
            if segment >= 1 && canvas_error < stroke_error {
                break;
            }

            draw_circle(canvas, (ix, iy), rgb, self.radius, z, depth);
        }
    }
}
