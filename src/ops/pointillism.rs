// ============================================================================
// POINTILLISM: stippled painting over a restricted hue palette
// ============================================================================
//
// Three layers of dots are painted over a copy of the source:
//
//   1. base: large dots on a Poisson-disk lattice, hue snapped to the palette
//   2. main: medium dots wherever canvas brightness drifts from the blurred
//            source, with hue jitter and saturation boosting
//   3. edge: small dots along Canny edges on the minority tone, with an
//            extra brightness-driven push towards blue or yellow
//
// Each layer clears its own depth buffer so dots within a layer overlap in a
// random order.

use rand::Rng;

use crate::canvas::{DepthBuffer, GrayBuffer, PixelBuffer};
use crate::ops::color::{Hsv, hue_distance};
use crate::ops::filters::{
    CannyParams, DEFAULT_SIGMA, canny, gaussian_blur, odd_kernel_size, to_gray,
};
use crate::ops::sampling::poisson_disk;
use crate::ops::shapes::draw_circle;

/// Chevreul's twelve-hue wheel, in degrees.
pub const CHEVREUL: [i32; 12] = [5, 20, 35, 45, 58, 80, 140, 170, 215, 244, 265, 285];

const RED: usize = 0;
const YELLOW: usize = 4;
const BLUE: usize = 8;
const VIOLET_BLUE: usize = 9;

/// Tunables for the pointillism filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointillismParams {
    /// Nominal dot radius of the main layer.
    pub radius: i32,
    /// 0 leaves the image untouched, 1 is the full effect.
    pub strength: f64,
    /// Likelihood of the edge layer's blue/yellow hue push (scaled by strength).
    pub hue_distortion: f64,
}

impl PointillismParams {
    pub const DEFAULT_RADIUS: i32 = 5;
    pub const DEFAULT_STRENGTH: f64 = 1.0;
    pub const DEFAULT_HUE_DISTORTION: f64 = 0.2;
    pub const RADIUS_RANGE: (i32, i32) = (1, 50);

    pub fn clamped(self) -> Self {
        let (lo, hi) = Self::RADIUS_RANGE;
        Self {
            radius: self.radius.clamp(lo, hi),
            strength: unit(self.strength),
            hue_distortion: unit(self.hue_distortion),
        }
    }
}

impl Default for PointillismParams {
    fn default() -> Self {
        Self {
            radius: Self::DEFAULT_RADIUS,
            strength: Self::DEFAULT_STRENGTH,
            hue_distortion: Self::DEFAULT_HUE_DISTORTION,
        }
    }
}

fn unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Dots painted by each layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointillismStats {
    pub base_dots: usize,
    pub main_dots: usize,
    pub edge_dots: usize,
}

impl PointillismStats {
    pub fn total(&self) -> usize {
        self.base_dots + self.main_dots + self.edge_dots
    }
}

/// Render `src` as a pointillist painting.
pub fn transform<R: Rng + ?Sized>(
    src: &PixelBuffer,
    params: &PointillismParams,
    rng: &mut R,
) -> PixelBuffer {
    paint(src, params, rng).0
}

/// Like [`transform`], also reporting how many dots each layer painted.
pub fn paint<R: Rng + ?Sized>(
    src: &PixelBuffer,
    params: &PointillismParams,
    rng: &mut R,
) -> (PixelBuffer, PointillismStats) {
    let params = params.clamped();
    let mut canvas = src.clone();
    let mut stats = PointillismStats::default();
    if params.strength <= 0.0 || src.width() == 0 || src.height() == 0 {
        return (canvas, stats);
    }

    let mut depth = DepthBuffer::new(src.width(), src.height());
    stats.base_dots = base_layer(
        src,
        &mut canvas,
        &mut depth,
        params.radius * 3,
        params.strength,
        rng,
    );
    crate::log_debug!("Pointillism: base layer painted {} dots", stats.base_dots);

    depth.clear();
    stats.main_dots = main_layer(src, &mut canvas, &mut depth, params.radius, params.strength, rng);
    crate::log_debug!("Pointillism: main layer painted {} dots", stats.main_dots);

    depth.clear();
    stats.edge_dots = edge_layer(src, &mut canvas, &mut depth, &params, rng);
    crate::log_debug!("Pointillism: edge layer painted {} dots", stats.edge_dots);

    (canvas, stats)
}

/// Weak filters use smaller dots: below half strength the radius becomes
/// `ceil(radius * strength * 2)`, but never less than `floor`.
pub fn scaled_radius(radius: i32, strength: f64, floor: i32) -> i32 {
    if strength < 0.5 {
        ((radius as f64 * strength * 2.0).ceil() as i32).max(floor)
    } else {
        radius
    }
}

// ============================================================================
// LAYERS
// ============================================================================

fn base_layer<R: Rng + ?Sized>(
    src: &PixelBuffer,
    canvas: &mut PixelBuffer,
    depth: &mut DepthBuffer,
    radius: i32,
    strength: f64,
    rng: &mut R,
) -> usize {
    let radius = scaled_radius(radius, strength, 3);
    let points = poisson_disk(src.width(), src.height(), (radius * 2) as f64, rng);

    for p in &points {
        let hsv = Hsv::from_rgb(src.rgb(p.x as u32, p.y as u32));
        let hue = CHEVREUL[nearest_palette_index(hsv.hue)];
        let rgb = Hsv::new(hue, hsv.saturation, hsv.value).to_rgb();
        let z = rng.random_range(0..=255u8);
        draw_random_circle(canvas, (p.x, p.y), rgb, radius, z, depth, rng);
    }
    points.len()
}

/// Blurred luminance used as the brightness reference of the main and edge
/// layers.
fn smoothed_gray(src: &PixelBuffer, radius: i32) -> GrayBuffer {
    gaussian_blur(&to_gray(src), odd_kernel_size(radius, 3), DEFAULT_SIGMA)
}

fn main_layer<R: Rng + ?Sized>(
    src: &PixelBuffer,
    canvas: &mut PixelBuffer,
    depth: &mut DepthBuffer,
    radius: i32,
    strength: f64,
    rng: &mut R,
) -> usize {
    let radius = scaled_radius(radius, strength, 1);
    let (w, h) = (src.width() as i32, src.height() as i32);
    let reference = smoothed_gray(src, radius);
    let half = radius / 2;
    let mut painted = 0;

    let mut y = half;
    while y < h {
        let mut x = half;
        while x < w {
            let mut total_error = 0i64;
            let mut max_error = 0i32;
            let mut worst = (x, y);
            for j in (y - half).max(0)..=(y + half).min(h - 1) {
                for i in (x - half).max(0)..=(x + half).min(w - 1) {
                    let value = Hsv::from_rgb(canvas.rgb(i as u32, j as u32)).value;
                    let err = (value - reference.get(i as u32, j as u32) as i32).abs();
                    total_error += err as i64;
                    if err > max_error {
                        max_error = err;
                        worst = (i, j);
                    }
                }
            }

            if total_error as f64 > 10.0 * strength {
                let hsv = Hsv::from_rgb(src.rgb(x as u32, y as u32));
                let pos = nearest_palette_index(hsv.hue);
                let hue = if rng.random::<f64>() < strength {
                    random_neighbour(pos, rng)
                } else {
                    CHEVREUL[pos]
                };
                let sat = change_saturation(
                    hsv.saturation,
                    hsv.brightness(),
                    0.35 * strength,
                    strength,
                    rng,
                );
                let rgb = Hsv::new(hue, sat, hsv.value).to_rgb();
                let z = rng.random_range(0..=255u8);
                draw_random_circle(canvas, worst, rgb, radius, z, depth, rng);
                painted += 1;
            }
            x += radius;
        }
        y += radius;
    }
    painted
}

fn edge_layer<R: Rng + ?Sized>(
    src: &PixelBuffer,
    canvas: &mut PixelBuffer,
    depth: &mut DepthBuffer,
    params: &PointillismParams,
    rng: &mut R,
) -> usize {
    let strength = params.strength;
    let hue_distortion = params.hue_distortion * strength;
    let radius = scaled_radius(params.radius, strength, 1);
    let (w, h) = (src.width() as i32, src.height() as i32);

    let edges = canny(src, &CannyParams::default());
    let reference = smoothed_gray(src, radius);
    let mut painted = 0;

    for y in 0..h {
        for x in 0..w {
            if edges.get(x as u32, y as u32) == 0 {
                continue;
            }
            let target = minority_tone(&reference, x, y, radius);

            let hsv = Hsv::from_rgb(src.rgb(target.0 as u32, target.1 as u32));
            let mut pos = nearest_palette_index(hsv.hue);
            let mut hue = if rng.random::<f64>() < strength {
                random_neighbour(pos, rng)
            } else {
                CHEVREUL[pos]
            };
            let mut sat = hsv.saturation;

            let roll = rng.random::<f64>();
            if (roll < hue_distortion && pos != BLUE) || roll < hue_distortion / 3.0 {
                let brightness = reference.get(target.0 as u32, target.1 as u32) as f64 / 256.0;
                pos = change_hue(brightness, rng);
                if sat < 70 && hsv.brightness() < 0.3 {
                    sat = 70;
                }
                hue = CHEVREUL[pos];
            }

            let sat = change_saturation(sat, hsv.brightness(), 0.35 * strength, strength, rng);
            let rgb = Hsv::new(hue, sat, hsv.value).to_rgb();
            let z = rng.random_range(0..=255u8);
            draw_random_circle(canvas, target, rgb, radius - 1, z, depth, rng);
            painted += 1;
        }
    }
    painted
}

/// Pick the extreme (brightest or darkest) point in the `radius` neighbourhood
/// of `(x, y)` whose tone is shared by fewer neighbours, so painting there
/// sharpens the boundary.
fn minority_tone(reference: &GrayBuffer, x: i32, y: i32, radius: i32) -> (i32, i32) {
    let (w, h) = (reference.width() as i32, reference.height() as i32);
    let y_range = (y - radius).max(0)..=(y + radius).min(h - 1);
    let x_range = (x - radius).max(0)..=(x + radius).min(w - 1);

    let centre = reference.get(x as u32, y as u32);
    let (mut brightest, mut brightest_at) = (centre, (x, y));
    let (mut darkest, mut darkest_at) = (centre, (x, y));
    for j in y_range.clone() {
        for i in x_range.clone() {
            let v = reference.get(i as u32, j as u32);
            if v > brightest {
                brightest = v;
                brightest_at = (i, j);
            }
            if v < darkest {
                darkest = v;
                darkest_at = (i, j);
            }
        }
    }

    let (mut bright, mut dark) = (0usize, 0usize);
    for j in y_range {
        for i in x_range.clone() {
            let v = reference.get(i as u32, j as u32) as i32;
            if (brightest as i32 - v) < (v - darkest as i32) {
                bright += 1;
            } else {
                dark += 1;
            }
        }
    }

    if bright < dark && bright != 0 {
        brightest_at
    } else if dark != 0 {
        darkest_at
    } else {
        (x, y)
    }
}

// ============================================================================
// DOTS & COLOUR JITTER
// ============================================================================

/// Draw a dot whose radius is jittered: 25% one larger, 25% one smaller.
fn draw_random_circle<R: Rng + ?Sized>(
    canvas: &mut PixelBuffer,
    center: (i32, i32),
    rgb: [u8; 3],
    radius: i32,
    z: u8,
    depth: &mut DepthBuffer,
    rng: &mut R,
) {
    let radius = match rng.random_range(0..4) {
        0 => radius + 1,
        1 => radius - 1,
        _ => radius,
    };
    draw_circle(canvas, center, rgb, radius, z, depth);
}

/// Index of the palette hue closest to `hue` around the colour wheel.
pub fn nearest_palette_index(hue: i32) -> usize {
    let mut best = 0;
    let mut best_dist = i32::MAX;
    for (i, &p) in CHEVREUL.iter().enumerate() {
        let d = hue_distance(hue, p);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// A palette hue next to `pos`: 25% the previous entry, 25% the next entry
/// (blues never drift further towards violet), otherwise `pos` itself.
pub fn random_neighbour<R: Rng + ?Sized>(pos: usize, rng: &mut R) -> i32 {
    let blue = pos == BLUE || pos == VIOLET_BLUE;
    let n = CHEVREUL.len();
    let idx = match rng.random_range(0..4) {
        0 => (pos + n - 1) % n,
        3 if !blue => (pos + 1) % n,
        _ => pos,
    };
    CHEVREUL[idx]
}

/// With probability `t`, push saturation towards a brightness-dependent
/// minimum (dark colours become more saturated); near-white colours instead
/// get their saturation capped. `brightness` is in `0..=1`, `scale` scales the
/// minimums.
pub fn change_saturation<R: Rng + ?Sized>(
    sat: i32,
    brightness: f64,
    t: f64,
    scale: f64,
    rng: &mut R,
) -> i32 {
    if rng.random::<f64>() >= t {
        return sat;
    }
    let thresholds = [220.0 * scale, 150.0 * scale, 80.0 * scale, 30.0 * scale].map(|v| v as i32);
    let v = brightness;
    let floor_between = |upper: usize, lower: usize, weight: f64| {
        thresholds[lower] + ((thresholds[upper] - thresholds[lower]) as f64 * weight) as i32
    };

    let adjusted = if v < 0.2 {
        sat.max(thresholds[0])
    } else if v < 0.25 {
        sat.max(floor_between(0, 1, (0.25 - v) * 10.0))
    } else if v < 0.4 {
        sat.max(floor_between(1, 2, (0.4 - v) * 10.0 / 1.5))
    } else if v < 0.9 {
        sat.max(floor_between(2, 3, (0.9 - v) * 10.0 / 5.0))
    } else {
        let cap = 30 - (300.0 * (1.0 - v)) as i32;
        sat.min(cap)
    };
    adjusted.clamp(0, 255)
}

/// Pick a palette index for the edge layer's hue push: dark tones lean to
/// blue, bright tones to yellow, everything else falls back to red.
pub fn change_hue<R: Rng + ?Sized>(brightness: f64, rng: &mut R) -> usize {
    let v = brightness;
    let blue_prob = if v < 0.3 { 0.6 } else { 0.6 - (v - 0.4) / 0.1 * 0.5 };
    let yellow_prob = if v > 0.55 { 0.6 } else { 0.6 - (0.6 - v) / 0.1 * 0.5 };
    let roll = rng.random::<f64>();
    if roll < blue_prob {
        BLUE
    } else if roll > 1.0 - yellow_prob {
        YELLOW
    } else {
        RED
    }
}
