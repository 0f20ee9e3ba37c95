// ============================================================================
// GLASS PATTERNS: flow-aligned streaks driven by a competing noise field
// ============================================================================
//
// A vector field is built along the local image structure (rotated by a fixed
// angle). A smoothed white-noise "height" field and the image are then
// advected along it a few times; wherever the advected height beats the
// current one, both height and colour are taken from upstream. Colours end up
// smeared along the flow lines, which reads as a pattern of glass streaks.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use rand::Rng;

use crate::canvas::{GrayBuffer, PixelBuffer, Raster, VectorField, clamp_coord};
use crate::ops::filters::{DEFAULT_KERNEL_SIZE, DEFAULT_SIGMA, add_planes, gaussian_blur};

/// Half-width of the derivative-of-Gaussian window.
const GAUSS_HALF_WIDTH: i32 = 15;
/// The window is sampled every `GAUSS_TAP_STRIDE` pixels in each direction.
const GAUSS_TAP_STRIDE: usize = 5;
/// Uniform draws summed per white-noise sample.
const WHITE_NOISE_DRAWS: usize = 50;

/// Tunables for the glass-patterns filter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlassPatternsParams {
    /// 0 leaves the image untouched, 1 is the full effect.
    pub strength: f64,
    /// Vector length in pixels before scaling by strength.
    pub vector_length: i32,
    /// Standard deviation of the derivative-of-Gaussian window.
    pub standard_deviation: f64,
    /// Rotation applied to the structure direction, in radians.
    pub angle: f64,
    /// Advection rounds.
    pub iterations: u32,
    /// Euler step size.
    pub step_size: f64,
}

impl GlassPatternsParams {
    pub const DEFAULT_STRENGTH: f64 = 1.0;
    pub const DEFAULT_VECTOR_LENGTH: i32 = 8;
    pub const DEFAULT_STANDARD_DEVIATION: f64 = 8.0;
    pub const DEFAULT_ANGLE: f64 = FRAC_PI_2;
    pub const DEFAULT_ITERATIONS: u32 = 4;
    pub const DEFAULT_STEP_SIZE: f64 = 0.3;

    pub const VECTOR_LENGTH_RANGE: (i32, i32) = (1, 64);
    pub const STANDARD_DEVIATION_RANGE: (f64, f64) = (0.5, 32.0);
    pub const ITERATIONS_MAX: u32 = 32;
    pub const STEP_SIZE_RANGE: (f64, f64) = (0.01, 1.0);

    pub fn clamped(self) -> Self {
        let (vlo, vhi) = Self::VECTOR_LENGTH_RANGE;
        let (slo, shi) = Self::STANDARD_DEVIATION_RANGE;
        let (hlo, hhi) = Self::STEP_SIZE_RANGE;
        Self {
            strength: clamp_or(self.strength, 0.0, 1.0, Self::DEFAULT_STRENGTH),
            vector_length: self.vector_length.clamp(vlo, vhi),
            standard_deviation: clamp_or(
                self.standard_deviation,
                slo,
                shi,
                Self::DEFAULT_STANDARD_DEVIATION,
            ),
            angle: clamp_or(self.angle, 0.0, TAU, Self::DEFAULT_ANGLE),
            iterations: self.iterations.min(Self::ITERATIONS_MAX),
            step_size: clamp_or(self.step_size, hlo, hhi, Self::DEFAULT_STEP_SIZE),
        }
    }

    /// Vector length actually used: `ceil(vector_length * strength)`.
    pub fn effective_vector_length(&self) -> i32 {
        (self.vector_length as f64 * self.strength).ceil() as i32
    }
}

impl Default for GlassPatternsParams {
    fn default() -> Self {
        Self {
            strength: Self::DEFAULT_STRENGTH,
            vector_length: Self::DEFAULT_VECTOR_LENGTH,
            standard_deviation: Self::DEFAULT_STANDARD_DEVIATION,
            angle: Self::DEFAULT_ANGLE,
            iterations: Self::DEFAULT_ITERATIONS,
            step_size: Self::DEFAULT_STEP_SIZE,
        }
    }
}

fn clamp_or(v: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if v.is_nan() { fallback } else { v.clamp(lo, hi) }
}

/// Apply the glass-patterns effect to `src`.
pub fn transform<R: Rng + ?Sized>(
    src: &PixelBuffer,
    params: &GlassPatternsParams,
    rng: &mut R,
) -> PixelBuffer {
    let params = params.clamped();
    let (w, h) = (src.width(), src.height());
    if w == 0 || h == 0 {
        return src.clone();
    }
    let strength = params.strength;

    let mut image = if strength > 0.2 {
        let kernel = if strength < 0.5 { 3 } else { DEFAULT_KERNEL_SIZE };
        gaussian_blur(src, kernel, DEFAULT_SIGMA)
    } else {
        src.clone()
    };

    let mut noise = noise_field(w, h, rng);
    let mut field = vector_field(
        src,
        params.effective_vector_length(),
        params.angle,
        params.standard_deviation,
    );

    add_grain(&mut image, strength, rng);

    crate::log_debug!(
        "Glass patterns: {}x{} image, vector length {}, {} iterations",
        w,
        h,
        params.effective_vector_length(),
        params.iterations
    );
    follow_flow(&mut image, &mut noise, &mut field, params.iterations, params.step_size);
    image
}

// ============================================================================
// NOISE
// ============================================================================

/// Approximately normal sample, mapped so that one standard deviation spans
/// `0..1` around 0.5, then clamped to `0..=1`.
pub fn white_noise<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let sum: f64 = (0..WHITE_NOISE_DRAWS).map(|_| rng.random::<f64>()).sum();
    let n = WHITE_NOISE_DRAWS as f64;
    let standard = (sum - n / 2.0) * (12.0 / n).sqrt();
    ((standard + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Per-pixel white noise scaled to bytes and smoothed with a 5-tap Gaussian.
pub fn noise_field<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> GrayBuffer {
    let mut raw = GrayBuffer::new(width, height);
    for v in raw.as_raw_mut() {
        *v = (white_noise(rng) * 255.0).round() as u8;
    }
    gaussian_blur(&raw, DEFAULT_KERNEL_SIZE, DEFAULT_SIGMA)
}

/// Add zero-mean grain to each colour channel so the streaks stay visible in
/// flat regions. Alpha is left alone.
fn add_grain<R: Rng + ?Sized>(image: &mut PixelBuffer, strength: f64, rng: &mut R) {
    if strength <= 0.0 {
        return;
    }
    for px in image.as_raw_mut().chunks_exact_mut(4) {
        for c in px.iter_mut().take(3) {
            let grain = (white_noise(rng) - 0.5) / 8.0 * strength * 255.0;
            *c = (*c as f64 + grain).round().clamp(0.0, 255.0) as u8;
        }
    }
}

// ============================================================================
// VECTOR FIELD
// ============================================================================

/// Sampled x/y derivative-of-Gaussian taps as `(dx, dy, weight_x, weight_y)`.
fn gaussian_derivative_taps(sd: f64) -> Vec<(i32, i32, f64, f64)> {
    let var = sd * sd;
    let norm = 1.0 / (2.0 * PI * var);
    let mut taps = Vec::new();
    for j in (-GAUSS_HALF_WIDTH..=GAUSS_HALF_WIDTH).step_by(GAUSS_TAP_STRIDE) {
        for i in (-GAUSS_HALF_WIDTH..=GAUSS_HALF_WIDTH).step_by(GAUSS_TAP_STRIDE) {
            let g = norm * (-((i * i + j * j) as f64) / (2.0 * var)).exp();
            taps.push((i, j, g * (-i as f64 / var), g * (-j as f64 / var)));
        }
    }
    taps
}

/// Flow field following the local structure of `src`.
///
/// Per pixel, the RGB gradients from a derivative-of-Gaussian window form a
/// structure tensor `[[e, f], [f, g]]`. The vector is
/// `length · (cos(θ + angle), sin(θ + angle))` with `θ` the tensor's dominant
/// direction; isotropic pixels (equal eigenvalues) get a zero vector.
pub fn vector_field(src: &PixelBuffer, length: i32, angle: f64, sd: f64) -> VectorField {
    let (w, h) = (src.width(), src.height());
    let mut field = VectorField::new(w, h);
    if length <= 0 {
        return field;
    }
    let taps = gaussian_derivative_taps(sd);
    let length = length as f64;

    for y in 0..h {
        for x in 0..w {
            let mut gx = [0.0f64; 3];
            let mut gy = [0.0f64; 3];
            for &(dx, dy, wx, wy) in &taps {
                let sx = clamp_coord(x as i32 + dx, w);
                let sy = clamp_coord(y as i32 + dy, h);
                let px = src.pixel(sx, sy);
                for c in 0..3 {
                    gx[c] += px[c] as f64 * wx;
                    gy[c] += px[c] as f64 * wy;
                }
            }

            let e: f64 = gx.iter().map(|v| v * v).sum();
            let f: f64 = gx.iter().zip(&gy).map(|(a, b)| a * b).sum();
            let g: f64 = gy.iter().map(|v| v * v).sum();

            if let Some(theta) = dominant_direction(e, f, g) {
                field.set(x, y, (length * (theta + angle).cos(), length * (theta + angle).sin()));
            }
        }
    }
    field
}

/// Direction maximizing the quadratic form of `[[e, f], [f, g]]`, or `None`
/// when the two eigenvalues coincide.
pub fn dominant_direction(e: f64, f: f64, g: f64) -> Option<f64> {
    let spread = ((e - g) * (e - g) + 4.0 * f * f).sqrt();
    if spread <= 1e-12 * (e + g).max(1.0) {
        return None;
    }
    let quadratic =
        |t: f64| 0.5 * ((e + g) + (2.0 * t).cos() * (e - g) + 2.0 * f * (2.0 * t).sin());
    let theta = 0.5 * (2.0 * f).atan2(e - g);
    let alt = theta + FRAC_PI_2;
    Some(if quadratic(alt) > quadratic(theta) { alt } else { theta })
}

// ============================================================================
// ADVECTION
// ============================================================================

/// Upstream sample position of pixel `(x, y)` and its four bracketing lattice
/// points, or `None` when any of them is outside the raster.
#[inline]
fn upstream(field: &VectorField, x: u32, y: u32, step: f64) -> Option<(f64, f64, usize, usize)> {
    let (vx, vy) = field.get(x, y);
    let nx = x as f64 + step * vx;
    let ny = y as f64 + step * vy;
    let x1 = nx.floor();
    let y1 = ny.floor();
    if x1 < 0.0
        || y1 < 0.0
        || x1 + 1.0 >= field.width() as f64
        || y1 + 1.0 >= field.height() as f64
    {
        return None;
    }
    Some((nx - x1, ny - y1, x1 as usize, y1 as usize))
}

#[inline]
fn bilinear(c11: f64, c21: f64, c12: f64, c22: f64, fx: f64, fy: f64) -> f64 {
    c11 * (1.0 - fx) * (1.0 - fy) + c21 * fx * (1.0 - fy) + c12 * (1.0 - fx) * fy + c22 * fx * fy
}

/// One Euler step of `src` along `field`, written into `dst`. Pixels whose
/// upstream position is not fully inside the raster keep their `dst` value.
pub fn advect<B: Raster>(src: &B, dst: &mut B, field: &VectorField, step: f64) {
    let ch = B::CHANNELS;
    let stride = src.stride();
    let raw = src.as_raw();
    for y in 0..src.height() {
        for x in 0..src.width() {
            let Some((fx, fy, x1, y1)) = upstream(field, x, y, step) else {
                continue;
            };
            let top = y1 * stride + x1 * ch;
            let bottom = top + stride;
            let out = (y as usize * src.width() as usize + x as usize) * ch;
            for c in 0..ch {
                let v = bilinear(
                    raw[top + c] as f64,
                    raw[top + ch + c] as f64,
                    raw[bottom + c] as f64,
                    raw[bottom + ch + c] as f64,
                    fx,
                    fy,
                );
                dst.as_raw_mut()[out + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// One Euler step of the field along itself; out-of-bounds samples are 0.
fn advect_field(field: &VectorField, step: f64) -> VectorField {
    let (w, h) = (field.width(), field.height());
    let mut out = VectorField::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let Some((fx, fy, x1, y1)) = upstream(field, x, y, step) else {
                continue;
            };
            let i11 = y1 * w as usize + x1;
            let i12 = i11 + w as usize;
            let sample = |p: &[f64]| bilinear(p[i11], p[i11 + 1], p[i12], p[i12 + 1], fx, fy);
            let (vx, vy) = (sample(&field.x), sample(&field.y));
            out.set(x, y, (vx, vy));
        }
    }
    out
}

/// Advect image and height field together, keeping upstream values wherever
/// the upstream height is at least the current one; then compose the flow
/// with itself for the next round.
fn follow_flow(
    image: &mut PixelBuffer,
    noise: &mut GrayBuffer,
    field: &mut VectorField,
    iterations: u32,
    step: f64,
) {
    for _ in 0..iterations {
        let mut noise_up = noise.clone();
        let mut image_up = image.clone();
        advect(noise, &mut noise_up, field, step);
        advect(image, &mut image_up, field, step);

        for (i, (z, &z_up)) in noise.as_raw_mut().iter_mut().zip(noise_up.as_raw()).enumerate() {
            if *z <= z_up {
                *z = z_up;
                let px = i * 4;
                image.as_raw_mut()[px..px + 4].copy_from_slice(&image_up.as_raw()[px..px + 4]);
            }
        }

        let upstream_field = advect_field(field, step);
        add_planes(&mut field.x, &upstream_field.x);
        add_planes(&mut field.y, &upstream_field.y);
    }
}
