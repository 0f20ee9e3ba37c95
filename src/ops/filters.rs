// ============================================================================
// IMAGE PROCESSING: convolution, blurs, Sobel, Canny, channel conversion
// ============================================================================
//
// Every function here is pure: it reads its input raster and returns a freshly
// allocated raster of the same dimensions. Border taps are clamped to the
// nearest valid coordinate (edge replication), never wrapped, and every
// accumulated channel value is rounded and clamped to 0..=255.
// ============================================================================

use std::f64::consts::PI;

use crate::canvas::{GrayBuffer, PixelBuffer, Raster, clamp_coord};

/// Default blur kernel width.
pub const DEFAULT_KERNEL_SIZE: usize = 5;
/// Default Gaussian standard deviation.
pub const DEFAULT_SIGMA: f64 = 1.5;

/// Row-major 3×3 Sobel kernels (x points right, y points up).
pub const SOBEL_X: [f64; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
pub const SOBEL_Y: [f64; 9] = [1.0, 2.0, 1.0, 0.0, 0.0, 0.0, -1.0, -2.0, -1.0];

#[inline]
fn to_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// KERNELS
// ============================================================================

/// 1-D Gaussian kernel of `size` taps with weights
/// `exp(-d²/2σ²) / 2πσ²`, normalized so the weights sum to 1.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f64> {
    let size = size.max(1);
    if sigma <= 0.0 || !sigma.is_finite() {
        // Degenerate sigma collapses onto the centre tap.
        let mut k = vec![0.0; size];
        k[size / 2] = 1.0;
        return k;
    }
    let s_const = 1.0 / (2.0 * PI * sigma * sigma);
    let half = (size / 2) as f64;
    let mut kernel: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            s_const * (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Uniform 1-D kernel.
pub fn box_kernel(size: usize) -> Vec<f64> {
    let size = size.max(1);
    vec![1.0 / size as f64; size]
}

// ============================================================================
// CONVOLUTION
// ============================================================================

/// Convolve every row with a 1-D kernel.
pub fn horizontal_convolve<B: Raster>(src: &B, kernel: &[f64]) -> B {
    let (w, h) = (src.width(), src.height());
    let mut dst = B::blank(w, h);
    if src.is_empty() || kernel.is_empty() {
        return dst;
    }
    let ch = B::CHANNELS;
    let half = (kernel.len() / 2) as i32;
    let stride = src.stride();
    let src_raw = src.as_raw();
    let dst_raw = dst.as_raw_mut();

    for y in 0..h as usize {
        let row = y * stride;
        for x in 0..w as i32 {
            for c in 0..ch {
                let mut total = 0.0;
                for (k, &kv) in kernel.iter().enumerate() {
                    let sx = clamp_coord(x + k as i32 - half, w) as usize;
                    total += src_raw[row + sx * ch + c] as f64 * kv;
                }
                dst_raw[row + x as usize * ch + c] = to_channel(total);
            }
        }
    }
    dst
}

/// Convolve every column with a 1-D kernel.
pub fn vertical_convolve<B: Raster>(src: &B, kernel: &[f64]) -> B {
    let (w, h) = (src.width(), src.height());
    let mut dst = B::blank(w, h);
    if src.is_empty() || kernel.is_empty() {
        return dst;
    }
    let ch = B::CHANNELS;
    let half = (kernel.len() / 2) as i32;
    let stride = src.stride();
    let src_raw = src.as_raw();
    let dst_raw = dst.as_raw_mut();

    for y in 0..h as i32 {
        for x in 0..w as usize {
            for c in 0..ch {
                let mut total = 0.0;
                for (k, &kv) in kernel.iter().enumerate() {
                    let sy = clamp_coord(y + k as i32 - half, h) as usize;
                    total += src_raw[sy * stride + x * ch + c] as f64 * kv;
                }
                dst_raw[y as usize * stride + x * ch + c] = to_channel(total);
            }
        }
    }
    dst
}

/// Horizontal pass followed by a vertical pass with the same 1-D kernel.
pub fn separable_convolve<B: Raster>(src: &B, kernel: &[f64]) -> B {
    let tmp = horizontal_convolve(src, kernel);
    vertical_convolve(&tmp, kernel)
}

/// Convolve with a `size × size` kernel stored row-major.
pub fn convolve_2d<B: Raster>(src: &B, kernel: &[f64], size: usize) -> B {
    let (w, h) = (src.width(), src.height());
    let mut dst = B::blank(w, h);
    if src.is_empty() || size == 0 || kernel.len() < size * size {
        return dst;
    }
    let ch = B::CHANNELS;
    let half = (size / 2) as i32;
    let stride = src.stride();
    let src_raw = src.as_raw();
    let dst_raw = dst.as_raw_mut();

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            for c in 0..ch {
                let mut total = 0.0;
                for ky in 0..size {
                    let sy = clamp_coord(y + ky as i32 - half, h) as usize;
                    for kx in 0..size {
                        let sx = clamp_coord(x + kx as i32 - half, w) as usize;
                        total += src_raw[sy * stride + sx * ch + c] as f64 * kernel[ky * size + kx];
                    }
                }
                dst_raw[y as usize * stride + x as usize * ch + c] = to_channel(total);
            }
        }
    }
    dst
}

/// Signed 3×3 convolution of a one-channel image (no clamping of the result).
fn convolve_3x3_signed(src: &GrayBuffer, kernel: &[f64; 9]) -> Vec<f64> {
    let (w, h) = (src.width(), src.height());
    let mut out = vec![0.0; w as usize * h as usize];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut total = 0.0;
            for ky in 0..3 {
                for kx in 0..3 {
                    total += src.get_clamped(x + kx - 1, y + ky - 1) as f64
                        * kernel[(ky * 3 + kx) as usize];
                }
            }
            out[y as usize * w as usize + x as usize] = total;
        }
    }
    out
}

// ============================================================================
// BLURS
// ============================================================================

/// Separable box blur with a uniform kernel.
pub fn box_blur<B: Raster>(src: &B, kernel_size: usize) -> B {
    separable_convolve(src, &box_kernel(kernel_size))
}

/// Separable Gaussian blur.
pub fn gaussian_blur<B: Raster>(src: &B, kernel_size: usize, sigma: f64) -> B {
    separable_convolve(src, &gaussian_kernel(kernel_size, sigma))
}

/// Smallest odd kernel width that is at least `size` (and at least `min`).
pub fn odd_kernel_size(size: i32, min: i32) -> usize {
    let k = size.max(min).max(1);
    if k % 2 == 0 { (k + 1) as usize } else { k as usize }
}

// ============================================================================
// CHANNEL CONVERSION / ARITHMETIC
// ============================================================================

/// Average all non-alpha channels into a one-channel image.
pub fn to_gray<B: Raster>(src: &B) -> GrayBuffer {
    let (w, h) = (src.width(), src.height());
    let ch = B::CHANNELS;
    let colour_channels = match B::ALPHA {
        Some(_) if ch > 1 => ch - 1,
        _ => ch,
    };
    let data = src
        .as_raw()
        .chunks_exact(ch)
        .map(|px| {
            let sum: f64 = px
                .iter()
                .enumerate()
                .filter(|&(c, _)| B::ALPHA != Some(c) || ch == 1)
                .map(|(_, &v)| v as f64)
                .sum();
            to_channel(sum / colour_channels as f64)
        })
        .collect();
    GrayBuffer::from_raw(w, h, data).unwrap_or_else(|| GrayBuffer::new(w, h))
}

/// Broadcast a one-channel image to RGBA with opaque alpha.
pub fn from_gray(src: &GrayBuffer) -> PixelBuffer {
    let (w, h) = (src.width(), src.height());
    let mut data = Vec::with_capacity(src.as_raw().len() * 4);
    for &v in src.as_raw() {
        data.extend_from_slice(&[v, v, v, 255]);
    }
    PixelBuffer::from_raw(w, h, data).unwrap_or_else(|| PixelBuffer::new(w, h))
}

/// Per-channel saturating sum of two equal-size rasters.
pub fn add_images<B: Raster>(a: &B, b: &B) -> B {
    let mut out = a.clone();
    for (o, &v) in out.as_raw_mut().iter_mut().zip(b.as_raw()) {
        *o = o.saturating_add(v);
    }
    out
}

/// In-place element-wise sum of two floating-point planes (no clipping).
pub fn add_planes(acc: &mut [f64], other: &[f64]) {
    for (a, &b) in acc.iter_mut().zip(other) {
        *a += b;
    }
}

// ============================================================================
// SOBEL
// ============================================================================

/// Gradient magnitude and direction maps from the Sobel operator.
#[derive(Clone, Debug)]
pub struct SobelGradient {
    /// `|gx| + |gy|`, each term and the sum clipped to 255.
    pub magnitude: GrayBuffer,
    /// Gradient direction in whole degrees, `0..180`.
    pub direction: GrayBuffer,
}

/// Direction of a gradient in degrees, folded onto `0..180`.
///
/// 0° when both components vanish, 90° for a purely vertical gradient.
pub fn gradient_direction(gx: f64, gy: f64) -> u8 {
    if gx == 0.0 {
        return if gy == 0.0 { 0 } else { 90 };
    }
    let mut deg = (gy / gx).atan() * 180.0 / PI;
    if deg < 0.0 {
        deg += 180.0;
    }
    (deg.round() as u32 % 180) as u8
}

fn sobel_components<B: Raster>(src: &B) -> (GrayBuffer, Vec<f64>, Vec<f64>) {
    let gray = to_gray(src);
    let gx = convolve_3x3_signed(&gray, &SOBEL_X);
    let gy = convolve_3x3_signed(&gray, &SOBEL_Y);
    (gray, gx, gy)
}

fn combined_magnitude(gx: f64, gy: f64) -> u8 {
    let mx = gx.abs().min(255.0);
    let my = gy.abs().min(255.0);
    to_channel(mx + my)
}

/// Sobel gradient magnitude of the luminance of `src`.
pub fn sobel_magnitude<B: Raster>(src: &B) -> GrayBuffer {
    let (mut gray, gx, gy) = sobel_components(src);
    for (m, (&x, &y)) in gray.as_raw_mut().iter_mut().zip(gx.iter().zip(&gy)) {
        *m = combined_magnitude(x, y);
    }
    gray
}

/// Sobel gradient magnitude and direction of the luminance of `src`.
pub fn sobel<B: Raster>(src: &B) -> SobelGradient {
    let (mut magnitude, gx, gy) = sobel_components(src);
    let mut direction = GrayBuffer::new(src.width(), src.height());
    for (i, (&x, &y)) in gx.iter().zip(&gy).enumerate() {
        magnitude.as_raw_mut()[i] = combined_magnitude(x, y);
        direction.as_raw_mut()[i] = gradient_direction(x, y);
    }
    SobelGradient { magnitude, direction }
}

// ============================================================================
// CANNY
// ============================================================================

const EDGE: u8 = 255;
const MAYBE_EDGE: u8 = 100;

/// Tunables for [`canny`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CannyParams {
    pub blur_size: usize,
    pub sigma: f64,
    /// Magnitudes at or above this are definite edges.
    pub max_threshold: u8,
    /// Magnitudes at or above this (and below max) are possible edges.
    pub min_threshold: u8,
}

impl Default for CannyParams {
    fn default() -> Self {
        Self {
            blur_size: DEFAULT_KERNEL_SIZE,
            sigma: DEFAULT_SIGMA,
            max_threshold: 80,
            min_threshold: 20,
        }
    }
}

/// Canny edge detection: blur → Sobel → non-maximum suppression → hysteresis.
/// The result is binary: 255 on edges, 0 elsewhere.
pub fn canny<B: Raster>(src: &B, params: &CannyParams) -> GrayBuffer {
    let smoothed = gaussian_blur(src, params.blur_size, params.sigma);
    let gradient = sobel(&smoothed);
    let mut edges = non_maximum_suppression(&gradient);
    hysteresis(&mut edges, params.max_threshold, params.min_threshold);
    edges
}

/// Neighbour offset to compare against for a quantized direction.
fn search_offset(direction: u8) -> (i32, i32) {
    let d = direction as f64 % 180.0;
    if d > 22.5 && d <= 67.5 {
        (1, 1)
    } else if d > 67.5 && d <= 112.5 {
        (0, 1)
    } else if d > 112.5 && d <= 157.5 {
        (-1, 1)
    } else {
        (1, 0)
    }
}

/// Zero every magnitude that has a strictly stronger neighbour along its
/// search direction.
fn non_maximum_suppression(gradient: &SobelGradient) -> GrayBuffer {
    let mag = &gradient.magnitude;
    let (w, h) = (mag.width() as i32, mag.height() as i32);
    let mut edges = mag.clone();
    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = search_offset(gradient.direction.get(x as u32, y as u32));
            let here = mag.get(x as u32, y as u32);
            for (nx, ny) in [(x - dx, y - dy), (x + dx, y + dy)] {
                if nx >= 0 && ny >= 0 && nx < w && ny < h && mag.get(nx as u32, ny as u32) > here {
                    edges.set(x as u32, y as u32, 0);
                }
            }
        }
    }
    edges
}

/// Double threshold, then promote possible edges that are 8-connected to a
/// definite edge until nothing changes; leftover possible edges are dropped.
fn hysteresis(edges: &mut GrayBuffer, max_threshold: u8, min_threshold: u8) {
    let (w, h) = (edges.width() as i32, edges.height() as i32);
    let mut frontier: Vec<(i32, i32)> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let v = edges.get(x as u32, y as u32);
            let class = if v >= max_threshold {
                frontier.push((x, y));
                EDGE
            } else if v >= min_threshold {
                MAYBE_EDGE
            } else {
                0
            };
            edges.set(x as u32, y as u32, class);
        }
    }

    // Flood outwards from definite edges; reaches the same fixed point as
    // repeated full sweeps.
    while let Some((x, y)) = frontier.pop() {
        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    continue;
                }
                if edges.get(nx as u32, ny as u32) == MAYBE_EDGE {
                    edges.set(nx as u32, ny as u32, EDGE);
                    frontier.push((nx, ny));
                }
            }
        }
    }

    for v in edges.as_raw_mut() {
        if *v != EDGE {
            *v = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_image(rng: &mut StdRng, w: u32, h: u32) -> PixelBuffer {
        let data = (0..w as usize * h as usize * 4).map(|_| rng.random::<u8>()).collect();
        PixelBuffer::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn gaussian_kernel_sums_to_one() {
        for size in 1..16 {
            for sigma in [0.3, 1.0, 1.5, 4.0, 12.0] {
                let sum: f64 = gaussian_kernel(size, sigma).iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "size {size} sigma {sigma}: {sum}");
            }
        }
    }

    #[test]
    fn gaussian_kernel_is_symmetric_and_peaked() {
        let k = gaussian_kernel(5, 1.5);
        assert!((k[0] - k[4]).abs() < 1e-12);
        assert!((k[1] - k[3]).abs() < 1e-12);
        assert!(k[2] > k[1] && k[1] > k[0]);
    }

    #[test]
    fn blur_preserves_uniform_colour() {
        let src = PixelBuffer::filled(9, 6, [200, 10, 77, 255]);
        assert_eq!(gaussian_blur(&src, 5, 1.5), src);
        assert_eq!(box_blur(&src, 3), src);
    }

    #[test]
    fn convolution_output_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let src = noise_image(&mut rng, 13, 11);
        // Kernels with large positive and negative weights.
        let sharpen = [0.0, -4.0, 0.0, -4.0, 17.0, -4.0, 0.0, -4.0, 0.0];
        let out = convolve_2d(&src, &sharpen, 3);
        assert_eq!(out.as_raw().len(), src.as_raw().len());
        let stretched = separable_convolve(&src, &[3.0, -1.0, 3.0]);
        assert_eq!((stretched.width(), stretched.height()), (13, 11));
        // Every byte is 0..=255 by type; the interesting property is that
        // saturation happened at both ends instead of wrapping.
        assert!(out.as_raw().iter().any(|&v| v == 0));
        assert!(stretched.as_raw().iter().any(|&v| v == 255));
    }

    #[test]
    fn border_taps_replicate_edge() {
        // Single bright column on the left border; a box blur must not pull in
        // dark wrapped values from the right border.
        let mut src = GrayBuffer::new(5, 1);
        src.set(0, 0, 250);
        let out = horizontal_convolve(&src, &box_kernel(3));
        // Taps at x=0 are [clamp(-1)=0, 0, 1] → (250 + 250 + 0) / 3.
        assert_eq!(out.get(0, 0), 167);
        assert_eq!(out.get(4, 0), 0);
    }

    #[test]
    fn gray_conversion_ignores_alpha() {
        let src = PixelBuffer::filled(2, 2, [30, 60, 90, 0]);
        let gray = to_gray(&src);
        assert!(gray.as_raw().iter().all(|&v| v == 60));
        let back = from_gray(&gray);
        assert_eq!(back.pixel(1, 1), [60, 60, 60, 255]);
    }

    #[test]
    fn add_images_saturates() {
        let a = PixelBuffer::filled(2, 1, [200, 10, 0, 255]);
        let b = PixelBuffer::filled(2, 1, [100, 10, 0, 255]);
        assert_eq!(add_images(&a, &b).pixel(0, 0), [255, 20, 0, 255]);
    }

    #[test]
    fn add_planes_is_unclipped() {
        let mut acc = vec![1.5, -2.0, 300.0];
        add_planes(&mut acc, &[0.5, -1.0, 300.0]);
        assert_eq!(acc, vec![2.0, -3.0, 600.0]);
    }

    #[test]
    fn gradient_direction_special_cases() {
        assert_eq!(gradient_direction(0.0, 0.0), 0);
        assert_eq!(gradient_direction(0.0, -3.0), 90);
        assert_eq!(gradient_direction(5.0, 5.0), 45);
        assert_eq!(gradient_direction(-5.0, 5.0), 135);
        assert_eq!(gradient_direction(5.0, 0.0), 0);
    }

    #[test]
    fn sobel_detects_vertical_step() {
        let mut src = PixelBuffer::filled(8, 8, [0, 0, 0, 255]);
        for y in 0..8 {
            for x in 4..8 {
                src.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        let g = sobel(&src);
        assert_eq!(g.magnitude.get(0, 4), 0);
        assert_eq!(g.magnitude.get(4, 4), 255);
        assert_eq!(g.direction.get(4, 4), 0);
        assert_eq!(sobel_magnitude(&src), g.magnitude);
    }

    #[test]
    fn canny_output_is_binary_and_stable() {
        let mut rng = StdRng::seed_from_u64(11);
        let src = noise_image(&mut rng, 24, 20);
        let params = CannyParams::default();
        let edges = canny(&src, &params);
        assert!(edges.as_raw().iter().all(|&v| v == 0 || v == 255));
        let again = canny(&edges, &params);
        assert!(again.as_raw().iter().all(|&v| v == 0 || v == 255));
        assert!(!again.as_raw().contains(&MAYBE_EDGE));
    }

    #[test]
    fn canny_finds_square_outline() {
        let mut src = PixelBuffer::filled(32, 32, [0, 0, 0, 255]);
        for y in 10..22 {
            for x in 10..22 {
                src.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        let edges = canny(&src, &CannyParams::default());
        assert!(edges.as_raw().iter().filter(|&&v| v == 255).count() > 20);
        assert_eq!(edges.get(0, 0), 0);
        assert_eq!(edges.get(16, 16), 0);
    }

    #[test]
    fn hysteresis_promotes_connected_maybe_edges_only() {
        let mut edges = GrayBuffer::from_raw(5, 1, vec![90, 50, 50, 5, 50]).unwrap();
        hysteresis(&mut edges, 80, 20);
        assert_eq!(edges.as_raw(), &[255, 255, 255, 0, 0]);
    }

    #[test]
    fn odd_kernel_size_rounds_up() {
        assert_eq!(odd_kernel_size(4, 1), 5);
        assert_eq!(odd_kernel_size(7, 1), 7);
        assert_eq!(odd_kernel_size(1, 3), 3);
        assert_eq!(odd_kernel_size(0, 1), 1);
    }
}
