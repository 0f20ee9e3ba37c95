use image::RgbaImage;

/// Channels per pixel of a [`PixelBuffer`] (R, G, B, A).
pub const CHANNELS: usize = 4;
/// Index of the alpha channel inside an RGBA pixel.
pub const ALPHA_CHANNEL: usize = 3;

// ============================================================================
// RASTER TRAIT – common view over the interleaved byte buffers
// ============================================================================

/// A row-major, interleaved byte raster of fixed size.
///
/// The numeric kernels in [`crate::ops::filters`] are written once against this
/// trait and work for both the RGBA [`PixelBuffer`] and the one-channel
/// [`GrayBuffer`].
pub trait Raster: Clone {
    /// Interleaved channels per pixel.
    const CHANNELS: usize;
    /// Index of the alpha channel, if the layout has one.
    const ALPHA: Option<usize>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn as_raw(&self) -> &[u8];
    fn as_raw_mut(&mut self) -> &mut [u8];

    /// A zero-filled raster of the given size.
    fn blank(width: u32, height: u32) -> Self;

    #[inline]
    fn stride(&self) -> usize {
        self.width() as usize * Self::CHANNELS
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Clamp a signed coordinate onto `0..len` (edge replication).
#[inline]
pub fn clamp_coord(v: i32, len: u32) -> u32 {
    if len == 0 {
        return 0;
    }
    v.clamp(0, len as i32 - 1) as u32
}

// ============================================================================
// PIXEL BUFFER – RGBA8 image owned by a filter invocation
// ============================================================================

/// A `width × height` grid of RGBA8 pixels.
///
/// `data.len() == width * height * 4` always holds; the dimensions never
/// change after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// Fully transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS],
        }
    }

    /// Buffer where every pixel is `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    /// Wrap an existing interleaved RGBA buffer. Returns `None` when the length
    /// does not match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * CHANNELS {
            return None;
        }
        Some(Self { width, height, data })
    }

    pub fn from_rgba_image(src: &RgbaImage) -> Self {
        Self {
            width: src.width(),
            height: src.height(),
            data: src.as_raw().clone(),
        }
    }

    pub fn into_rgba_image(self) -> RgbaImage {
        let (w, h) = (self.width, self.height);
        // Length invariant is upheld by every constructor.
        RgbaImage::from_raw(w, h, self.data).unwrap_or_else(|| RgbaImage::new(w, h))
    }

    // ---- access -------------------------------------------------------------

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * CHANNELS
    }

    /// Pixel at an in-bounds coordinate.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Pixel with clamp-to-border addressing.
    #[inline]
    pub fn pixel_clamped(&self, x: i32, y: i32) -> [u8; 4] {
        self.pixel(clamp_coord(x, self.width), clamp_coord(y, self.height))
    }

    /// RGB part of an in-bounds pixel.
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Mean of each channel over the whole buffer.
    pub fn mean_channels(&self) -> [f64; 4] {
        let mut sums = [0.0f64; 4];
        for px in self.data.chunks_exact(CHANNELS) {
            for c in 0..CHANNELS {
                sums[c] += px[c] as f64;
            }
        }
        let n = (self.width as usize * self.height as usize).max(1) as f64;
        sums.map(|s| s / n)
    }
}

impl Raster for PixelBuffer {
    const CHANNELS: usize = CHANNELS;
    const ALPHA: Option<usize> = Some(ALPHA_CHANNEL);

    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn as_raw(&self) -> &[u8] {
        &self.data
    }
    fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
    fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height)
    }
}

// ============================================================================
// GRAY BUFFER – one-channel luminance / edge map
// ============================================================================

/// A `width × height` grid of single bytes (luminance, edge strength, noise).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        self.get(clamp_coord(x, self.width), clamp_coord(y, self.height))
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: u8) {
        let w = self.width as usize;
        self.data[y as usize * w + x as usize] = v;
    }
}

impl Raster for GrayBuffer {
    const CHANNELS: usize = 1;
    const ALPHA: Option<usize> = None;

    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn as_raw(&self) -> &[u8] {
        &self.data
    }
    fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
    fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height)
    }
}

// ============================================================================
// DEPTH BUFFER – randomized painting order without shuffling
// ============================================================================

/// Per-pixel "z" of the most recent stroke written at that pixel.
///
/// Last write wins by strictly greater depth: a stroke with depth `z` may only
/// overwrite a pixel whose stored depth is `< z`. Giving each stroke a random
/// depth makes the strokes look as if they were painted in random order while
/// they are actually painted in scan order. A depth of `0` therefore never
/// paints on a freshly cleared buffer.
#[derive(Clone, Debug)]
pub struct DepthBuffer {
    width: u32,
    height: u32,
    depths: Vec<u8>,
}

impl DepthBuffer {
    /// All-zero buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depths: vec![0; width as usize * height as usize],
        }
    }

    /// Reset every pixel to depth 0 (start of a brush pass / layer).
    pub fn clear(&mut self) {
        self.depths.fill(0);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn depth(&self, x: u32, y: u32) -> u8 {
        self.depths[y as usize * self.width as usize + x as usize]
    }

    /// Record `z` at `(x, y)` if it is strictly above the stored depth.
    /// Returns whether the pixel was claimed.
    #[inline]
    pub fn test_and_set(&mut self, x: u32, y: u32, z: u8) -> bool {
        let i = y as usize * self.width as usize + x as usize;
        if z > self.depths[i] {
            self.depths[i] = z;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// VECTOR FIELD – one f64 vector per pixel
// ============================================================================

/// Two parallel `width × height` planes holding the x and y components of a
/// per-pixel vector.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    width: u32,
    height: u32,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl VectorField {
    /// Zero field.
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            x: vec![0.0; n],
            y: vec![0.0; n],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, px: u32, py: u32) -> (f64, f64) {
        let i = py as usize * self.width as usize + px as usize;
        (self.x[i], self.y[i])
    }

    #[inline]
    pub fn set(&mut self, px: u32, py: u32, v: (f64, f64)) {
        let i = py as usize * self.width as usize + px as usize;
        self.x[i] = v.0;
        self.y[i] = v.1;
    }

    /// True when every vector is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.x.iter().chain(self.y.iter()).all(|&v| v == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_rejects_length_mismatch() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 15]).is_none());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(GrayBuffer::from_raw(3, 1, vec![0; 2]).is_none());
    }

    #[test]
    fn clamped_access_replicates_edges() {
        let mut buf = PixelBuffer::new(3, 2);
        buf.set_pixel(0, 0, [10, 20, 30, 255]);
        buf.set_pixel(2, 1, [1, 2, 3, 4]);
        assert_eq!(buf.pixel_clamped(-5, -5), [10, 20, 30, 255]);
        assert_eq!(buf.pixel_clamped(99, 99), [1, 2, 3, 4]);
    }

    #[test]
    fn rgba_image_round_trip_keeps_dimensions() {
        let buf = PixelBuffer::filled(7, 3, [9, 8, 7, 6]);
        let img = buf.clone().into_rgba_image();
        assert_eq!((img.width(), img.height()), (7, 3));
        assert_eq!(PixelBuffer::from_rgba_image(&img), buf);
    }

    #[test]
    fn depth_buffer_requires_strictly_greater_depth() {
        let mut depth = DepthBuffer::new(2, 2);
        assert!(!depth.test_and_set(0, 0, 0));
        assert!(depth.test_and_set(0, 0, 5));
        assert!(!depth.test_and_set(0, 0, 5));
        assert!(!depth.test_and_set(0, 0, 4));
        assert!(depth.test_and_set(0, 0, 6));
        depth.clear();
        assert_eq!(depth.depth(0, 0), 0);
    }

    #[test]
    fn mean_channels_of_uniform_buffer() {
        let buf = PixelBuffer::filled(4, 4, [100, 50, 0, 255]);
        assert_eq!(buf.mean_channels(), [100.0, 50.0, 0.0, 255.0]);
    }
}
