// ============================================================================
// COLOR SPACE HELPERS
// ============================================================================

/// Squared Euclidean distance between two colours in RGB (alpha ignored).
#[inline]
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    dr * dr + dg * dg + db * db
}

/// Weighted luminance (0.30 R + 0.59 G + 0.11 B), 0..255.
#[inline]
pub fn luminance(rgb: [u8; 3]) -> f64 {
    rgb[0] as f64 * 0.3 + rgb[1] as f64 * 0.59 + rgb[2] as f64 * 0.11
}

/// Integer HSV colour.
///
/// `hue` is in degrees `0..360` (achromatic colours report 0), `saturation`
/// and `value` are `0..=255`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hsv {
    pub hue: i32,
    pub saturation: i32,
    pub value: i32,
}

impl Hsv {
    pub fn new(hue: i32, saturation: i32, value: i32) -> Self {
        Self {
            hue: hue.rem_euclid(360),
            saturation: saturation.clamp(0, 255),
            value: value.clamp(0, 255),
        }
    }

    /// RGB (0..255) → HSV.
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let r = rgb[0] as f64;
        let g = rgb[1] as f64;
        let b = rgb[2] as f64;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let value = max.round() as i32;
        if delta <= 0.0 || max <= 0.0 {
            return Self { hue: 0, saturation: 0, value };
        }
        let saturation = (255.0 * delta / max).round() as i32;

        let mut h = if max == r {
            (g - b) / delta
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        h *= 60.0;
        if h < 0.0 {
            h += 360.0;
        }
        Self {
            hue: (h.round() as i32).rem_euclid(360),
            saturation,
            value,
        }
    }

    /// HSV → RGB (0..255).
    pub fn to_rgb(self) -> [u8; 3] {
        let v = self.value.clamp(0, 255) as f64 / 255.0;
        let s = self.saturation.clamp(0, 255) as f64 / 255.0;
        if s <= 0.0 {
            let c = (v * 255.0).round() as u8;
            return [c, c, c];
        }
        let h = self.hue.rem_euclid(360) as f64 / 60.0;
        let sector = h.floor();
        let f = h - sector;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match sector as i32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        [
            (r * 255.0).round().clamp(0.0, 255.0) as u8,
            (g * 255.0).round().clamp(0.0, 255.0) as u8,
            (b * 255.0).round().clamp(0.0, 255.0) as u8,
        ]
    }

    /// Brightness as a fraction in `0.0..=1.0`.
    #[inline]
    pub fn brightness(self) -> f64 {
        self.value as f64 / 255.0
    }
}

/// Shortest distance between two hues around the 360° wheel.
#[inline]
pub fn hue_distance(a: i32, b: i32) -> i32 {
    let d = (a - b).rem_euclid(360);
    d.min(360 - d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_squared_euclidean() {
        assert_eq!(color_distance([0, 0, 0], [3, 4, 0]), 25.0);
        assert_eq!(color_distance([10, 10, 10], [10, 10, 10]), 0.0);
        assert_eq!(color_distance([255, 0, 0], [0, 0, 0]), 65025.0);
    }

    #[test]
    fn primaries_convert_to_expected_hues() {
        assert_eq!(Hsv::from_rgb([255, 0, 0]), Hsv { hue: 0, saturation: 255, value: 255 });
        assert_eq!(Hsv::from_rgb([0, 255, 0]).hue, 120);
        assert_eq!(Hsv::from_rgb([0, 0, 255]).hue, 240);
        assert_eq!(Hsv::from_rgb([255, 255, 0]).hue, 60);
    }

    #[test]
    fn gray_has_no_saturation() {
        let hsv = Hsv::from_rgb([128, 128, 128]);
        assert_eq!((hsv.hue, hsv.saturation, hsv.value), (0, 0, 128));
        assert_eq!(hsv.to_rgb(), [128, 128, 128]);
    }

    #[test]
    fn round_trip_stays_close() {
        for rgb in [[12, 200, 99], [250, 3, 140], [77, 77, 200], [1, 2, 3], [240, 230, 10]] {
            let back = Hsv::from_rgb(rgb).to_rgb();
            for c in 0..3 {
                assert!((rgb[c] as i32 - back[c] as i32).abs() <= 3, "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn hue_distance_wraps() {
        assert_eq!(hue_distance(5, 355), 10);
        assert_eq!(hue_distance(355, 5), 10);
        assert_eq!(hue_distance(90, 270), 180);
        assert_eq!(hue_distance(40, 40), 0);
    }

    #[test]
    fn new_normalizes_ranges() {
        assert_eq!(Hsv::new(-20, 300, -1), Hsv { hue: 340, saturation: 255, value: 0 });
    }
}
