// ============================================================================
// FILTER REGISTRY: name lookup and static dispatch over the three filters
// ============================================================================
//
// A `Filter` is built per invocation, carries its own parameter set and keeps
// no state between calls. All randomness comes from the caller's generator.
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rand::Rng;

use crate::canvas::PixelBuffer;
use crate::error::{Error, Result};
use crate::ops::glass_patterns::{self, GlassPatternsParams};
use crate::ops::layered_strokes::{self, LayeredStrokesParams, StrokeStats};
use crate::ops::pointillism::{self, PointillismParams, PointillismStats};

/// The available stylization filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    LayeredStrokes,
    Pointillism,
    GlassPatterns,
}

impl FilterKind {
    pub const ALL: [FilterKind; 3] = [
        FilterKind::LayeredStrokes,
        FilterKind::Pointillism,
        FilterKind::GlassPatterns,
    ];

    /// Stable registry key.
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::LayeredStrokes => "layered_strokes",
            FilterKind::Pointillism => "pointillism",
            FilterKind::GlassPatterns => "glass_patterns",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            FilterKind::LayeredStrokes => "Layered Strokes",
            FilterKind::Pointillism => "Pointillism",
            FilterKind::GlassPatterns => "Glass Patterns",
        }
    }

    /// One-line summary for `--list-filters`.
    pub fn description(&self) -> &'static str {
        match self {
            FilterKind::LayeredStrokes => {
                "curved brush strokes painted in three passes of decreasing size"
            }
            FilterKind::Pointillism => "palette-restricted dots in base, detail and edge layers",
            FilterKind::GlassPatterns => "colours smeared along flow lines of the image structure",
        }
    }

    /// Resolve a registry key. Case-insensitive; `-` and spaces count as `_`.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        Self::ALL.into_iter().find(|k| k.name() == key)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s).ok_or_else(|| Error::UnknownFilter(s.to_string()))
    }
}

/// A filter together with its parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    LayeredStrokes(LayeredStrokesParams),
    Pointillism(PointillismParams),
    GlassPatterns(GlassPatternsParams),
}

/// What a filter run painted, for logging and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterSummary {
    Strokes(StrokeStats),
    Dots(PointillismStats),
    Flow,
}

impl fmt::Display for FilterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSummary::Strokes(s) => write!(
                f,
                "{} strokes ({} / {} / {})",
                s.total(),
                s.strokes_per_pass[0],
                s.strokes_per_pass[1],
                s.strokes_per_pass[2]
            ),
            FilterSummary::Dots(d) => write!(
                f,
                "{} dots (base {}, main {}, edge {})",
                d.total(),
                d.base_dots,
                d.main_dots,
                d.edge_dots
            ),
            FilterSummary::Flow => f.write_str("flow advection"),
        }
    }
}

impl Filter {
    /// The filter with its documented default parameters.
    pub fn with_defaults(kind: FilterKind) -> Self {
        match kind {
            FilterKind::LayeredStrokes => Filter::LayeredStrokes(LayeredStrokesParams::default()),
            FilterKind::Pointillism => Filter::Pointillism(PointillismParams::default()),
            FilterKind::GlassPatterns => Filter::GlassPatterns(GlassPatternsParams::default()),
        }
    }

    /// Look up a filter by registry key, with default parameters.
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::with_defaults(name.parse()?))
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::LayeredStrokes(_) => FilterKind::LayeredStrokes,
            Filter::Pointillism(_) => FilterKind::Pointillism,
            Filter::GlassPatterns(_) => FilterKind::GlassPatterns,
        }
    }

    /// Same filter with every parameter clamped into its range.
    pub fn clamped(self) -> Self {
        match self {
            Filter::LayeredStrokes(p) => Filter::LayeredStrokes(p.clamped()),
            Filter::Pointillism(p) => Filter::Pointillism(p.clamped()),
            Filter::GlassPatterns(p) => Filter::GlassPatterns(p.clamped()),
        }
    }

    /// Transform `src` into a new image of the same size. `src` is not modified.
    pub fn apply<R: Rng + ?Sized>(&self, src: &PixelBuffer, rng: &mut R) -> PixelBuffer {
        self.run(src, rng).0
    }

    /// Like [`Filter::apply`], also returning what was painted.
    pub fn run<R: Rng + ?Sized>(
        &self,
        src: &PixelBuffer,
        rng: &mut R,
    ) -> (PixelBuffer, FilterSummary) {
        let start = Instant::now();
        crate::log_info!(
            "{}: start on {}x{} image",
            self.kind().label(),
            src.width(),
            src.height()
        );

        let (image, summary) = match self {
            Filter::LayeredStrokes(p) => {
                let (image, stats) = layered_strokes::paint(src, p, rng);
                (image, FilterSummary::Strokes(stats))
            }
            Filter::Pointillism(p) => {
                let (image, stats) = pointillism::paint(src, p, rng);
                (image, FilterSummary::Dots(stats))
            }
            Filter::GlassPatterns(p) => {
                (glass_patterns::transform(src, p, rng), FilterSummary::Flow)
            }
        };

        crate::log_info!(
            "{}: finished in {:.0}ms, {}",
            self.kind().label(),
            start.elapsed().as_secs_f64() * 1000.0,
            summary
        );
        (image, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn names_resolve_loosely() {
        assert_eq!(FilterKind::from_name("pointillism"), Some(FilterKind::Pointillism));
        assert_eq!(FilterKind::from_name("Glass-Patterns"), Some(FilterKind::GlassPatterns));
        assert_eq!(FilterKind::from_name(" LAYERED_STROKES "), Some(FilterKind::LayeredStrokes));
        assert_eq!(FilterKind::from_name("oil paint"), None);
        for kind in FilterKind::ALL {
            assert_eq!(kind.name().parse::<FilterKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_name_is_an_error() {
        match Filter::from_name("watercolour") {
            Err(Error::UnknownFilter(name)) => assert_eq!(name, "watercolour"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn defaults_match_kind() {
        for kind in FilterKind::ALL {
            assert_eq!(Filter::with_defaults(kind).kind(), kind);
        }
        assert_eq!(
            Filter::with_defaults(FilterKind::LayeredStrokes),
            Filter::LayeredStrokes(LayeredStrokesParams::default())
        );
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let mut src = PixelBuffer::filled(24, 18, [30, 90, 200, 255]);
        for x in 0..24 {
            src.set_pixel(x, 9, [250, 250, 20, 255]);
        }
        let before = src.clone();
        for kind in FilterKind::ALL {
            let mut rng = StdRng::seed_from_u64(99);
            let (out, _) = Filter::with_defaults(kind).run(&src, &mut rng);
            assert_eq!((out.width(), out.height()), (24, 18));
            assert_eq!(src, before);
        }
    }

    #[test]
    fn summary_reports_filter_specific_counts() {
        let src = PixelBuffer::filled(16, 16, [0, 0, 0, 255]);
        let mut rng = StdRng::seed_from_u64(3);
        let (_, summary) = Filter::with_defaults(FilterKind::LayeredStrokes).run(&src, &mut rng);
        assert!(matches!(summary, FilterSummary::Strokes(s) if s.total() > 0));
        let (_, summary) = Filter::with_defaults(FilterKind::GlassPatterns).run(&src, &mut rng);
        assert_eq!(summary, FilterSummary::Flow);
    }
}
