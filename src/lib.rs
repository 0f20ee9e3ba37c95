//! Painterly image filters: layered brush strokes, pointillism and glass
//! patterns, plus the raster toolkit they are built from (convolution,
//! blurs, Sobel and Canny edges, Poisson-disk sampling, depth-buffered
//! circles).
//!
//! ```no_run
//! use filtermix::{Filter, FilterKind, load_image};
//! use rand::SeedableRng;
//!
//! let src = load_image("photo.png".as_ref())?;
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let _painted = Filter::with_defaults(FilterKind::Pointillism).apply(&src, &mut rng);
//! # Ok::<(), filtermix::Error>(())
//! ```

pub mod canvas;
pub mod cli;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;

pub use canvas::{DepthBuffer, GrayBuffer, PixelBuffer, VectorField};
pub use error::{Error, Result};
pub use io::{SaveFormat, encode_and_write, load_image};
pub use ops::effects::{Filter, FilterKind, FilterSummary};
pub use ops::glass_patterns::GlassPatternsParams;
pub use ops::layered_strokes::LayeredStrokesParams;
pub use ops::pointillism::PointillismParams;
