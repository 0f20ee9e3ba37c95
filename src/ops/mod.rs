//! Image-processing primitives and the three stylization filters.

pub mod color;
pub mod effects;
pub mod filters;
pub mod glass_patterns;
pub mod layered_strokes;
pub mod pointillism;
pub mod sampling;
pub mod shapes;
