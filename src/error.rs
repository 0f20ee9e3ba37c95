//! Error type for the codec boundary and the command-line front end.
//!
//! The filters themselves never fail: out-of-range parameters are clamped and
//! degenerate geometry ends a stroke or yields a zero vector.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by filter lookup, image I/O and batch processing.
#[derive(Debug, Error)]
pub enum Error {
    /// No filter is registered under this name.
    #[error("unknown filter '{0}' (available: layered_strokes, pointillism, glass_patterns)")]
    UnknownFilter(String),

    /// The input file could not be opened or decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The output file could not be encoded or written.
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Filesystem error outside the codecs (creating directories, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A raw pixel buffer whose length does not match its dimensions.
    #[error("buffer of {len} bytes does not match {width}x{height} RGBA")]
    InvalidBuffer { width: u32, height: u32, len: usize },

    /// The input patterns matched no files.
    #[error("no input files matched")]
    NoInputs,

    /// The requested output location cannot hold the results.
    #[error("output conflict: {0}")]
    OutputConflict(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
