use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, ImageError};

use crate::canvas::{CHANNELS, PixelBuffer, Raster};
use crate::error::{Error, Result};

/// Default JPEG quality when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Output formats the codec boundary can write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Bmp,
    Jpeg,
}

impl SaveFormat {
    pub const ALL: [SaveFormat; 3] = [SaveFormat::Png, SaveFormat::Bmp, SaveFormat::Jpeg];

    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Jpeg => "jpg",
        }
    }

    pub fn supports_quality(&self) -> bool {
        matches!(self, SaveFormat::Jpeg)
    }

    /// Parse a user-supplied format name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "bmp" => Some(SaveFormat::Bmp),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            _ => None,
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }
}

/// Decode an image file (PNG, BMP or JPEG) into an RGBA buffer.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)
        .map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    Ok(PixelBuffer::from_rgba_image(&img))
}

/// Encode `buffer` in `format` and write it to `path`.
///
/// JPEG has no alpha channel, so alpha is dropped; `quality` (clamped to
/// 1..=100) only affects JPEG.
pub fn encode_and_write(
    buffer: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<()> {
    write_encoded(buffer, path, format, quality).map_err(|source| Error::Encode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_encoded(
    buffer: &PixelBuffer,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> std::result::Result<(), ImageError> {
    let (w, h) = (buffer.width(), buffer.height());
    let rgba = buffer.as_raw();
    let mut out = BufWriter::new(File::create(path)?);

    match format {
        SaveFormat::Png => PngEncoder::new(&mut out).write_image(rgba, w, h, ColorType::Rgba8)?,
        SaveFormat::Bmp => BmpEncoder::new(&mut out).write_image(rgba, w, h, ColorType::Rgba8)?,
        SaveFormat::Jpeg => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(CHANNELS)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                .write_image(&rgb, w, h, ColorType::Rgb8)?
        }
    }
    out.flush()?;
    Ok(())
}

/// Wrap a raw interleaved RGBA byte vector, rejecting length mismatches.
pub fn buffer_from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<PixelBuffer> {
    let len = data.len();
    PixelBuffer::from_raw(width, height, data).ok_or(Error::InvalidBuffer { width, height, len })
}
