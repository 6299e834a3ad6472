//! Decoded source images.
//!
//! Pixels are stored as packed `0xAARRGGBB` words, row-major. Alpha is carried
//! through resampling but never reaches a packed tensor.

use crate::error::PreprocessError;
use common::span_debug;
use std::path::{Path, PathBuf};

const FILE_URI_PREFIX: &str = "file://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Image {
    /// Wrap packed ARGB pixels.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, PreprocessError> {
        Self::check_dimensions(width, height, pixels.len(), 1)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build an opaque image from interleaved RGB bytes (HWC).
    pub fn from_rgb8(width: u32, height: u32, rgb: &[u8]) -> Result<Self, PreprocessError> {
        Self::check_dimensions(width, height, rgb.len(), 3)?;
        let pixels = rgb
            .chunks_exact(3)
            .map(|px| argb(0xFF, px[0], px[1], px[2]))
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an image file. A leading `file://` is stripped from the path.
    pub fn open(path: impl AsRef<str>) -> Result<Self, PreprocessError> {
        let _s = span_debug!("decode_image");

        let path = resolve_path(path.as_ref());

        let decoded = image::ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode())
            .map_err(|source| PreprocessError::ImageDecode {
                path: path.clone(),
                source,
            })?;

        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        tracing::trace!(width, height, path = %path.display(), "Decoded image");

        Self::check_dimensions(width, height, rgba.as_raw().len(), 4)?;
        let pixels = rgba
            .as_raw()
            .chunks_exact(4)
            .map(|px| argb(px[3], px[0], px[1], px[2]))
            .collect();

        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Caller guarantees `x < width` and `y < height`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        self.pixels[(y * self.width + x) as usize]
    }

    fn check_dimensions(
        width: u32,
        height: u32,
        len: usize,
        units_per_pixel: usize,
    ) -> Result<(), PreprocessError> {
        if width == 0 || height == 0 {
            return Err(PreprocessError::InvalidImage(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }

        let expected = width as usize * height as usize * units_per_pixel;
        if len != expected {
            return Err(PreprocessError::InvalidImage(format!(
                "buffer size mismatch: expected {expected} for {width}x{height}, got {len}"
            )));
        }

        Ok(())
    }
}

fn resolve_path(path: &str) -> PathBuf {
    Path::new(path.strip_prefix(FILE_URI_PREFIX).unwrap_or(path)).to_path_buf()
}

#[inline]
pub fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
pub fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

#[inline]
pub fn red(pixel: u32) -> u8 {
    (pixel >> 16) as u8
}

#[inline]
pub fn green(pixel: u32) -> u8 {
    (pixel >> 8) as u8
}

#[inline]
pub fn blue(pixel: u32) -> u8 {
    pixel as u8
}
