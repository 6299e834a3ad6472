//! Destination-grid resampling through a sampling transform.
//!
//! Destination pixel `(x, y)` is sampled at `T(x + 0.5, y + 0.5) - 0.5` in
//! source space, i.e. transforms act on pixel centres. Source coordinates
//! outside the image are clamped to the nearest edge pixel.

use crate::bitmap::{Image, alpha, argb, blue, green, red};
use crate::transform::AffineTransform;
use common::span_debug;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            other => Err(format!("unknown interpolation '{other}'")),
        }
    }
}

/// Produce `dst_w * dst_h` ARGB pixels, row-major.
pub fn resample(
    image: &Image,
    transform: &AffineTransform,
    dst_w: u32,
    dst_h: u32,
    interpolation: Interpolation,
) -> Vec<u32> {
    let _s = span_debug!("resample");

    let mut out = Vec::with_capacity(dst_w as usize * dst_h as usize);
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;

    for y in 0..dst_h {
        for x in 0..dst_w {
            let (sx, sy) = transform.apply(x as f32 + 0.5, y as f32 + 0.5);
            let sx = (sx - 0.5).clamp(0.0, max_x);
            let sy = (sy - 0.5).clamp(0.0, max_y);

            let px = match interpolation {
                Interpolation::Nearest => sample_nearest(image, sx, sy),
                Interpolation::Bilinear => sample_bilinear(image, sx, sy),
            };
            out.push(px);
        }
    }

    out
}

// Coordinates are already clamped to the image extent.
#[inline]
fn sample_nearest(image: &Image, sx: f32, sy: f32) -> u32 {
    image.pixel(sx.round() as u32, sy.round() as u32)
}

#[inline]
fn sample_bilinear(image: &Image, sx: f32, sy: f32) -> u32 {
    let x0 = sx.floor() as u32;
    let y0 = sy.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = sx - x0 as f32;
    let fy = sy - y0 as f32;

    let p00 = image.pixel(x0, y0);
    let p10 = image.pixel(x1, y0);
    let p01 = image.pixel(x0, y1);
    let p11 = image.pixel(x1, y1);

    let lerp = |channel: fn(u32) -> u8| -> u8 {
        let top = channel(p00) as f32 * (1.0 - fx) + channel(p10) as f32 * fx;
        let bottom = channel(p01) as f32 * (1.0 - fx) + channel(p11) as f32 * fx;
        (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
    };

    argb(lerp(alpha), lerp(red), lerp(green), lerp(blue))
}
