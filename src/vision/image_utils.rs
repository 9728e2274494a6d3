// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading, cropping and re-encoding for the recognition pipeline

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,

    #[error("Failed to read image {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Axis-aligned pixel rectangle `(x1, y1)`–`(x2, y2)`, right/bottom exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Grow the box by `margin` pixels on every side, clamped to the image
    ///
    /// The result always lies inside `[0, image_width] x [0, image_height]`
    /// and is at least 1x1, even for boxes that fall entirely outside the
    /// image.
    pub fn expand_clamped(&self, margin: u32, image_width: u32, image_height: u32) -> PixelBox {
        let (x1, x2) = expand_axis(self.x1, self.x2, margin, image_width);
        let (y1, y2) = expand_axis(self.y1, self.y2, margin, image_height);
        PixelBox { x1, y1, x2, y2 }
    }
}

fn expand_axis(start: u32, end: u32, margin: u32, limit: u32) -> (u32, u32) {
    let limit = limit.max(1);
    let lo = start.saturating_sub(margin).min(limit - 1);
    let hi = end.saturating_add(margin).min(limit);
    if hi <= lo {
        (lo, lo + 1)
    } else {
        (lo, hi)
    }
}

/// Load and decode an image file
///
/// The format is taken from the file's magic bytes rather than its
/// extension, so renamed uploads still decode.
pub fn load_image(path: &Path) -> Result<DynamicImage, ImageError> {
    let bytes = std::fs::read(path).map_err(|source| ImageError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(&bytes)?;
    image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))
}

/// Detect image format from magic bytes
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Lossy WebP quality for derived images
pub const WEBP_QUALITY: f32 = 80.0;

/// Re-encode an image as lossy WebP at `path`
pub fn save_webp(image: &DynamicImage, path: &Path) -> Result<(), ImageError> {
    // libwebp only accepts 8-bit RGB(A) buffers
    let encodable = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let encoder = webp::Encoder::from_image(&encodable)
        .map_err(|e| ImageError::EncodeFailed(format!("{}: {}", path.display(), e)))?;
    let encoded = encoder.encode(WEBP_QUALITY);

    std::fs::write(path, &*encoded).map_err(|source| ImageError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Crop `region` out of `image` and save it as WebP at `path`
///
/// `region` must already be clamped to the image bounds.
pub fn crop_to_webp(image: &DynamicImage, region: PixelBox, path: &Path) -> Result<(), ImageError> {
    let cropped = image.crop_imm(region.x1, region.y1, region.width(), region.height());
    save_webp(&cropped, path)
}
