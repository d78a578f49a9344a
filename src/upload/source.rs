//! Decoding of contributor-selected photos.
//!
//! A [`SourceImage`] is created once per file selection and never mutated
//! afterwards. It keeps both the decoded RGBA raster (shared with render
//! tasks through an `Arc`) and the original encoded bytes, which back the
//! raw preview shown before any watermark is composed.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::io::Reader as ImageReader;
use image::{ImageFormat, RgbaImage};
use uuid::Uuid;

use crate::watermark::DecodeError;

/// Safety caps applied while decoding an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum accepted file size in bytes
    pub max_bytes: usize,
    /// Maximum decoded pixel count (width * height)
    pub max_pixels: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_pixels: 50_000_000,
        }
    }
}

/// Compact description of a loaded source, safe to hand out freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceImageInfo {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
}

/// An immutable, decoded photo selected for upload.
#[derive(Debug, Clone)]
pub struct SourceImage {
    id: Uuid,
    width: u32,
    height: u32,
    raster: Arc<RgbaImage>,
    original: Bytes,
    content_type: &'static str,
}

impl SourceImage {
    /// Decode `bytes` into a source image, enforcing size caps before any
    /// pixel data is allocated.
    ///
    /// The checks run in order: file size, container header, dimensions,
    /// then pixel budget. Only after all pass is the full image decoded.
    pub fn decode(bytes: Bytes, limits: &DecodeLimits) -> Result<Self, DecodeError> {
        if bytes.len() > limits.max_bytes {
            return Err(DecodeError::file_too_large(bytes.len(), limits.max_bytes));
        }

        let reader = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| DecodeError::unreadable(e.to_string()))?;
        let format = reader.format();
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| DecodeError::unreadable(e.to_string()))?;

        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > limits.max_pixels {
            return Err(DecodeError::pixel_limit(width, height, limits.max_pixels));
        }

        // Header checks passed, decode for real now.
        let decoded = ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .map_err(|e| DecodeError::unreadable(e.to_string()))?
            .decode()
            .map_err(|e| DecodeError::unreadable(e.to_string()))?;
        let raster = decoded.to_rgba8();

        Ok(Self {
            id: Uuid::new_v4(),
            width: raster.width(),
            height: raster.height(),
            raster: Arc::new(raster),
            original: bytes,
            content_type: content_type_for(format),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Shared handle to the decoded pixels.
    pub fn raster(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.raster)
    }

    /// The encoded bytes as originally selected.
    pub fn original_bytes(&self) -> Bytes {
        self.original.clone()
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn info(&self) -> SourceImageInfo {
        SourceImageInfo {
            id: self.id,
            width: self.width,
            height: self.height,
        }
    }
}

fn content_type_for(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}
