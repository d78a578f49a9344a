//! Watermark and preview error types.
//!
//! Two failure taxonomies with different blast radii: `DecodeError` aborts
//! the upload step entirely, `RenderError` is recoverable and leaves the
//! previously displayed preview untouched.

use std::fmt;

/// Errors that can occur while decoding a selected source photo.
#[derive(Debug, Clone)]
pub enum DecodeError {
    /// Input bytes are not a decodable image
    Unreadable { message: String },

    /// Decoded image has a zero width or height
    EmptyImage { width: u32, height: u32 },

    /// Pixel count exceeds the decode safety limit
    PixelLimitExceeded {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },

    /// Input byte size exceeds the upload limit
    FileTooLarge { size: usize, max_size: usize },
}

impl DecodeError {
    pub fn unreadable(message: impl Into<String>) -> Self {
        DecodeError::Unreadable {
            message: message.into(),
        }
    }

    pub fn pixel_limit(width: u32, height: u32, max_pixels: u64) -> Self {
        DecodeError::PixelLimitExceeded {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }

    pub fn file_too_large(size: usize, max_size: usize) -> Self {
        DecodeError::FileTooLarge { size, max_size }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Unreadable { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            DecodeError::EmptyImage { width, height } => {
                write!(f, "Image has invalid dimensions {}x{}", width, height)
            }
            DecodeError::PixelLimitExceeded {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "Image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            DecodeError::FileTooLarge { size, max_size } => {
                write!(
                    f,
                    "File size {} bytes exceeds maximum {} bytes",
                    size, max_size
                )
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors that can occur while composing a watermarked preview.
///
/// A render failure never disturbs the last published preview; the
/// controller reports it and keeps the previous resource on display.
#[derive(Debug, Clone)]
pub enum RenderError {
    /// No usable font could be loaded
    FontError(String),

    /// Watermark color string is not valid hex
    ColorError(String),

    /// Text measurement produced an unusable overlay
    LayoutError(String),

    /// Failed to encode the composited preview
    EncodeError(String),

    /// Render worker task did not run to completion
    TaskError(String),

    /// Nothing to render
    EmptyText,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FontError(msg) => write!(f, "Failed to load watermark font: {}", msg),
            Self::ColorError(msg) => write!(f, "Invalid watermark color: {}", msg),
            Self::LayoutError(msg) => write!(f, "Failed to lay out watermark text: {}", msg),
            Self::EncodeError(msg) => write!(f, "Failed to encode preview: {}", msg),
            Self::TaskError(msg) => write!(f, "Render task failed: {}", msg),
            Self::EmptyText => write!(f, "Cannot render empty watermark text"),
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::unreadable("invalid PNG header");
        assert_eq!(err.to_string(), "Failed to decode image: invalid PNG header");

        let err = DecodeError::EmptyImage {
            width: 0,
            height: 600,
        };
        assert_eq!(err.to_string(), "Image has invalid dimensions 0x600");

        let err = DecodeError::pixel_limit(10000, 10000, 50_000_000);
        assert!(err.to_string().contains("100000000 pixels"));
        assert!(err.to_string().contains("limit of 50000000"));

        let err = DecodeError::file_too_large(11_000_000, 10_485_760);
        assert_eq!(
            err.to_string(),
            "File size 11000000 bytes exceeds maximum 10485760 bytes"
        );
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::FontError("no font file found".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to load watermark font: no font file found"
        );

        let err = RenderError::ColorError("must start with '#'".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid watermark color: must start with '#'"
        );

        let err = RenderError::LayoutError("zero-width text".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to lay out watermark text: zero-width text"
        );

        let err = RenderError::EncodeError("png write failed".to_string());
        assert_eq!(err.to_string(), "Failed to encode preview: png write failed");

        let err = RenderError::EmptyText;
        assert_eq!(err.to_string(), "Cannot render empty watermark text");
    }

    #[test]
    fn test_error_debug() {
        let err = DecodeError::unreadable("test");
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Unreadable"));
        assert!(debug_str.contains("test"));
    }
}
