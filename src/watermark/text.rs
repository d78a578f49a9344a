//! Text overlay rendering.
//!
//! Measures and rasterizes watermark text to RGBA overlays that the
//! compositor blends onto photos.
//!
//! # Features
//!
//! - Hex color parsing (#RGB and #RRGGBB formats)
//! - Kerned width measurement
//! - Per-pixel alpha from glyph coverage times opacity (linear)
//! - Font loading from a configured path or well-known system locations
//!
//! Identical inputs always produce identical overlays; nothing here reads
//! clocks or randomness.

use super::error::RenderError;
use super::layout::OverlaySize;
use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Well-known font locations probed when no font path is configured.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// Find a usable system font, if any.
pub fn probe_system_font() -> Option<PathBuf> {
    SYSTEM_FONT_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Load the overlay font.
///
/// An explicitly configured path must load; a missing or unreadable file
/// there is an error rather than a silent fallback. Without a configured
/// path the system locations are probed in order.
pub fn load_font(configured: Option<&Path>) -> Result<FontArc, RenderError> {
    let path = match configured {
        Some(path) => path.to_path_buf(),
        None => probe_system_font().ok_or_else(|| {
            RenderError::FontError(format!(
                "no font_path configured and none of the known system fonts exist ({})",
                SYSTEM_FONT_PATHS.join(", ")
            ))
        })?,
    };

    let data = std::fs::read(&path)
        .map_err(|e| RenderError::FontError(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(data)
        .map_err(|e| RenderError::FontError(format!("{}: {}", path.display(), e)))
}

/// Parsed RGB color from a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
pub fn parse_hex_color(hex: &str) -> Result<Color, RenderError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| RenderError::ColorError("Color must start with '#'".to_string()))?;

    match hex.len() {
        3 => {
            // #RGB format - each hex digit doubles: 0xF -> 0xFF
            let r = u8::from_str_radix(&hex[0..1], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            let g = u8::from_str_radix(&hex[1..2], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            let b = u8::from_str_radix(&hex[2..3], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            let g = u8::from_str_radix(&hex[2..4], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            let b = u8::from_str_radix(&hex[4..6], 16)
                .map_err(|_| RenderError::ColorError("Invalid hex digit".to_string()))?;
            Ok(Color::new(r, g, b))
        }
        _ => Err(RenderError::ColorError(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Measure the overlay box for a piece of text.
///
/// Width is the kerned advance sum, height the scaled line height, both
/// with a small padding so anti-aliased edges are not cut off.
pub fn measure_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
) -> Result<OverlaySize, RenderError> {
    if text.is_empty() {
        return Err(RenderError::EmptyText);
    }

    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }

        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let height = scaled_font.height();
    if width <= 0.0 || height <= 0.0 {
        return Err(RenderError::LayoutError(format!(
            "text '{}' measured to an empty box",
            text
        )));
    }

    let padding = 2;
    Ok(OverlaySize {
        width: width.ceil() as u32 + padding,
        height: height.ceil() as u32 + padding,
    })
}

/// Render text to a transparent RGBA overlay.
///
/// Per-pixel alpha is glyph coverage multiplied by `alpha` (0.0 to 1.0),
/// applied linearly.
pub fn render_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
    color: Color,
    alpha: f32,
) -> Result<RgbaImage, RenderError> {
    let size = measure_text(font, text, font_size)?;

    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let mut overlay = RgbaImage::new(size.width.max(1), size.height.max(1));

    let max_alpha = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    let baseline_y = scaled_font.ascent();

    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && x < overlay.width() as i32 && y < overlay.height() as i32 {
                    let pixel_alpha = (coverage * max_alpha as f32) as u8;
                    let pixel = Rgba([color.r, color.g, color.b, pixel_alpha]);

                    // Blend with existing pixel so anti-aliased glyph
                    // edges accumulate instead of overwriting
                    let existing = overlay.get_pixel(x as u32, y as u32);
                    let blended = blend_pixels(*existing, pixel);
                    overlay.put_pixel(x as u32, y as u32, blended);
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    Ok(overlay)
}

/// Blend two RGBA pixels using alpha compositing.
fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0) as u8,
    ])
}
