//! Preview composition.
//!
//! Turns a decoded photo plus watermark settings into an encoded preview:
//! copy the photo, rasterize the overlay text, alpha-blend it at the
//! anchored placement, and encode the result to PNG.
//!
//! The source raster is never mutated; composition always works on a copy.
//! Identical inputs produce byte-identical previews.

use super::error::RenderError;
use super::layout::{is_fully_visible, place_overlay, CanvasSize, OverlaySize};
use super::settings::WatermarkSettings;
use super::text::{parse_hex_color, render_text};
use ab_glyph::FontArc;
use bytes::Bytes;
use image::{Rgba, RgbaImage};
use std::io::Cursor;

/// An encoded, composited preview image.
#[derive(Debug, Clone)]
pub struct ComposedPreview {
    /// Encoded image bytes
    pub data: Bytes,
    /// Content-Type of the encoded bytes
    pub content_type: &'static str,
    /// Pixel width, equal to the source photo's
    pub width: u32,
    /// Pixel height, equal to the source photo's
    pub height: u32,
}

/// Watermark compositor.
///
/// Holds the overlay font and edge margin; cheap to clone and share.
#[derive(Clone)]
pub struct Compositor {
    font: FontArc,
    margin: u32,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("margin", &self.margin)
            .finish()
    }
}

impl Compositor {
    pub fn new(font: FontArc, margin: u32) -> Self {
        Self { font, margin }
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Compose a watermarked preview of `photo`.
    ///
    /// Callers normally gate on [`WatermarkSettings::should_render`]; blank
    /// text here is still refused so a miswired caller cannot produce an
    /// empty overlay.
    pub fn compose(
        &self,
        photo: &RgbaImage,
        settings: &WatermarkSettings,
    ) -> Result<ComposedPreview, RenderError> {
        if settings.text().trim().is_empty() {
            return Err(RenderError::EmptyText);
        }

        let color = parse_hex_color(settings.color())?;
        let overlay = render_text(
            &self.font,
            settings.text(),
            settings.font_size() as f32,
            color,
            settings.alpha(),
        )?;

        let canvas = CanvasSize {
            width: photo.width(),
            height: photo.height(),
        };
        let size = OverlaySize {
            width: overlay.width(),
            height: overlay.height(),
        };
        let placement = place_overlay(settings.position(), &canvas, &size, self.margin);

        if !is_fully_visible(&placement, &canvas, &size) {
            tracing::debug!(
                photo_width = canvas.width,
                photo_height = canvas.height,
                overlay_width = size.width,
                overlay_height = size.height,
                "watermark overlay clipped to photo bounds"
            );
        }

        let mut output = photo.clone();
        blend_overlay(&mut output, &overlay, placement.origin(&size));

        let data = encode_png(&output)?;
        Ok(ComposedPreview {
            data,
            content_type: "image/png",
            width: canvas.width,
            height: canvas.height,
        })
    }
}

/// Blend an RGBA overlay onto the target at the given top-left origin.
///
/// The visible region is clipped to the target bounds, so origins may be
/// negative or extend past the edges.
pub fn blend_overlay(target: &mut RgbaImage, overlay: &RgbaImage, origin: (i32, i32)) {
    let target_width = target.width() as i32;
    let target_height = target.height() as i32;

    let overlay_width = overlay.width() as i32;
    let overlay_height = overlay.height() as i32;

    let (ox, oy) = origin;

    let x_start = ox.max(0);
    let y_start = oy.max(0);
    let x_end = (ox + overlay_width).min(target_width);
    let y_end = (oy + overlay_height).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let sx = (tx - ox) as u32;
            let sy = (ty - oy) as u32;

            let overlay_pixel = overlay.get_pixel(sx, sy);
            let target_pixel = target.get_pixel(tx as u32, ty as u32);

            let blended = blend_pixels(*target_pixel, *overlay_pixel);
            target.put_pixel(tx as u32, ty as u32, blended);
        }
    }
}

/// Blend two pixels with the Porter-Duff "over" operator.
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0) as u8,
    ])
}

/// Encode an RGBA raster to PNG bytes.
fn encode_png(image: &RgbaImage) -> Result<Bytes, RenderError> {
    use image::codecs::png::PngEncoder;
    use image::ImageEncoder as _;

    let mut output = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut output);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| RenderError::EncodeError(e.to_string()))?;

    Ok(Bytes::from(output.into_inner()))
}
