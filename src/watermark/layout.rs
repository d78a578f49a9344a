//! Placement math for watermark text overlays.
//!
//! Maps an anchor position, canvas size, measured overlay size, and margin
//! to absolute pixel coordinates. Pure math with no failure modes.
//!
//! Vertical coordinates are baseline-anchored: the resolved `baseline_y` is
//! the bottom edge of the overlay box, and the box's top edge is
//! `baseline_y - overlay.height`. Coordinates are signed and may fall
//! outside the canvas when the photo is smaller than the overlay; the
//! compositor clips in that case.
//!
//! # Example
//!
//! ```ignore
//! use shorebreak::watermark::layout::{place_overlay, CanvasSize, OverlaySize};
//! use shorebreak::watermark::WatermarkPosition;
//!
//! let canvas = CanvasSize { width: 800, height: 600 };
//! let overlay = OverlaySize { width: 100, height: 50 };
//!
//! let placement = place_overlay(WatermarkPosition::BottomRight, &canvas, &overlay, 10);
//! assert_eq!(placement.origin(&overlay), (690, 540)); // 800-100-10, 600-10-50
//! ```

use super::settings::{HorizontalAnchor, VerticalAnchor, WatermarkPosition};

/// Dimensions of the photo being composited onto.
#[derive(Debug, Clone, Copy)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// Measured dimensions of the rendered text overlay.
#[derive(Debug, Clone, Copy)]
pub struct OverlaySize {
    pub width: u32,
    pub height: u32,
}

/// Resolved placement for a text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPlacement {
    /// Left edge of the overlay box.
    pub x: i32,
    /// Text baseline, which is also the bottom edge of the overlay box.
    pub baseline_y: i32,
}

impl TextPlacement {
    pub fn new(x: i32, baseline_y: i32) -> Self {
        Self { x, baseline_y }
    }

    /// Top-left corner of the overlay box.
    pub fn origin(&self, overlay: &OverlaySize) -> (i32, i32) {
        (self.x, self.baseline_y - overlay.height as i32)
    }
}

/// Resolve the overlay placement for an anchor position.
///
/// Horizontal: left anchors sit `margin` from the left edge, right anchors
/// `margin` from the right edge, centered anchors at `(W - tw) / 2`.
///
/// Vertical (baseline coordinates): top anchors place the baseline at
/// `margin + th`, middle anchors at `(H + th) / 2`, bottom anchors at
/// `H - margin`.
pub fn place_overlay(
    position: WatermarkPosition,
    canvas: &CanvasSize,
    overlay: &OverlaySize,
    margin: u32,
) -> TextPlacement {
    let cw = canvas.width as i32;
    let ch = canvas.height as i32;
    let ow = overlay.width as i32;
    let oh = overlay.height as i32;
    let m = margin as i32;

    let x = match position.horizontal() {
        HorizontalAnchor::Left => m,
        HorizontalAnchor::Center => (cw - ow) / 2,
        HorizontalAnchor::Right => cw - ow - m,
    };

    let baseline_y = match position.vertical() {
        VerticalAnchor::Top => m + oh,
        VerticalAnchor::Middle => (ch + oh) / 2,
        VerticalAnchor::Bottom => ch - m,
    };

    TextPlacement::new(x, baseline_y)
}

/// Check whether the placed overlay lies entirely within the canvas.
///
/// False means the compositor will clip; only possible when the photo is
/// smaller than the overlay box plus margins.
pub fn is_fully_visible(
    placement: &TextPlacement,
    canvas: &CanvasSize,
    overlay: &OverlaySize,
) -> bool {
    let (x, y) = placement.origin(overlay);
    x >= 0
        && y >= 0
        && x + overlay.width as i32 <= canvas.width as i32
        && y + overlay.height as i32 <= canvas.height as i32
}
