//! Watermark module for composing text overlays onto upload previews.
//!
//! Contributor photos get a configurable copyright overlay before they are
//! shown or submitted. The pieces:
//!
//! - **Settings**: clamped overlay configuration (text, 9-grid anchor,
//!   opacity, font size, hex color, enabled flag)
//! - **Layout**: pure anchor-to-coordinates math
//! - **Text**: font loading, measurement, and glyph rasterization
//! - **Compose**: copy photo, blend overlay, encode PNG
//!
//! # Settings Example
//!
//! ```yaml
//! watermark:
//!   text: "© Jane Doe"
//!   position: bottom-right
//!   opacity: 50
//!   font_size: 24
//!   color: "#ffffff"
//!   enabled: true
//! ```
//!
//! Composition is deterministic: the same photo and settings always encode
//! to the same bytes. Blank text or a disabled flag means no composition at
//! all, not an error.

pub mod compose;
pub mod error;
pub mod layout;
pub mod settings;
pub mod text;

// Re-export main types for convenience
pub use compose::{blend_overlay, ComposedPreview, Compositor};
pub use error::{DecodeError, RenderError};
pub use layout::{
    is_fully_visible, place_overlay, CanvasSize, OverlaySize, TextPlacement,
};
pub use settings::{HorizontalAnchor, VerticalAnchor, WatermarkPosition, WatermarkSettings};
pub use text::{load_font, measure_text, parse_hex_color, probe_system_font, render_text, Color};
