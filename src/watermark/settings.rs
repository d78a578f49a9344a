//! Watermark settings for upload previews.
//!
//! This module defines the per-upload watermark configuration:
//! - Overlay text and hex color
//! - 9-grid anchor position
//! - Opacity and font size, clamped to safe ranges
//!
//! Numeric fields are clamped on every construction and mutation path, so a
//! settings value that is out of range can never be observed. Out-of-range
//! input is corrected, not rejected.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// Default values
fn default_position() -> WatermarkPosition {
    WatermarkPosition::BottomRight
}

fn default_opacity() -> u8 {
    50
}

fn default_font_size() -> u32 {
    24
}

fn default_color() -> String {
    "#ffffff".to_string()
}

/// Anchor position of the watermark on the photo.
///
/// Nine fixed positions: four corners, four edge midpoints, and center.
/// Wire names match the storefront's select values, where edge midpoints
/// are written as the bare edge ("top", "left", "right", "bottom").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatermarkPosition {
    #[serde(rename = "top-left")]
    TopLeft,
    #[serde(rename = "top")]
    TopCenter,
    #[serde(rename = "top-right")]
    TopRight,
    #[serde(rename = "left")]
    CenterLeft,
    #[serde(rename = "center")]
    Center,
    #[serde(rename = "right")]
    CenterRight,
    #[serde(rename = "bottom-left")]
    BottomLeft,
    #[serde(rename = "bottom")]
    BottomCenter,
    #[serde(rename = "bottom-right")]
    BottomRight,
}

/// Horizontal component of an anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Vertical component of an anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

impl WatermarkPosition {
    /// All nine anchor positions.
    pub const ALL: [WatermarkPosition; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// Wire name of this position, as used in serialized settings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top",
            Self::TopRight => "top-right",
            Self::CenterLeft => "left",
            Self::Center => "center",
            Self::CenterRight => "right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom",
            Self::BottomRight => "bottom-right",
        }
    }

    /// Horizontal component of the anchor.
    pub fn horizontal(&self) -> HorizontalAnchor {
        match self {
            Self::TopLeft | Self::CenterLeft | Self::BottomLeft => HorizontalAnchor::Left,
            Self::TopCenter | Self::Center | Self::BottomCenter => HorizontalAnchor::Center,
            Self::TopRight | Self::CenterRight | Self::BottomRight => HorizontalAnchor::Right,
        }
    }

    /// Vertical component of the anchor.
    pub fn vertical(&self) -> VerticalAnchor {
        match self {
            Self::TopLeft | Self::TopCenter | Self::TopRight => VerticalAnchor::Top,
            Self::CenterLeft | Self::Center | Self::CenterRight => VerticalAnchor::Middle,
            Self::BottomLeft | Self::BottomCenter | Self::BottomRight => VerticalAnchor::Bottom,
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatermarkPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top-left" => Ok(Self::TopLeft),
            "top" => Ok(Self::TopCenter),
            "top-right" => Ok(Self::TopRight),
            "left" => Ok(Self::CenterLeft),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::CenterRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom" => Ok(Self::BottomCenter),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(format!(
                "Unknown watermark position '{}' (expected one of: top-left, top, top-right, \
                 left, center, right, bottom-left, bottom, bottom-right)",
                other
            )),
        }
    }
}

/// Per-upload watermark configuration.
///
/// Fields are private so the clamping invariants hold everywhere: opacity
/// stays within 10..=100 percent and font size within 12..=72 pixels no
/// matter what a caller or a settings file supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkSettings {
    /// Overlay text. Blank text means nothing to render.
    #[serde(default)]
    text: String,

    /// Anchor position on the photo (default: bottom-right)
    #[serde(default = "default_position")]
    position: WatermarkPosition,

    /// Opacity in percent (default: 50, clamped to 10..=100)
    #[serde(default = "default_opacity", deserialize_with = "de_opacity")]
    opacity: u8,

    /// Font size in pixels (default: 24, clamped to 12..=72)
    #[serde(default = "default_font_size", deserialize_with = "de_font_size")]
    font_size: u32,

    /// Text color as "#RGB" or "#RRGGBB" hex (default: "#ffffff")
    #[serde(default = "default_color")]
    color: String,

    /// Whether the watermark is applied at all (default: false)
    #[serde(default)]
    enabled: bool,
}

fn de_opacity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = u32::deserialize(deserializer)?;
    Ok(WatermarkSettings::clamp_opacity(raw))
}

fn de_font_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = u32::deserialize(deserializer)?;
    Ok(WatermarkSettings::clamp_font_size(raw))
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: default_position(),
            opacity: default_opacity(),
            font_size: default_font_size(),
            color: default_color(),
            enabled: false,
        }
    }
}

impl WatermarkSettings {
    /// Minimum opacity in percent.
    pub const MIN_OPACITY: u8 = 10;
    /// Maximum opacity in percent.
    pub const MAX_OPACITY: u8 = 100;
    /// Minimum font size in pixels.
    pub const MIN_FONT_SIZE: u32 = 12;
    /// Maximum font size in pixels.
    pub const MAX_FONT_SIZE: u32 = 72;

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> WatermarkPosition {
        self.position
    }

    /// Opacity in percent, always within 10..=100.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Font size in pixels, always within 12..=72.
    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Opacity as a linear alpha multiplier in 0.1..=1.0.
    pub fn alpha(&self) -> f32 {
        self.opacity as f32 / 100.0
    }

    /// Whether these settings call for a composition at all.
    ///
    /// Disabled or blank-text settings mean the raw photo is the preview;
    /// that is not an error state.
    pub fn should_render(&self) -> bool {
        self.enabled && !self.text.trim().is_empty()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_position(&mut self, position: WatermarkPosition) {
        self.position = position;
    }

    /// Set the opacity in percent, clamping into 10..=100.
    pub fn set_opacity(&mut self, percent: u32) {
        self.opacity = Self::clamp_opacity(percent);
    }

    /// Set the font size in pixels, clamping into 12..=72.
    pub fn set_font_size(&mut self, pixels: u32) {
        self.font_size = Self::clamp_font_size(pixels);
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn clamp_opacity(percent: u32) -> u8 {
        percent.clamp(Self::MIN_OPACITY as u32, Self::MAX_OPACITY as u32) as u8
    }

    fn clamp_font_size(pixels: u32) -> u32 {
        pixels.clamp(Self::MIN_FONT_SIZE, Self::MAX_FONT_SIZE)
    }

    /// Validate the settings.
    ///
    /// Only the color string can be structurally invalid; numeric fields
    /// are in range by construction and blank text is a valid no-op.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(hex_part) = self.color.strip_prefix('#') {
            let len = hex_part.len();
            if (len != 3 && len != 6) || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!(
                    "Watermark color must be in #RGB or #RRGGBB format with valid hex characters, got '{}'",
                    self.color
                ));
            }
        } else {
            return Err(format!(
                "Watermark color must be a hex string starting with '#', got '{}'",
                self.color
            ));
        }

        Ok(())
    }
}
