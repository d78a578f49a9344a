// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::upload::source::DecodeLimits;
use crate::watermark::WatermarkSettings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    /// Default watermark settings applied to a fresh upload session
    #[serde(default)]
    pub watermark: WatermarkSettings,
}

/// Default margin between the overlay and the photo edges (10 px)
fn default_margin() -> u32 {
    10
}

/// Default decoded pixel budget (50 megapixels)
fn default_max_pixels() -> u64 {
    50_000_000
}

/// Default max upload size (10 MB)
fn default_max_file_size_mb() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Margin between the watermark overlay and the photo edges, in pixels
    #[serde(default = "default_margin")]
    pub margin: u32,

    /// Font file for the overlay text. System fonts are probed when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    /// Cap on decoded pixels (width * height) for selected photos
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            font_path: None,
            max_pixels: default_max_pixels(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted upload size in megabytes
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl UploadConfig {
    pub fn max_bytes(&self) -> usize {
        self.max_file_size_mb as usize * 1024 * 1024
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        // Now perform the substitution (we know all vars exist)
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap() // Safe because we checked above
        });

        let config: Config = serde_yaml::from_str(&substituted).map_err(|e| e.to_string())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.preview.max_pixels == 0 {
            return Err("preview.max_pixels must be greater than 0".to_string());
        }
        if self.upload.max_file_size_mb == 0 {
            return Err("upload.max_file_size_mb must be greater than 0".to_string());
        }
        if let Some(path) = &self.preview.font_path {
            if path.as_os_str().is_empty() {
                return Err("preview.font_path cannot be empty".to_string());
            }
        }
        self.watermark
            .validate()
            .map_err(|e| format!("watermark: {}", e))?;
        Ok(())
    }

    /// Decode caps derived from the preview and upload sections.
    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits {
            max_bytes: self.upload.max_bytes(),
            max_pixels: self.preview.max_pixels,
        }
    }
}
