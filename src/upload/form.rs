//! Listing metadata collected alongside an uploaded photo.

use serde::{Deserialize, Serialize};

use crate::catalog::Category;

/// Form fields a contributor fills in before submitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    /// Listing price in whole dollars
    pub price_usd: u32,
}

impl UploadForm {
    pub fn new(title: impl Into<String>, category: Category, price_usd: u32) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            category,
            price_usd,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Title is required".to_string());
        }
        if self.price_usd < 1 {
            return Err("Price must be at least $1".to_string());
        }
        Ok(())
    }
}
