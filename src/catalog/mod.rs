//! Built-in storefront catalog.
//!
//! The gallery ships with a fixed set of licensed photos. Browsing,
//! category filtering, and the wraparound prev/next navigation used by the
//! photo viewer all live here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gallery categories a photo can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Surfers,
    Waves,
    Beach,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Surfers, Category::Waves, Category::Beach];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Surfers => "surfers",
            Category::Waves => "waves",
            Category::Beach => "beach",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "surfers" => Ok(Category::Surfers),
            "waves" => Ok(Category::Waves),
            "beach" => Ok(Category::Beach),
            other => Err(format!(
                "unknown category '{}', expected one of: surfers, waves, beach",
                other
            )),
        }
    }
}

/// One photo listed in the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    /// Listing price in whole dollars
    pub price_usd: u32,
    pub photographer: String,
    /// Alt text for the rendered image
    pub alt: String,
    pub source_url: String,
}

/// The gallery's photo listing.
#[derive(Debug, Clone)]
pub struct Catalog {
    photos: Vec<Photo>,
}

impl Catalog {
    /// The photo set the storefront ships with.
    pub fn builtin() -> Self {
        let photo = |id: &str,
                     title: &str,
                     description: &str,
                     category: Category,
                     price_usd: u32,
                     photographer: &str,
                     alt: &str,
                     source_url: &str| Photo {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            price_usd,
            photographer: photographer.to_string(),
            alt: alt.to_string(),
            source_url: source_url.to_string(),
        };

        Self {
            photos: vec![
                photo(
                    "1",
                    "Morning Surf",
                    "Surfer catching the perfect wave at sunrise",
                    Category::Surfers,
                    25,
                    "Wave Chaser",
                    "Surfer riding a wave",
                    "https://images.unsplash.com/photo-1502680390469-be75c86b636f?w=800&q=80",
                ),
                photo(
                    "2",
                    "Perfect Barrel",
                    "Beautiful barrel wave forming at sunset",
                    Category::Waves,
                    30,
                    "Ocean View",
                    "Ocean wave",
                    "https://images.unsplash.com/photo-1455729552865-3658a5d39692?w=800&q=80",
                ),
                photo(
                    "3",
                    "Tranquil Shore",
                    "Peaceful beach scene with gentle waves",
                    Category::Beach,
                    20,
                    "Sandy Toes",
                    "Beach view",
                    "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?w=800&q=80",
                ),
                photo(
                    "4",
                    "Golden Hour Session",
                    "Surfer silhouette against a golden sunset",
                    Category::Surfers,
                    35,
                    "Sunset Shooter",
                    "Sunset surf",
                    "https://images.unsplash.com/photo-1495819427834-1954f20ebb97?w=800&q=80",
                ),
                photo(
                    "5",
                    "Power Surge",
                    "Powerful wave breaking near the shore",
                    Category::Waves,
                    28,
                    "Wave Watcher",
                    "Breaking wave",
                    "https://images.unsplash.com/photo-1515541324332-7dd0c37426e0?w=800&q=80",
                ),
                photo(
                    "6",
                    "Coastal Patterns",
                    "Aerial view of beautiful coastline patterns",
                    Category::Beach,
                    40,
                    "Sky View",
                    "Beach aerial",
                    "https://images.unsplash.com/photo-1520942702018-0862200e6873?w=800&q=80",
                ),
            ],
        }
    }

    pub fn all(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.id == id)
    }

    /// Photos in a category, or all of them when no filter is given.
    pub fn by_category(&self, category: Option<Category>) -> Vec<&Photo> {
        self.photos
            .iter()
            .filter(|photo| category.map_or(true, |c| photo.category == c))
            .collect()
    }

    /// The photo after `id`, wrapping to the first at the end.
    pub fn next_after(&self, id: &str) -> Option<&Photo> {
        self.neighbor(id, 1)
    }

    /// The photo before `id`, wrapping to the last at the start.
    pub fn prev_before(&self, id: &str) -> Option<&Photo> {
        self.neighbor(id, -1)
    }

    fn neighbor(&self, id: &str, step: isize) -> Option<&Photo> {
        let len = self.photos.len() as isize;
        if len == 0 {
            return None;
        }
        let index = self.photos.iter().position(|photo| photo.id == id)? as isize;
        let neighbor = (index + step).rem_euclid(len) as usize;
        self.photos.get(neighbor)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
