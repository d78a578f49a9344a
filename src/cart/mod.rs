//! Shopping cart and checkout.
//!
//! Each photo is a single-license listing, so the cart holds at most one
//! copy of any photo. Checkout drains the cart into an [`Order`] receipt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Photo;

/// Cart of photos selected for purchase, unique by photo id.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<Photo>,
}

/// Receipt produced by a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub items: Vec<Photo>,
    pub total_usd: u32,
    pub placed_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a photo. Returns `false` when it is already in the cart.
    pub fn add(&mut self, photo: Photo) -> bool {
        if self.contains(&photo.id) {
            return false;
        }
        tracing::debug!(photo = %photo.id, price = photo.price_usd, "added photo to cart");
        self.items.push(photo);
        true
    }

    /// Remove a photo by id. Returns `false` when it was not in the cart.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|photo| photo.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[Photo] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|photo| photo.id == id)
    }

    /// Sum of the listed prices, in whole dollars.
    pub fn total_usd(&self) -> u32 {
        self.items.iter().map(|photo| photo.price_usd).sum()
    }

    /// Drain the cart into an order receipt. Fails on an empty cart.
    pub fn checkout(&mut self) -> Result<Order, String> {
        if self.items.is_empty() {
            return Err("Cannot check out an empty cart".to_string());
        }
        let total_usd = self.total_usd();
        let items = std::mem::take(&mut self.items);
        let order = Order {
            id: Uuid::new_v4(),
            items,
            total_usd,
            placed_at: Utc::now(),
        };
        tracing::info!(order = %order.id, items = order.items.len(), total_usd, "order placed");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn photo(id: &str) -> Photo {
        Catalog::builtin().get(id).cloned().unwrap()
    }

    #[test]
    fn test_add_dedupes_by_id() {
        let mut cart = Cart::new();
        assert!(cart.add(photo("1")));
        assert!(!cart.add(photo("1")));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut cart = Cart::new();
        cart.add(photo("1"));
        cart.add(photo("2"));

        assert!(cart.remove("1"));
        assert!(!cart.remove("1"));
        assert_eq!(cart.len(), 1);
        assert!(cart.contains("2"));
    }

    #[test]
    fn test_total_sums_prices() {
        let mut cart = Cart::new();
        cart.add(photo("1")); // $25
        cart.add(photo("2")); // $30
        cart.add(photo("6")); // $40
        assert_eq!(cart.total_usd(), 95);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add(photo("3"));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_usd(), 0);
    }

    #[test]
    fn test_checkout_drains_cart() {
        let mut cart = Cart::new();
        cart.add(photo("1"));
        cart.add(photo("5"));

        let order = cart.checkout().unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_usd, 53);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_checkout_empty_cart_fails() {
        let mut cart = Cart::new();
        assert!(cart.checkout().is_err());
    }

    #[test]
    fn test_order_serializes_as_receipt() {
        let mut cart = Cart::new();
        cart.add(photo("2"));
        let order = cart.checkout().unwrap();

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["total_usd"], 30);
        assert_eq!(json["items"][0]["title"], "Perfect Barrel");
        assert!(json["id"].is_string());
        assert!(json["placed_at"].is_string());
    }
}
