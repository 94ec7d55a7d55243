//! In-memory store of every tracked product.
//!
//! The registry is the sole owner of [`TrackedProduct`] values. Callers only ever get
//! owned copies back, so nothing outside this module can observe a half-written entry.
//! Every method takes the lock exactly once and releases it before returning; no I/O
//! happens while it is held.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{ChatId, ProductKey, TrackedProduct};

/// Result of [`ProductRegistry::update_price`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUpdate {
    Updated,
    /// The entry was removed between snapshot and update.
    NotFound,
}

#[derive(Clone, Default)]
pub struct ProductRegistry {
    products: Arc<RwLock<HashMap<ProductKey, TrackedProduct>>>,
}

impl ProductRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace the entry for the product's key.
    pub async fn upsert(&self, product: TrackedProduct) {
        let key = product.key();
        let mut products = self.products.write().await;
        products.insert(key, product);
    }

    /// Point-in-time copy of all entries.
    pub async fn snapshot(&self) -> Vec<TrackedProduct> {
        let products = self.products.read().await;
        products.values().cloned().collect()
    }

    /// Record a freshly observed price if the entry still exists.
    pub async fn update_price(&self, key: &ProductKey, new_price: Decimal) -> PriceUpdate {
        let mut products = self.products.write().await;
        match products.get_mut(key) {
            Some(product) => {
                product.last_observed_price = Some(new_price);
                product.last_checked_at = Some(Utc::now());
                PriceUpdate::Updated
            }
            None => PriceUpdate::NotFound,
        }
    }

    pub async fn list_for(&self, owner: ChatId) -> Vec<TrackedProduct> {
        let products = self.products.read().await;
        products
            .values()
            .filter(|p| p.owner_chat == owner)
            .cloned()
            .collect()
    }

    pub async fn get(&self, key: &ProductKey) -> Option<TrackedProduct> {
        let products = self.products.read().await;
        products.get(key).cloned()
    }

    /// Returns true if an entry was removed.
    pub async fn remove(&self, key: &ProductKey) -> bool {
        let mut products = self.products.write().await;
        products.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}
