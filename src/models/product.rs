use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{ChatId, ProductKey};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedProduct {
    pub url: String,
    pub target_price: Decimal,
    pub last_observed_price: Option<Decimal>,
    pub owner_chat: ChatId,

    pub added_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub url: String,
    pub target_price: Decimal,
    pub owner_chat: ChatId,
}

impl TrackedProduct {
    pub fn new(new_product: NewProduct) -> Self {
        Self {
            url: new_product.url,
            target_price: new_product.target_price,
            last_observed_price: None,
            owner_chat: new_product.owner_chat,
            added_at: Utc::now(),
            last_checked_at: None,
        }
    }

    pub fn key(&self) -> ProductKey {
        ProductKey::new(self.owner_chat, self.url.clone())
    }

    /// Whether moving from the price this snapshot last saw to `current` is an alertable drop.
    pub fn should_notify(&self, current: Decimal) -> bool {
        should_notify(self.last_observed_price, current, self.target_price)
    }

    /// Alert text sent to the owner when the price drops into range.
    pub fn price_drop_message(&self, current: Decimal) -> String {
        format!(
            "Price drop!\n\n{}\n\nNew price: {:.2} (your target: {:.2})",
            self.url, current, self.target_price
        )
    }
}

/// Fire only on a genuine drop into the target range.
///
/// An unobserved previous price never counts as higher than the current one, so the
/// first successful check only establishes the baseline. A price that stays at or below
/// target does not re-alert on later checks.
pub fn should_notify(previous: Option<Decimal>, current: Decimal, target: Decimal) -> bool {
    match previous {
        Some(previous) if previous > Decimal::ZERO => current <= target && previous > current,
        _ => false,
    }
}
