use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::{ChatId, NewProduct, ProductKey, TrackedProduct};
use crate::plugins::{Notifier, PriceFetcher};
use crate::registry::{PriceUpdate, ProductRegistry};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertOutcome {
    NotTriggered,
    Sent,
    DeliveryFailed,
}

/// What a single price check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckOutcome {
    Updated { price: Decimal, alert: AlertOutcome },
    FetchFailed,
    /// The product was removed while its page was being fetched.
    RaceMiss,
    Cancelled,
}

impl CheckOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CheckOutcome::Updated { .. } => "updated",
            CheckOutcome::FetchFailed => "fetch_failed",
            CheckOutcome::RaceMiss => "race_miss",
            CheckOutcome::Cancelled => "cancelled",
        }
    }
}

/// Engine entry point shared by the command layer and the scheduler.
pub struct ProductManager {
    registry: ProductRegistry,
    fetcher: Arc<dyn PriceFetcher>,
    notifier: Arc<dyn Notifier>,
    fetch_timeout: Option<Duration>,
}

impl ProductManager {
    pub fn new(
        registry: ProductRegistry,
        fetcher: Arc<dyn PriceFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            notifier,
            fetch_timeout: None,
        }
    }

    /// Upper bound on a single fetch, on top of whatever the fetcher enforces itself.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &ProductRegistry {
        &self.registry
    }

    /// Start tracking `url` for `owner_chat`, replacing any earlier request for the same URL.
    pub async fn add_product(&self, url: &str, target_price: Decimal, owner_chat: ChatId) -> TrackedProduct {
        let product = TrackedProduct::new(NewProduct {
            url: url.to_string(),
            target_price,
            owner_chat,
        });
        self.registry.upsert(product.clone()).await;

        info!(url, chat = owner_chat, target = %target_price, "Tracking product");
        product
    }

    pub async fn list_products(&self, owner_chat: ChatId) -> Vec<TrackedProduct> {
        let mut products = self.registry.list_for(owner_chat).await;
        products.sort_by(|a, b| a.added_at.cmp(&b.added_at).then_with(|| a.url.cmp(&b.url)));
        products
    }

    pub async fn remove_product(&self, url: &str, owner_chat: ChatId) -> bool {
        let removed = self.registry.remove(&ProductKey::new(owner_chat, url)).await;
        if removed {
            info!(url, chat = owner_chat, "Stopped tracking product");
        }
        removed
    }

    /// Fetch the current price for one snapshot, record it and alert the owner on a drop.
    ///
    /// The alert decision compares against the price held by `product`, i.e. the value
    /// known when the check was dispatched, not whatever the registry holds afterwards.
    pub async fn check_product(&self, product: &TrackedProduct, cancel: &CancellationToken) -> CheckOutcome {
        let start_time = Instant::now();
        debug!(url = %product.url, chat = product.owner_chat, "Checking price");

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = %product.url, "Price check cancelled");
                return CheckOutcome::Cancelled;
            }
            result = self.fetch(&product.url) => result,
        };

        let current = match fetched {
            Ok(price) if price > Decimal::ZERO => price,
            Ok(price) => {
                warn!(url = %product.url, %price, "Fetcher returned a non-positive price");
                return CheckOutcome::FetchFailed;
            }
            Err(e) => {
                warn!(url = %product.url, error = %e, "Failed to get price");
                return CheckOutcome::FetchFailed;
            }
        };

        info!(
            url = %product.url,
            price = %current,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Current price"
        );

        if self.registry.update_price(&product.key(), current).await == PriceUpdate::NotFound {
            debug!(url = %product.url, chat = product.owner_chat, "Product removed during check");
            return CheckOutcome::RaceMiss;
        }

        if !product.should_notify(current) {
            return CheckOutcome::Updated {
                price: current,
                alert: AlertOutcome::NotTriggered,
            };
        }

        let message = product.price_drop_message(current);
        let alert = match self.notifier.send(product.owner_chat, &message).await {
            Ok(()) => {
                info!(url = %product.url, chat = product.owner_chat, price = %current, "Price drop alert sent");
                AlertOutcome::Sent
            }
            Err(e) => {
                warn!(url = %product.url, chat = product.owner_chat, error = %e, "Failed to deliver price drop alert");
                AlertOutcome::DeliveryFailed
            }
        };

        CheckOutcome::Updated { price: current, alert }
    }

    async fn fetch(&self, url: &str) -> crate::Result<Decimal> {
        match self.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch_price(url))
                .await
                .map_err(|_| AppError::Timeout { url: url.to_string() })?,
            None => self.fetcher.fetch_price(url).await,
        }
    }
}
