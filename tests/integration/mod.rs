// Integration tests for Price Tracer
// These tests drive the engine through its public API with in-process collaborators

pub mod api_tests;
pub mod product_lifecycle_tests;

use async_trait::async_trait;
use price_tracer::config::SchedulerConfig;
use price_tracer::models::ChatId;
use price_tracer::plugins::{Notifier, PriceFetcher};
use price_tracer::{AppError, ProductManager, ProductRegistry, ProductScheduler};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fetcher serving prices from an in-memory table that tests can change between ticks.
#[derive(Default)]
pub struct ScriptedFetcher {
    prices: Mutex<HashMap<String, Decimal>>,
    delays: Mutex<HashMap<String, Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn set_price(&self, url: &str, price: i64) {
        self.prices.lock().unwrap().insert(url.to_string(), Decimal::from(price));
    }

    pub fn clear_price(&self, url: &str) {
        self.prices.lock().unwrap().remove(url);
    }

    pub fn set_delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFetcher for ScriptedFetcher {
    async fn fetch_price(&self, url: &str) -> price_tracer::Result<Decimal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.delays.lock().unwrap().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.prices
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .ok_or_else(|| AppError::PriceNotFound {
                selector: ".price-value".to_string(),
            })
    }
}

/// Notifier that records every message and can be switched into failing mode.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(ChatId, String)>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deliveries(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, chat: ChatId, text: &str) -> price_tracer::Result<()> {
        if *self.failing.lock().unwrap() {
            return Err(AppError::Delivery("chat unreachable".to_string()));
        }
        self.sent.lock().unwrap().push((chat, text.to_string()));
        Ok(())
    }
}

pub struct TestEngine {
    pub registry: ProductRegistry,
    pub fetcher: Arc<ScriptedFetcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub product_manager: Arc<ProductManager>,
}

pub fn create_test_engine() -> TestEngine {
    let registry = ProductRegistry::new();
    let fetcher = Arc::new(ScriptedFetcher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let product_manager = Arc::new(ProductManager::new(
        registry.clone(),
        Arc::clone(&fetcher) as Arc<dyn PriceFetcher>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
    ));

    TestEngine {
        registry,
        fetcher,
        notifier,
        product_manager,
    }
}

pub fn test_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        check_interval_secs: 3600,
        shutdown_grace_secs: 1,
        check_on_start: true,
    }
}

pub fn create_test_scheduler(engine: &TestEngine, max_concurrent_checks: usize, cancel: CancellationToken) -> ProductScheduler {
    ProductScheduler::new(
        Arc::clone(&engine.product_manager),
        test_scheduler_config(),
        max_concurrent_checks,
        cancel,
    )
}
