use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::product_manager::{AlertOutcome, CheckOutcome, ProductManager};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub race_misses: u64,
    pub cancelled: u64,
    pub alerts_sent: u64,
    pub delivery_failures: u64,
    pub uptime_seconds: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    race_misses: AtomicU64,
    cancelled: AtomicU64,
    alerts_sent: AtomicU64,
    delivery_failures: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: &CheckOutcome) {
        metrics::counter!("price_tracer_checks_total", "outcome" => outcome.label()).increment(1);

        match outcome {
            CheckOutcome::Updated { alert, .. } => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                match alert {
                    AlertOutcome::Sent => {
                        metrics::counter!("price_tracer_alerts_total").increment(1);
                        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    AlertOutcome::DeliveryFailed => {
                        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                    }
                    AlertOutcome::NotTriggered => {}
                }
            }
            CheckOutcome::FetchFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            CheckOutcome::RaceMiss => {
                self.race_misses.fetch_add(1, Ordering::Relaxed);
            }
            CheckOutcome::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Periodically fans out one price check per tracked product.
///
/// Checks run as independent tasks; a tick only takes a snapshot of the registry and
/// spawns, so a slow page never holds back the timer or the other products.
pub struct ProductScheduler {
    product_manager: Arc<ProductManager>,
    config: SchedulerConfig,
    limiter: Option<Arc<Semaphore>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    start_time: DateTime<Utc>,
}

impl ProductScheduler {
    /// `max_concurrent_checks` of zero leaves the number of running checks unbounded.
    pub fn new(
        product_manager: Arc<ProductManager>,
        config: SchedulerConfig,
        max_concurrent_checks: usize,
        cancel: CancellationToken,
    ) -> Self {
        let limiter = (max_concurrent_checks > 0).then(|| Arc::new(Semaphore::new(max_concurrent_checks)));

        Self {
            product_manager,
            config,
            limiter,
            counters: Arc::new(Counters::default()),
            cancel,
            start_time: Utc::now(),
        }
    }

    /// Tick until cancelled, then wind down in-flight checks.
    pub async fn run(&self) {
        let period = self.config.check_interval();
        let first_tick = if self.config.check_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut ticker = tokio::time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut workers = JoinSet::new();
        tracing::info!(interval_secs = period.as_secs(), "Product scheduler started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let dispatched = self.dispatch(&mut workers).await;
                    tracing::info!(dispatched, in_flight = workers.len(), "Started price checks");
                }
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    Self::reap(joined);
                }
            }
        }

        self.drain(workers).await;
        tracing::info!("Product scheduler shutdown");
    }

    /// Dispatch one tick and wait for every check it started.
    pub async fn run_tick(&self) -> Vec<CheckOutcome> {
        let mut workers = JoinSet::new();
        self.dispatch(&mut workers).await;

        let mut outcomes = Vec::with_capacity(workers.len());
        while let Some(joined) = workers.join_next().await {
            if let Ok(outcome) = &joined {
                outcomes.push(*outcome);
            }
            Self::reap(joined);
        }
        outcomes
    }

    pub fn stats(&self) -> SchedulerStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let uptime = Utc::now().signed_duration_since(self.start_time);

        SchedulerStats {
            ticks: load(&self.counters.ticks),
            dispatched: load(&self.counters.dispatched),
            succeeded: load(&self.counters.succeeded),
            failed: load(&self.counters.failed),
            race_misses: load(&self.counters.race_misses),
            cancelled: load(&self.counters.cancelled),
            alerts_sent: load(&self.counters.alerts_sent),
            delivery_failures: load(&self.counters.delivery_failures),
            uptime_seconds: uptime.num_seconds().max(0) as u64,
        }
    }

    async fn dispatch(&self, workers: &mut JoinSet<CheckOutcome>) -> usize {
        let products = self.product_manager.registry().snapshot().await;

        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        self.counters.dispatched.fetch_add(products.len() as u64, Ordering::Relaxed);
        metrics::counter!("price_tracer_ticks_total").increment(1);

        let dispatched = products.len();
        for product in products {
            let product_manager = Arc::clone(&self.product_manager);
            let limiter = self.limiter.clone();
            let counters = Arc::clone(&self.counters);
            let cancel = self.cancel.child_token();

            workers.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            counters.record(&CheckOutcome::Cancelled);
                            return CheckOutcome::Cancelled;
                        }
                        permit = limiter.acquire_owned() => permit.ok(),
                    },
                    None => None,
                };

                let outcome = product_manager.check_product(&product, &cancel).await;
                counters.record(&outcome);
                outcome
            });
        }

        dispatched
    }

    async fn drain(&self, mut workers: JoinSet<CheckOutcome>) {
        if workers.is_empty() {
            return;
        }

        tracing::info!(in_flight = workers.len(), "Waiting for in-flight price checks");
        let drained = tokio::time::timeout(self.config.shutdown_grace(), async {
            while let Some(joined) = workers.join_next().await {
                Self::reap(joined);
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!(remaining = workers.len(), "Aborting price checks still running after grace period");
            workers.shutdown().await;
        }
    }

    fn reap(joined: Result<CheckOutcome, JoinError>) {
        match joined {
            Ok(outcome) => tracing::trace!(outcome = outcome.label(), "Price check finished"),
            Err(e) if e.is_panic() => tracing::error!("Price check task panicked: {}", e),
            Err(e) => tracing::debug!("Price check task aborted: {}", e),
        }
    }
}
