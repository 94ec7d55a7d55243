pub mod fetcher;
pub mod notifier;

pub use fetcher::PriceFetcher;
pub use notifier::Notifier;

#[cfg(test)]
pub use fetcher::MockPriceFetcher;
#[cfg(test)]
pub use notifier::MockNotifier;
