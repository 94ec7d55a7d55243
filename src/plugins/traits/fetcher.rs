use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::Result;

/// Capability that turns a product page URL into its current price.
///
/// Implementations must treat a missing price element, unparsable text or a
/// non-positive amount as an error; callers never receive a zero price.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch_price(&self, url: &str) -> Result<Decimal>;
}
