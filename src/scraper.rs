use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{Html, Selector};

use crate::config::ScraperConfig;
use crate::plugins::trackers::PriceParser;
use crate::plugins::PriceFetcher;
use crate::utils::error::AppError;
use crate::Result;

/// Fetches a product page over HTTP and reads the price from the first matching element.
pub struct HttpPriceFetcher {
    client: Client,
    selector: Selector,
    selector_source: String,
    parser: PriceParser,
}

impl HttpPriceFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let selector = Selector::parse(&config.price_selector).map_err(|e| {
            AppError::Validation(format!("Invalid CSS selector '{}': {:?}", config.price_selector, e))
        })?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            selector,
            selector_source: config.price_selector.clone(),
            parser: PriceParser::new(),
        })
    }

    /// Read the price out of a page body.
    ///
    /// Elements are tried in document order; the first one whose text parses wins.
    pub fn extract_price(&self, html: &str) -> Result<Decimal> {
        let document = Html::parse_document(html);
        let mut last_error = None;

        for element in document.select(&self.selector) {
            let text = element.text().collect::<Vec<_>>().join(" ");
            match self.parser.parse(&text) {
                Ok(price) => return Ok(price),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::PriceNotFound {
            selector: self.selector_source.clone(),
        }))
    }

    fn map_request_error(url: &str, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout { url: url.to_string() }
        } else {
            AppError::Http(error)
        }
    }
}

#[async_trait]
impl PriceFetcher for HttpPriceFetcher {
    async fn fetch_price(&self, url: &str) -> Result<Decimal> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::map_request_error(url, e))?;

        self.extract_price(&body)
    }
}
