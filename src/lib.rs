pub mod bot;
pub mod config;
pub mod models;
pub mod plugins;
pub mod product_manager;
pub mod registry;
pub mod scheduler;
pub mod scraper;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use crate::config::AppConfig;
pub use crate::product_manager::{AlertOutcome, CheckOutcome, ProductManager};
pub use crate::registry::{PriceUpdate, ProductRegistry};
pub use crate::scheduler::{ProductScheduler, SchedulerStats};
pub use crate::scraper::HttpPriceFetcher;
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
