use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parsing error: {message}")]
    Parse { message: String },

    #[error("Element not found: {selector}")]
    PriceNotFound { selector: String },

    #[error("Invalid price: {value}")]
    InvalidPrice { value: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Telegram API error in {method}: {description}")]
    Api { method: String, description: String },

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl AppError {
    /// True for failures that abort a single price check without touching the registry.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Parse { .. }
                | AppError::PriceNotFound { .. }
                | AppError::InvalidPrice { .. }
                | AppError::Timeout { .. }
                | AppError::Status { .. }
        )
    }

    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
