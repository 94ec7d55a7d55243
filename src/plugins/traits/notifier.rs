use async_trait::async_trait;

use crate::models::ChatId;
use crate::Result;

/// Delivers a text message to the chat that owns a product.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()>;
}
