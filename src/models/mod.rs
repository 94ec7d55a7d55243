use serde::{Deserialize, Serialize};
use std::fmt;

pub mod product;

pub use product::*;

/// Opaque identifier of the chat that owns a tracked product.
pub type ChatId = i64;

/// Identity of a tracked product: one owner tracking one URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductKey {
    pub owner_chat: ChatId,
    pub url: String,
}

impl ProductKey {
    pub fn new(owner_chat: ChatId, url: impl Into<String>) -> Self {
        Self {
            owner_chat,
            url: url.into(),
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.owner_chat)
    }
}
