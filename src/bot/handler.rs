use std::fmt::Write;
use std::sync::Arc;

use crate::bot::commands::{parse_command, Command};
use crate::models::ChatId;
use crate::product_manager::ProductManager;

const HELP_TEXT: &str = "Hi! Send me a product link and the price you are waiting for:\n\
/add <link> <price>\n\n\
/list shows what you are tracking, /remove <link> stops tracking a product.";

/// Telegram rejects message texts longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// Room kept free for the "more not shown" footer.
const LIST_FOOTER_RESERVE: usize = 96;

/// Turns chat messages into engine calls and produces the reply text.
#[derive(Clone)]
pub struct BotHandler {
    product_manager: Arc<ProductManager>,
}

impl BotHandler {
    pub fn new(product_manager: Arc<ProductManager>) -> Self {
        Self { product_manager }
    }

    pub async fn handle_text(&self, chat: ChatId, text: &str) -> String {
        let command = match parse_command(text) {
            Some(Ok(command)) => command,
            Some(Err(e)) => return e.to_string(),
            None => return "Use commands to talk to me. Send /start for help.".to_string(),
        };

        match command {
            Command::Start => HELP_TEXT.to_string(),
            Command::Add { url, target_price } => {
                self.product_manager.add_product(&url, target_price, chat).await;
                format!("Now tracking {} with target price {:.2}", url, target_price)
            }
            Command::List => self.list(chat).await,
            Command::Remove { url } => {
                if self.product_manager.remove_product(&url, chat).await {
                    format!("Stopped tracking {}", url)
                } else {
                    format!("{} is not in your list.", url)
                }
            }
            Command::Unknown(_) => "Unknown command.".to_string(),
        }
    }

    async fn list(&self, chat: ChatId) -> String {
        let products = self.product_manager.list_products(chat).await;
        if products.is_empty() {
            return "You are not tracking any products yet.".to_string();
        }

        let total = products.len();
        let mut response = String::from("Tracked products:\n");
        let mut used = response.chars().count();
        let mut shown = 0;
        for product in products {
            let last = match product.last_observed_price {
                Some(price) => format!("{:.2}", price),
                None => "not checked yet".to_string(),
            };
            let entry = format!(
                "- URL: {}\n  Target price: {:.2}\n  Last price: {}\n",
                product.url, product.target_price, last
            );
            let len = entry.chars().count();
            if used + len > MAX_MESSAGE_CHARS - LIST_FOOTER_RESERVE {
                break;
            }
            response.push_str(&entry);
            used += len;
            shown += 1;
        }

        if shown < total {
            let _ = write!(
                response,
                "...and {} more not shown. Use /remove to trim the list.",
                total - shown
            );
        }
        response
    }
}
