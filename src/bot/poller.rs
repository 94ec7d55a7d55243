use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bot::handler::BotHandler;
use crate::models::ChatId;
use crate::plugins::notifiers::telegram::{TelegramClient, Update};

const ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Long-polls the Bot API and answers every text message through [`BotHandler`].
pub struct UpdatePoller {
    client: TelegramClient,
    handler: BotHandler,
    poll_timeout_secs: u64,
    cancel: CancellationToken,
}

impl UpdatePoller {
    pub fn new(client: TelegramClient, handler: BotHandler, poll_timeout_secs: u64, cancel: CancellationToken) -> Self {
        Self {
            client,
            handler,
            poll_timeout_secs,
            cancel,
        }
    }

    pub async fn run(self) {
        let mut offset = 0;
        info!("Telegram update poller started");

        loop {
            let polled = tokio::select! {
                _ = self.cancel.cancelled() => break,
                polled = self.client.get_updates(offset, self.poll_timeout_secs) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some((chat, reply)) = self.process(&update).await {
                            if let Err(e) = self.client.send_message(chat, &reply).await {
                                warn!(chat, error = %e, "Failed to send reply");
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to poll updates");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_PAUSE) => {}
                    }
                }
            }
        }

        info!("Telegram update poller stopped");
    }

    /// Reply for a single update, if it carries a text message.
    pub async fn process(&self, update: &Update) -> Option<(ChatId, String)> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?;
        debug!(chat = message.chat.id, text, "Received message");

        let reply = self.handler.handle_text(message.chat.id, text).await;
        Some((message.chat.id, reply))
    }
}
