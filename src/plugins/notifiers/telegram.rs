use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::TelegramConfig;
use crate::models::ChatId;
use crate::plugins::traits::Notifier;
use crate::utils::error::AppError;
use crate::Result;

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: ChatId,
}

/// Thin Bot API client shared by the update poller and the notifier.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    endpoint: String,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
        })
    }

    pub async fn send_message(&self, chat: ChatId, text: &str) -> Result<()> {
        let _: Message = self
            .call("sendMessage", &json!({ "chat_id": chat, "text": text }))
            .await?;
        Ok(())
    }

    /// Long-poll for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // The Bot API reports failures as `ok: false` with a description, even on 4xx
        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(AppError::parse(format!("Malformed {} response: {}", method, e)));
            }
            Err(_) => {
                return Err(AppError::Api {
                    method: method.to_string(),
                    description: format!("HTTP {}", status.as_u16()),
                });
            }
        };

        match envelope {
            ApiEnvelope { ok: true, result: Some(result), .. } => Ok(result),
            ApiEnvelope { description, .. } => Err(AppError::Api {
                method: method.to_string(),
                description: description.unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            }),
        }
    }
}

pub struct TelegramNotifier {
    client: TelegramClient,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()> {
        self.client
            .send_message(chat, text)
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))
    }
}
