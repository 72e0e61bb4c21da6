//! Thin Telegram front door: long-polls `getUpdates` and answers every
//! contact with an inline keyboard that opens the Mini App. All real
//! functionality lives behind the gateway API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Telegram API unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),
    #[error("Telegram API error: HTTP {0}")]
    Api(u16),
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
    from: Option<Sender>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Sender {
    username: Option<String>,
    first_name: Option<String>,
}

pub struct TelegramBot {
    client: Client,
    api_base: String,
    mini_app_url: String,
}

const POLL_TIMEOUT_SECS: u64 = 30;

impl TelegramBot {
    pub fn new(token: &str, mini_app_url: String) -> Self {
        let client = Client::builder()
            // Long poll runs 30s; leave headroom before the client gives up
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .use_rustls_tls()
            .build()
            .expect("Failed to build Telegram HTTP client");

        Self {
            client,
            api_base: format!("https://api.telegram.org/bot{}", token),
            mini_app_url,
        }
    }

    pub async fn run(&self) -> Result<(), BotError> {
        info!(mini_app = %self.mini_app_url, "Telegram bot polling started");

        let mut offset: i64 = 0;
        loop {
            let updates = match self.get_updates(offset).await {
                Ok(u) => u,
                Err(BotError::Api(409)) => {
                    error!("Another bot instance is running; stop it and restart");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Polling error");
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Some(message) = update.message {
                    if let Err(e) = self.handle_message(message).await {
                        warn!(error = %e, "Failed to handle message");
                    }
                }
            }
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, BotError> {
        let resp = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::Api(resp.status().as_u16()));
        }

        let body: UpdatesResponse = resp.json().await?;
        if !body.ok {
            return Err(BotError::Api(200));
        }
        Ok(body.result)
    }

    async fn handle_message(&self, message: Message) -> Result<(), BotError> {
        let chat_id = message.chat.id;
        let text = message.text.as_deref().unwrap_or("");

        if text.starts_with("/start") {
            let username = message
                .from
                .as_ref()
                .and_then(|f| f.username.clone().or_else(|| f.first_name.clone()))
                .unwrap_or_else(|| "there".to_string());

            let welcome = format!(
                "👋 Welcome, {}!\n\n📱 SMS Number Rental & Activation\n\n\
                 Click the button below to open the Mini App:",
                username
            );
            return self.send_main_menu(chat_id, &welcome).await;
        }

        // Any plain text brings the menu back; other commands are ignored
        if !text.is_empty() && !text.starts_with('/') {
            return self
                .send_main_menu(chat_id, "Click the button below to open the Mini App:")
                .await;
        }

        Ok(())
    }

    async fn send_main_menu(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        let resp = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "reply_markup": {
                    "inline_keyboard": [[{
                        "text": "📱 Open Mini App",
                        "web_app": { "url": self.mini_app_url }
                    }]]
                }
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BotError::Api(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_payload_deserializes() {
        let body = r#"{
            "ok": true,
            "result": [{
                "update_id": 10,
                "message": {
                    "chat": {"id": 42},
                    "text": "/start",
                    "from": {"username": "alice"}
                }
            }]
        }"#;
        let parsed: UpdatesResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result[0].update_id, 10);
        let msg = parsed.result[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 42);
        assert_eq!(msg.text.as_deref(), Some("/start"));
    }

    #[test]
    fn updates_without_messages_are_tolerated() {
        let parsed: UpdatesResponse =
            serde_json::from_str(r#"{"ok": true, "result": [{"update_id": 1}]}"#).unwrap();
        assert!(parsed.result[0].message.is_none());
    }
}
