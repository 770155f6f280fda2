use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;

use super::Notifier;
use crate::config::Config;

#[derive(Clone)]
pub struct TelegramNotifier {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(api_base: impl Into<String>, token: String, chat_id: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building telegram http client")?;
        Ok(Self {
            api_base: api_base.into(),
            token,
            chat_id,
            client,
        })
    }

    /// `None` unless both token and chat id are configured.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        match (&cfg.telegram_token, &cfg.telegram_chat_id) {
            (Some(token), Some(chat)) => Ok(Some(Self::new(
                cfg.telegram_api_base.clone(),
                token.clone(),
                chat.clone(),
            )?)),
            _ => Ok(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
        };
        // reqwest errors carry the URL, which contains the bot token.
        self.client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("telegram sendMessage")?
            .error_for_status()
            .map_err(|e| e.without_url())
            .context("telegram non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
