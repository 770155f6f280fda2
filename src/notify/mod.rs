pub mod telegram;

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;

pub use telegram::TelegramNotifier;

/// Delivers one message. Errors are reported, never retried.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fallback when no messaging credentials are configured: log and move on.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let preview: String = text.chars().take(200).collect();
        tracing::warn!(message = %preview, "telegram not configured, message not delivered");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Telegram when both token and chat id are set, local logging otherwise.
pub fn from_config(cfg: &Config) -> Result<Arc<dyn Notifier>> {
    match TelegramNotifier::from_config(cfg)? {
        Some(tg) => Ok(Arc::new(tg)),
        None => {
            tracing::warn!("telegram credentials missing, notifications go to the log only");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_falls_back_to_log() {
        let cfg = Config {
            telegram_token: Some("t".into()),
            telegram_chat_id: None,
            ..Config::default()
        };
        let n = from_config(&cfg).unwrap();
        assert_eq!(n.name(), "log");
        assert!(n.send("hello").await.is_ok());
    }

    #[tokio::test]
    async fn configured_uses_telegram() {
        let cfg = Config {
            telegram_token: Some("t".into()),
            telegram_chat_id: Some("1".into()),
            ..Config::default()
        };
        assert_eq!(from_config(&cfg).unwrap().name(), "telegram");
    }
}
