//! Sends one test message through the configured notifier (Telegram, or the log when unconfigured).

use strong_news_signals::{config::Config, init_tracing, notify};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env();
    cfg.log_summary();
    let notifier = notify::from_config(&cfg)?;

    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "🔔 strong-news-signals: notification probe".to_string());
    notifier.send(&text).await?;

    println!("notify-probe done via {}", notifier.name());
    Ok(())
}
