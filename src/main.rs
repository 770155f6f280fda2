//! Strong news signals — binary entrypoint.
//! Starts the poll loop on a background task and serves the liveness routes.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use strong_news_signals::{api, config::Config, init_tracing, metrics, notify, poll};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env();
    cfg.log_summary();

    let metrics = if metrics::debug_routes_enabled() {
        Some(metrics::Metrics::init()?)
    } else {
        None
    };

    let notifier = notify::from_config(&cfg)?;
    let _poller = poll::spawn(cfg.clone(), notifier);

    let app = api::router(metrics.as_ref());
    let listener = TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .with_context(|| format!("binding health server on port {}", cfg.port))?;
    info!(port = cfg.port, "health server listening");

    axum::serve(listener, app).await.context("health server")?;
    Ok(())
}
