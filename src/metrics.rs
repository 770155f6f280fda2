use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("poll_cycles_total", "Poll cycles started.");
        describe_counter!(
            "poll_cycle_errors_total",
            "Poll cycles aborted by an error."
        );
        describe_counter!("feed_items_total", "News items received from the feed.");
        describe_counter!(
            "feed_provider_errors_total",
            "Feed fetch/parse errors."
        );
        describe_histogram!("feed_fetch_ms", "Feed fetch time in milliseconds.");
        describe_counter!("signals_emitted_total", "Strong signals emitted.");
        describe_counter!(
            "price_unavailable_total",
            "Signals sent without a price because every source failed."
        );
        describe_counter!(
            "notify_failures_total",
            "Notification deliveries that failed."
        );
        describe_gauge!("emitted_keys", "Keys currently held by the emitted set.");
        describe_gauge!("poll_last_run_ts", "Unix ts when the poll loop last ran.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// `/metrics` is only mounted with `DEBUG_ROUTES=1`.
pub fn debug_routes_enabled() -> bool {
    std::env::var("DEBUG_ROUTES").ok().as_deref() == Some("1")
}
