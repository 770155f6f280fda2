// src/ingest/mod.rs
pub mod providers;
pub mod types;

use anyhow::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use metrics::{counter, histogram};

use crate::ingest::types::{FeedBatch, FeedProvider};

/// Upstream publication format: `20250906T093000`, always UTC.
pub const TIME_PUBLISHED_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Parse a raw `time_published` string. `None` for anything malformed.
pub fn parse_time_published(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIME_PUBLISHED_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

/// Fetch one batch from `provider`, with telemetry.
/// Errors are returned to the caller; the current cycle is the one that fails.
pub async fn run_once(provider: &dyn FeedProvider) -> Result<FeedBatch> {
    crate::metrics::ensure_metrics_described();

    let t0 = std::time::Instant::now();
    match provider.fetch_latest().await {
        Ok(batch) => {
            histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            counter!("feed_items_total").increment(batch.len() as u64);
            tracing::debug!(provider = provider.name(), items = batch.len(), "feed fetched");
            Ok(batch)
        }
        Err(e) => {
            tracing::warn!(error = ?e, provider = provider.name(), "provider error");
            counter!("feed_provider_errors_total").increment(1);
            Err(e)
        }
    }
}
