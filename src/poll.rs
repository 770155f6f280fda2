// src/poll.rs
//! Poll loop: fetch → filter → price → notify, then sleep a fixed interval.
//!
//! The loop owns the emitted set outright. Keys are committed after delivery
//! has been attempted, whether or not it succeeded, so each key is notified at
//! most once. A failed cycle is reported through the notifier and the loop
//! carries on at the next tick.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{Config, FilterConfig};
use crate::dedup::EmittedSet;
use crate::ingest;
use crate::ingest::providers::alpha_vantage::AlphaVantageFeed;
use crate::ingest::types::FeedProvider;
use crate::notify::Notifier;
use crate::price::{self, PriceOracle};
use crate::signal::{candidates, window_cutoff, Candidate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub items: usize,
    pub signals: usize,
    pub delivery_failures: usize,
    pub pruned: usize,
}

pub struct PollLoop {
    feed: Arc<dyn FeedProvider>,
    prices: Arc<dyn PriceOracle>,
    notifier: Arc<dyn Notifier>,
    filter: FilterConfig,
    interval: Duration,
    prune: bool,
    emitted: EmittedSet,
    high_water: Option<DateTime<Utc>>,
}

impl PollLoop {
    pub fn new(
        feed: Arc<dyn FeedProvider>,
        prices: Arc<dyn PriceOracle>,
        notifier: Arc<dyn Notifier>,
        cfg: &Config,
    ) -> Self {
        Self {
            feed,
            prices,
            notifier,
            filter: cfg.filter.clone(),
            interval: Duration::from_secs(cfg.poll_secs),
            prune: cfg.prune_emitted,
            emitted: EmittedSet::new(),
            high_water: None,
        }
    }

    pub fn emitted(&self) -> &EmittedSet {
        &self.emitted
    }

    /// One fetch-filter-notify pass evaluated at `now`, or at the latest
    /// `now` seen so far if that is later.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let now = match self.high_water {
            Some(hw) if hw > now => {
                debug!(clock = %now, high_water = %hw, "clock behind high-water, using high-water");
                hw
            }
            _ => now,
        };
        self.high_water = Some(now);

        crate::metrics::ensure_metrics_described();
        counter!("poll_cycles_total").increment(1);

        let batch = ingest::run_once(self.feed.as_ref()).await?;
        let mut report = CycleReport {
            items: batch.len(),
            ..CycleReport::default()
        };

        if self.prune {
            report.pruned = self
                .emitted
                .prune_before(window_cutoff(now, self.filter.hours_window));
        }

        let pending: Vec<Candidate<'_>> =
            candidates(&batch, now, &self.emitted, &self.filter).collect();

        for c in pending {
            let price = self.prices.get_price(c.ticker()).await;
            let signal = c.into_signal(price, &self.filter);

            if let Err(e) = self.notifier.send(&signal.text).await {
                report.delivery_failures += 1;
                counter!("notify_failures_total").increment(1);
                warn!(
                    error = %e,
                    key = %signal.key.short_id(),
                    ticker = %signal.ticker,
                    "signal delivery failed"
                );
            }
            self.emitted.insert(signal.key.clone(), signal.published_at);
            report.signals += 1;
            counter!("signals_emitted_total").increment(1);
            debug!(
                key = %signal.key.short_id(),
                ticker = %signal.ticker,
                action = %signal.action,
                priced = signal.price.is_some(),
                "signal emitted"
            );
        }

        gauge!("emitted_keys").set(self.emitted.len() as f64);
        gauge!("poll_last_run_ts").set(now.timestamp() as f64);
        Ok(report)
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle; on failure report a warning through the notifier.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> Option<CycleReport> {
        match self.run_cycle_at(now).await {
            Ok(r) => {
                info!(
                    target: "poll",
                    items = r.items,
                    signals = r.signals,
                    delivery_failures = r.delivery_failures,
                    pruned = r.pruned,
                    emitted = self.emitted.len(),
                    "poll tick"
                );
                Some(r)
            }
            Err(e) => {
                counter!("poll_cycle_errors_total").increment(1);
                warn!(target: "poll", error = %format!("{e:#}"), "poll cycle failed");
                let msg = format!("⚠️ Poll cycle error: {e:#}");
                if let Err(ne) = self.notifier.send(&msg).await {
                    warn!(error = %ne, "could not report cycle error");
                }
                None
            }
        }
    }

    /// Startup message with the active filter settings.
    pub async fn announce(&self) {
        let f = &self.filter;
        let text = format!(
            "🤖 News signal bot started (signals only).\n\
             Filters: |score|≥{}, relevance≥{}, window {}h.\n\
             TP: +{:.1}%  |  SL: -{:.1}%",
            f.strong_score,
            f.min_ticker_relevance,
            f.hours_window,
            f.tp_pct * 100.0,
            f.sl_pct * 100.0
        );
        if let Err(e) = self.notifier.send(&text).await {
            warn!(error = %e, "startup message failed");
        }
    }

    /// Tick forever; the sleep is fixed regardless of how the cycle went.
    pub async fn run(mut self) {
        loop {
            self.tick_at(Utc::now()).await;
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Spawn the poll loop on its own task.
///
/// Without a feed API key the task logs, sends one warning and exits.
pub fn spawn(cfg: Config, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let feed = match AlphaVantageFeed::from_config(&cfg) {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                warn!("ALPHA_VANTAGE_KEY missing, poll loop not started");
                report_startup(
                    notifier.as_ref(),
                    "⚠️ ALPHA_VANTAGE_KEY is missing from the environment variables.",
                )
                .await;
                return;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "feed client init failed");
                report_startup(
                    notifier.as_ref(),
                    &format!("⚠️ Feed client init failed: {e:#}"),
                )
                .await;
                return;
            }
        };
        let prices = match price::alpha_vantage::lookup_from_config(&cfg) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %format!("{e:#}"), "price client init failed");
                report_startup(
                    notifier.as_ref(),
                    &format!("⚠️ Price client init failed: {e:#}"),
                )
                .await;
                return;
            }
        };
        info!(sources = ?prices.source_names(), interval_secs = cfg.poll_secs, "poll loop starting");

        let poll = PollLoop::new(Arc::new(feed), Arc::new(prices), notifier, &cfg);
        poll.announce().await;
        poll.run().await;
    })
}

async fn report_startup(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text).await {
        warn!(error = %e, notifier = notifier.name(), "startup warning not delivered");
    }
}
