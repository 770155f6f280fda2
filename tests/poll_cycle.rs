// tests/poll_cycle.rs
//
// Poll loop cycles against in-process stubs: feed, prices and notifier.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use strong_news_signals::ingest::types::{
    FeedBatch, FeedProvider, NewsItem, SentimentLabel, TickerSentiment,
};
use strong_news_signals::poll::{self, PollLoop};
use strong_news_signals::price::PriceOracle;
use strong_news_signals::{Config, Notifier, SignalKey};

/// Serves whatever batch is currently loaded; `None` means the fetch fails.
struct StubFeed {
    batch: Mutex<Option<FeedBatch>>,
}

impl StubFeed {
    fn new(batch: FeedBatch) -> Arc<Self> {
        Arc::new(Self {
            batch: Mutex::new(Some(batch)),
        })
    }

    fn load(&self, batch: Option<FeedBatch>) {
        *self.batch.lock().unwrap() = batch;
    }
}

#[async_trait]
impl FeedProvider for StubFeed {
    async fn fetch_latest(&self) -> Result<FeedBatch> {
        self.batch
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("feed unreachable"))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct FixedPrice(Option<f64>);

#[async_trait]
impl PriceOracle for FixedPrice {
    async fn get_price(&self, _ticker: &str) -> Option<f64> {
        self.0
    }
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(anyhow!("chat api down"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 12, 0, 0).unwrap()
}

fn item(time_published: &str, title: &str, ticker: &str, score: f64, label: &str) -> NewsItem {
    NewsItem {
        time_published: time_published.to_string(),
        title: title.to_string(),
        ticker_sentiments: vec![TickerSentiment {
            ticker: ticker.to_string(),
            sentiment_score: score,
            sentiment_label: SentimentLabel::parse(label),
            relevance: 0.8,
        }],
    }
}

fn acme() -> NewsItem {
    item("20250906T120000", "Acme beats earnings forecast", "ACME", 0.6, "Bullish")
}

fn poll_loop(feed: Arc<StubFeed>, notifier: Arc<RecordingNotifier>) -> PollLoop {
    PollLoop::new(
        feed,
        Arc::new(FixedPrice(Some(10.0))),
        notifier,
        &Config::default(),
    )
}

#[tokio::test]
async fn same_item_in_successive_cycles_is_notified_once() {
    let feed = StubFeed::new(vec![acme()]);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut poll = poll_loop(feed, notifier.clone());

    let first = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(first.signals, 1);

    let second = poll
        .run_cycle_at(now() + Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(second.signals, 0);

    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("📈 BUY ACME"));
    assert!(poll.emitted().contains(&SignalKey::new(
        "20250906T120000",
        "Acme beats earnings forecast",
        "ACME"
    )));
}

#[tokio::test]
async fn failed_delivery_still_marks_key_emitted() {
    let feed = StubFeed::new(vec![acme()]);
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });
    let mut poll = poll_loop(feed, notifier.clone());

    let first = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(first.signals, 1);
    assert_eq!(first.delivery_failures, 1);
    assert_eq!(poll.emitted().len(), 1);

    let second = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(second.signals, 0);
    assert_eq!(notifier.messages().len(), 1, "no retry of the failed key");
}

#[tokio::test]
async fn feed_failure_is_reported_and_next_cycle_recovers() {
    let feed = StubFeed::new(vec![acme()]);
    feed.load(None);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut poll = poll_loop(feed.clone(), notifier.clone());

    assert!(poll.tick_at(now()).await.is_none());
    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("⚠️ Poll cycle error"), "{}", sent[0]);
    assert!(sent[0].contains("feed unreachable"));

    feed.load(Some(vec![acme()]));
    let report = poll.tick_at(now()).await.expect("cycle succeeds");
    assert_eq!(report.signals, 1);
}

#[tokio::test]
async fn every_qualifying_pair_in_a_batch_is_sent() {
    let feed = StubFeed::new(vec![
        acme(),
        item("20250906T113000", "Globex CEO resigns", "GLBX", -0.7, "Bearish"),
        item("20250906T112000", "Initech holds steady", "INIT", 0.9, "Neutral"),
    ]);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut poll = poll_loop(feed, notifier.clone());

    let report = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(report.items, 3);
    assert_eq!(report.signals, 2);
    let sent = notifier.messages();
    assert!(sent.iter().any(|m| m.contains("📉 SELL GLBX")));
    assert!(!sent.iter().any(|m| m.contains("INIT")));
}

#[tokio::test]
async fn emitted_keys_are_pruned_once_out_of_window() {
    let feed = StubFeed::new(vec![acme()]);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut poll = poll_loop(feed.clone(), notifier.clone());

    poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(poll.emitted().len(), 1);

    // Seven hours later the item is outside the 6h window: key goes, item stays rejected.
    let later = now() + Duration::hours(7);
    let report = poll.run_cycle_at(later).await.unwrap();
    assert_eq!(report.pruned, 1);
    assert_eq!(report.signals, 0);
    assert!(poll.emitted().is_empty());
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn pruning_can_be_disabled() {
    let feed = StubFeed::new(vec![acme()]);
    let notifier = Arc::new(RecordingNotifier::default());
    let cfg = Config {
        prune_emitted: false,
        ..Config::default()
    };
    let mut poll = PollLoop::new(feed, Arc::new(FixedPrice(None)), notifier, &cfg);

    poll.run_cycle_at(now()).await.unwrap();
    let report = poll.run_cycle_at(now() + Duration::hours(7)).await.unwrap();
    assert_eq!(report.pruned, 0);
    assert_eq!(poll.emitted().len(), 1);
}

#[tokio::test]
async fn announce_lists_filter_settings() {
    let feed = StubFeed::new(vec![]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poll = poll_loop(feed, notifier.clone());

    poll.announce().await;
    let sent = notifier.messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("|score|≥0.35"), "{}", sent[0]);
    assert!(sent[0].contains("window 6h"));
    assert!(sent[0].contains("TP: +0.5%"));
}

#[tokio::test]
async fn clock_stepping_back_does_not_resend_pruned_key() {
    // Published 30s after the 12:00 cutoff, so it falls out of the window at 12:01.
    let feed = StubFeed::new(vec![item(
        "20250906T060030",
        "Acme guidance raised",
        "ACME",
        0.7,
        "Bullish",
    )]);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut poll = poll_loop(feed, notifier.clone());

    let first = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(first.signals, 1);

    let second = poll
        .run_cycle_at(now() + Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(second.signals, 0);
    assert_eq!(second.pruned, 1);

    let third = poll.run_cycle_at(now()).await.unwrap();
    assert_eq!(third.signals, 0, "window must not reopen when the clock goes back");
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn spawn_without_feed_key_warns_once_and_exits() {
    let notifier = Arc::new(RecordingNotifier::default());
    let cfg = Config::default();
    assert!(cfg.alpha_vantage_key.is_none());

    poll::spawn(cfg, notifier.clone())
        .await
        .expect("poll task finishes on its own");

    assert_eq!(
        notifier.messages(),
        vec!["⚠️ ALPHA_VANTAGE_KEY is missing from the environment variables.".to_string()]
    );
}

#[tokio::test]
async fn spawn_without_feed_key_survives_failed_warning() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..RecordingNotifier::default()
    });

    poll::spawn(Config::default(), notifier.clone())
        .await
        .expect("delivery failure is logged, not a panic");
    assert_eq!(notifier.messages().len(), 1);
}
