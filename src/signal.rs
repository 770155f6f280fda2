// src/signal.rs
//! Strong-signal filter.
//!
//! [`candidates`] is the I/O-free half: it walks a feed batch lazily and yields
//! every (item, ticker) pair that is recent, strong, relevant, directional and
//! not yet emitted. [`Candidate::into_signal`] turns one of them into a
//! [`Signal`] once a price lookup has been attempted. [`strong_signals`] glues
//! the two with a [`PriceOracle`].

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::config::FilterConfig;
use crate::dedup::EmittedSet;
use crate::ingest::types::{NewsItem, SentimentLabel, TickerSentiment};
use crate::price::PriceOracle;

/// Dedup identity: `time_published|title|ticker`, with the publication time
/// exactly as the feed sent it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey(String);

impl SignalKey {
    pub fn new(time_published: &str, title: &str, ticker: &str) -> Self {
        Self(format!("{time_published}|{title}|{ticker}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short digest for log lines (titles stay out of the logs).
    pub fn short_id(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut out = String::with_capacity(12);
        for b in digest.iter().take(6) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// Strict allow-list: only BULLISH and BEARISH are directional.
    pub fn from_label(label: &SentimentLabel) -> Option<Self> {
        match label {
            SentimentLabel::Bullish => Some(Self::Buy),
            SentimentLabel::Bearish => Some(Self::Sell),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    fn arrow(self) -> &'static str {
        match self {
            Self::Buy => "📈",
            Self::Sell => "📉",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub take_profit: f64,
    pub stop_loss: f64,
}

pub fn compute_levels(action: Action, price: f64, tp_pct: f64, sl_pct: f64) -> Levels {
    match action {
        Action::Buy => Levels {
            take_profit: price * (1.0 + tp_pct),
            stop_loss: price * (1.0 - sl_pct),
        },
        Action::Sell => Levels {
            take_profit: price * (1.0 - tp_pct),
            stop_loss: price * (1.0 + sl_pct),
        },
    }
}

/// Precision follows magnitude: 6 decimals below 1, 4 below 10, else 2.
pub fn fmt_price(p: f64) -> String {
    if p < 1.0 {
        format!("{p:.6}")
    } else if p < 10.0 {
        format!("{p:.4}")
    } else {
        format!("{p:.2}")
    }
}

/// Case-insensitive substring matches of `keywords` in `title`, deduped and sorted.
pub fn matched_keywords(title: &str, keywords: &[String]) -> Vec<String> {
    let lower = title.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.is_empty() && lower.contains(k.as_str()))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn window_cutoff(now: DateTime<Utc>, hours_window: i64) -> DateTime<Utc> {
    Duration::try_hours(hours_window)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A qualifying (item, ticker) pair before price enrichment.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub key: SignalKey,
    pub item: &'a NewsItem,
    pub published_at: DateTime<Utc>,
    pub sentiment: &'a TickerSentiment,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub struct Signal {
    pub key: SignalKey,
    pub ticker: String,
    pub action: Action,
    pub published_at: DateTime<Utc>,
    pub price: Option<f64>,
    pub levels: Option<Levels>,
    pub keywords: Vec<String>,
    pub price_line: String,
    pub text: String,
}

/// Lazily yield new strong candidates from `batch`.
///
/// Items that fail to parse or were published before `now - hours_window`
/// are skipped whole. Each ticker entry is then judged on its own. Keys found
/// in `emitted`, or already yielded by this iterator, are skipped.
pub fn candidates<'a, 's>(
    batch: &'a [NewsItem],
    now: DateTime<Utc>,
    emitted: &'s EmittedSet,
    cfg: &'s FilterConfig,
) -> impl Iterator<Item = Candidate<'a>> + 's
where
    'a: 's,
{
    let cutoff = window_cutoff(now, cfg.hours_window);
    let mut yielded: HashSet<SignalKey> = HashSet::new();

    batch
        .iter()
        .filter_map(move |item| {
            item.published_at()
                .filter(|t| *t >= cutoff)
                .map(|t| (item, t))
        })
        .flat_map(|(item, t)| item.ticker_sentiments.iter().map(move |ts| (item, t, ts)))
        .filter(move |(_, _, ts)| {
            ts.sentiment_score.abs() >= cfg.strong_score
                && ts.relevance >= cfg.min_ticker_relevance
        })
        .filter_map(|(item, t, ts)| {
            let action = Action::from_label(&ts.sentiment_label)?;
            Some(Candidate {
                key: SignalKey::new(&item.time_published, &item.title, &ts.ticker),
                item,
                published_at: t,
                sentiment: ts,
                action,
            })
        })
        .filter(move |c| !emitted.contains(&c.key) && yielded.insert(c.key.clone()))
}

impl Candidate<'_> {
    pub fn ticker(&self) -> &str {
        &self.sentiment.ticker
    }

    /// Build the notification. A missing price never suppresses the signal.
    pub fn into_signal(self, price: Option<f64>, cfg: &FilterConfig) -> Signal {
        let levels = price.map(|p| compute_levels(self.action, p, cfg.tp_pct, cfg.sl_pct));
        let price_line = match (price, levels) {
            (Some(p), Some(l)) => {
                let (tp_sign, sl_sign) = match self.action {
                    Action::Buy => ('+', '-'),
                    Action::Sell => ('-', '+'),
                };
                format!(
                    "• Price: {} | TP: {} ({}{:.1}%) | SL: {} ({}{:.1}%)",
                    fmt_price(p),
                    fmt_price(l.take_profit),
                    tp_sign,
                    cfg.tp_pct * 100.0,
                    fmt_price(l.stop_loss),
                    sl_sign,
                    cfg.sl_pct * 100.0,
                )
            }
            _ => "• Price: unavailable (quote API limit) - TP/SL not computed".to_string(),
        };

        let keywords = matched_keywords(&self.item.title, &cfg.keyword_boost);
        let ts = self.sentiment;

        let mut lines = vec![
            "📢 Strong news detected".to_string(),
            format!("{} {} {}", self.action.arrow(), self.action, ts.ticker),
            format!("• Title: {}", self.item.title),
            format!(
                "• Published (UTC): {}",
                self.published_at.format("%Y-%m-%d %H:%M:%S")
            ),
            format!(
                "• Ticker sentiment: {:+.2} ({}), relevance: {:.2}",
                ts.sentiment_score,
                ts.sentiment_label.as_str(),
                ts.relevance
            ),
            price_line.clone(),
        ];
        if !keywords.is_empty() {
            lines.push(format!("• Keywords: {}", keywords.join(", ")));
        }
        lines.push(format!(
            "• Rule: |score| ≥ {:.2} and relevance ≥ {:.2} ⇒ strong news",
            cfg.strong_score, cfg.min_ticker_relevance
        ));

        Signal {
            key: self.key,
            ticker: ts.ticker.clone(),
            action: self.action,
            published_at: self.published_at,
            price,
            levels,
            keywords,
            price_line,
            text: lines.join("\n"),
        }
    }
}

/// Filter `batch` and enrich every candidate with a best-effort price.
pub async fn strong_signals(
    batch: &[NewsItem],
    now: DateTime<Utc>,
    emitted: &EmittedSet,
    cfg: &FilterConfig,
    prices: &dyn PriceOracle,
) -> Vec<Signal> {
    let mut out = Vec::new();
    for c in candidates(batch, now, emitted, cfg) {
        let price = prices.get_price(c.ticker()).await;
        out.push(c.into_signal(price, cfg));
    }
    out
}
