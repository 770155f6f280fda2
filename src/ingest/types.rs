// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Sentiment label attached to one ticker of a news item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
    /// Anything else the feed sends (e.g. "Somewhat-Bullish"), uppercased.
    Other(String),
}

impl SentimentLabel {
    pub fn parse(raw: &str) -> Self {
        let up = raw.trim().to_uppercase();
        match up.as_str() {
            "BULLISH" => Self::Bullish,
            "BEARISH" => Self::Bearish,
            "NEUTRAL" => Self::Neutral,
            _ => Self::Other(up),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bullish => "BULLISH",
            Self::Bearish => "BEARISH",
            Self::Neutral => "NEUTRAL",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerSentiment {
    pub ticker: String, // uppercased
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    /// Raw upstream string, `YYYYMMDDTHHMMSS` in UTC. Part of the dedup key as-is.
    pub time_published: String,
    pub title: String,
    pub ticker_sentiments: Vec<TickerSentiment>,
}

impl NewsItem {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        super::parse_time_published(&self.time_published)
    }
}

/// One poll cycle worth of feed items.
pub type FeedBatch = Vec<NewsItem>;

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<FeedBatch>;
    fn name(&self) -> &'static str;
}
