use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Config;
use crate::ingest::types::{FeedBatch, FeedProvider, NewsItem, SentimentLabel, TickerSentiment};

pub(crate) const USER_AGENT: &str = concat!("strong-news-signals/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RawFeed {
    #[serde(default)]
    feed: Option<Vec<Value>>,
    #[serde(rename = "Information", default)]
    information: Option<String>,
    #[serde(rename = "Note", default)]
    note: Option<String>,
    #[serde(rename = "Error Message", default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    time_published: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    ticker_sentiment: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    ticker_sentiment_score: Option<Value>,
    #[serde(default)]
    ticker_sentiment_label: Option<String>,
    #[serde(default)]
    relevance_score: Option<Value>,
}

/// Scores arrive as strings ("0.412") or plain numbers; absent means 0.
fn num_field(v: Option<&Value>) -> Option<f64> {
    let parsed = match v {
        None | Some(Value::Null) => Some(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.filter(|x| x.is_finite())
}

impl RawTicker {
    fn into_sentiment(self) -> Option<TickerSentiment> {
        let ticker = self.ticker.unwrap_or_default().trim().to_uppercase();
        if ticker.is_empty() {
            return None;
        }
        Some(TickerSentiment {
            ticker,
            sentiment_score: num_field(self.ticker_sentiment_score.as_ref())?,
            sentiment_label: SentimentLabel::parse(
                self.ticker_sentiment_label.as_deref().unwrap_or_default(),
            ),
            relevance: num_field(self.relevance_score.as_ref())?,
        })
    }
}

/// Parse a `NEWS_SENTIMENT` response body.
///
/// Malformed ticker entries are dropped one by one; the rest of the item is
/// kept. A body without `feed` (rate-limit notice) is an empty batch.
pub fn parse_feed_str(body: &str) -> Result<FeedBatch> {
    let raw: RawFeed = serde_json::from_str(body).context("parsing news sentiment json")?;

    let Some(items) = raw.feed else {
        let notice = raw
            .information
            .or(raw.note)
            .or(raw.error_message)
            .unwrap_or_else(|| "no feed field".to_string());
        tracing::warn!(notice = %notice, "news sentiment response carried no feed");
        return Ok(Vec::new());
    };

    let mut out = Vec::with_capacity(items.len());
    for v in items {
        let item: RawItem = match serde_json::from_value(v) {
            Ok(i) => i,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed feed item");
                continue;
            }
        };
        let ticker_sentiments = item
            .ticker_sentiment
            .unwrap_or_default()
            .into_iter()
            .filter_map(|t| serde_json::from_value::<RawTicker>(t).ok())
            .filter_map(RawTicker::into_sentiment)
            .collect();
        out.push(NewsItem {
            time_published: item.time_published.unwrap_or_default(),
            title: item.title.unwrap_or_default().trim().to_string(),
            ticker_sentiments,
        });
    }
    Ok(out)
}

/// Alpha Vantage `NEWS_SENTIMENT` client.
pub struct AlphaVantageFeed {
    client: reqwest::Client,
    base: String,
    api_key: String,
    topics: Option<String>,
    limit: u32,
}

impl AlphaVantageFeed {
    pub fn new(base: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .context("building feed http client")?;
        Ok(Self {
            client,
            base: base.into(),
            api_key: api_key.into(),
            topics: None,
            limit: 200,
        })
    }

    /// `None` when the feed key is missing.
    pub fn from_config(cfg: &Config) -> Result<Option<Self>> {
        let Some(key) = cfg.alpha_vantage_key.as_deref() else {
            return Ok(None);
        };
        let feed = Self::new(cfg.alpha_vantage_base.clone(), key)?
            .with_topics(cfg.topics.clone())
            .with_limit(cfg.feed_limit);
        Ok(Some(feed))
    }

    pub fn with_topics(mut self, topics: Option<String>) -> Self {
        self.topics = topics.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[async_trait]
impl FeedProvider for AlphaVantageFeed {
    async fn fetch_latest(&self) -> Result<FeedBatch> {
        let limit = self.limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("function", "NEWS_SENTIMENT"),
            ("sort", "LATEST"),
            ("limit", limit.as_str()),
            ("apikey", self.api_key.as_str()),
        ];
        if let Some(t) = self.topics.as_deref() {
            params.push(("topics", t));
        }

        let body = self
            .client
            .get(format!("{}/query", self.base))
            .query(&params)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("news sentiment get()")?
            .error_for_status()
            .map_err(|e| e.without_url())
            .context("news sentiment non-2xx")?
            .text()
            .await
            .context("news sentiment .text()")?;

        parse_feed_str(&body)
    }

    fn name(&self) -> &'static str {
        "AlphaVantage"
    }
}
