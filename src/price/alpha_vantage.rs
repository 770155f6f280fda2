use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{PriceLookup, PriceSource};
use crate::config::Config;
use crate::ingest::providers::alpha_vantage::USER_AGENT;

#[derive(Debug, Deserialize)]
struct GlobalQuoteResp {
    #[serde(rename = "Global Quote", default)]
    quote: Option<GlobalQuote>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price", default)]
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntradayResp {
    #[serde(rename = "Time Series (1min)", default)]
    series: Option<BTreeMap<String, Bar>>,
}

#[derive(Debug, Deserialize)]
struct Bar {
    #[serde(rename = "4. close", default)]
    close: Option<String>,
}

pub(crate) fn parse_global_quote(body: &str) -> Result<f64> {
    let resp: GlobalQuoteResp = serde_json::from_str(body).context("parsing global quote")?;
    let raw = resp
        .quote
        .and_then(|q| q.price)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| anyhow!("global quote carried no price"))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("global quote price {raw:?}"))
}

/// Close of the latest bar. Keys are `YYYY-MM-DD HH:MM:SS`, so the greatest
/// key is the most recent observation.
pub(crate) fn parse_intraday_close(body: &str) -> Result<f64> {
    let resp: IntradayResp = serde_json::from_str(body).context("parsing intraday series")?;
    let series = resp
        .series
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("intraday series empty"))?;
    let (ts, bar) = series
        .into_iter()
        .next_back()
        .ok_or_else(|| anyhow!("intraday series empty"))?;
    let raw = bar
        .close
        .ok_or_else(|| anyhow!("latest bar {ts} has no close"))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("intraday close {raw:?} at {ts}"))
}

struct Endpoint {
    client: reqwest::Client,
    base: String,
    api_key: String,
}

impl Endpoint {
    fn new(base: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(12))
            .build()
            .context("building price http client")?;
        Ok(Self {
            client,
            base: base.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn query(&self, params: &[(&str, &str)]) -> Result<String> {
        self.client
            .get(format!("{}/query", self.base))
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("price get()")?
            .error_for_status()
            .map_err(|e| e.without_url())
            .context("price non-2xx")?
            .text()
            .await
            .context("price .text()")
    }
}

/// `GLOBAL_QUOTE`: realtime-ish last price.
pub struct GlobalQuoteSource {
    ep: Endpoint,
}

impl GlobalQuoteSource {
    pub fn new(base: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            ep: Endpoint::new(base, api_key)?,
        })
    }
}

#[async_trait]
impl PriceSource for GlobalQuoteSource {
    async fn fetch_price(&self, ticker: &str) -> Result<f64> {
        let body = self
            .ep
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", ticker)])
            .await?;
        parse_global_quote(&body)
    }

    fn name(&self) -> &'static str {
        "GLOBAL_QUOTE"
    }
}

/// `TIME_SERIES_INTRADAY` 1min: close of the latest bar.
pub struct IntradaySource {
    ep: Endpoint,
}

impl IntradaySource {
    pub fn new(base: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            ep: Endpoint::new(base, api_key)?,
        })
    }
}

#[async_trait]
impl PriceSource for IntradaySource {
    async fn fetch_price(&self, ticker: &str) -> Result<f64> {
        let body = self
            .ep
            .query(&[
                ("function", "TIME_SERIES_INTRADAY"),
                ("symbol", ticker),
                ("interval", "1min"),
                ("outputsize", "compact"),
            ])
            .await?;
        parse_intraday_close(&body)
    }

    fn name(&self) -> &'static str {
        "TIME_SERIES_INTRADAY"
    }
}

/// Global quote first, intraday series as fallback.
pub fn lookup(base: &str, api_key: &str) -> Result<PriceLookup> {
    Ok(PriceLookup::new(vec![
        Box::new(GlobalQuoteSource::new(base, api_key)?),
        Box::new(IntradaySource::new(base, api_key)?),
    ]))
}

pub fn lookup_from_config(cfg: &Config) -> Result<PriceLookup> {
    lookup(
        &cfg.alpha_vantage_base,
        cfg.alpha_vantage_key.as_deref().unwrap_or_default(),
    )
}
