// src/price/mod.rs
//! Best-effort price lookup.
//!
//! A [`PriceLookup`] holds an ordered list of [`PriceSource`]s. The first one
//! that answers wins; if every source fails the result is `None`, never an
//! error, so a missing quote cannot abort the signal pipeline.

pub mod alpha_vantage;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

/// One concrete quote provider. Any error means "try the next one".
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price(&self, ticker: &str) -> Result<f64>;
    fn name(&self) -> &'static str;
}

/// What the signal filter needs: a price or nothing.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, ticker: &str) -> Option<f64>;
}

pub struct PriceLookup {
    sources: Vec<Box<dyn PriceSource>>,
}

impl PriceLookup {
    pub fn new(sources: Vec<Box<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl PriceOracle for PriceLookup {
    async fn get_price(&self, ticker: &str) -> Option<f64> {
        crate::metrics::ensure_metrics_described();

        for src in &self.sources {
            match src.fetch_price(ticker).await {
                Ok(p) if p.is_finite() && p > 0.0 => return Some(p),
                Ok(p) => {
                    tracing::debug!(source = src.name(), ticker, price = p, "rejected price");
                }
                Err(e) => {
                    tracing::debug!(source = src.name(), ticker, error = %e, "price source failed");
                }
            }
        }
        counter!("price_unavailable_total").increment(1);
        tracing::info!(ticker, "price unavailable from all sources");
        None
    }
}
