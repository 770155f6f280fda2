// src/config.rs
//! Environment configuration.
//!
//! Every setting has a default except the credentials. Each credential may be
//! given under several variable names; the first non-empty one wins.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::{info, warn};

pub const DEFAULT_ALPHA_VANTAGE_BASE: &str = "https://www.alphavantage.co";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const DEFAULT_TOPICS: &str =
    "earnings,financial_markets,mergers_and_acquisitions,analyst_ratings,legal";
const DEFAULT_KEYWORDS: &str = "earnings,results,guidance,acquires,merger,acquisition,sec,investigation,bankruptcy,ceo,resigns,forecast,upgrade,downgrade,beats,misses,raises,cuts";

const TELEGRAM_TOKEN_VARS: &[&str] = &[
    "TELEGRAM_TOKEN",
    "TELEGRAM_BOT_TOKEN",
    "TG_BOT_TOKEN",
    "telegram_token",
];
const TELEGRAM_CHAT_VARS: &[&str] = &["TELEGRAM_CHAT_ID", "TG_CHAT_ID", "telegram_chat_id"];
const ALPHA_VANTAGE_KEY_VARS: &[&str] = &[
    "ALPHA_VANTAGE_KEY",
    "ALPHAVANTAGE_API_KEY",
    "ALPHA_VANTAGE_API_KEY",
    "alphavantage_api_key",
];

/// Thresholds and tunables consumed by the signal filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub hours_window: i64,
    pub strong_score: f64,
    pub min_ticker_relevance: f64,
    /// Lowercased, trimmed, never empty entries.
    pub keyword_boost: Vec<String>,
    pub tp_pct: f64,
    pub sl_pct: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hours_window: 6,
            strong_score: 0.35,
            min_ticker_relevance: 0.50,
            keyword_boost: parse_keywords(DEFAULT_KEYWORDS),
            tp_pct: 0.005,
            sl_pct: 0.003,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub alpha_vantage_key: Option<String>,
    pub alpha_vantage_base: String,
    pub telegram_api_base: String,
    pub poll_secs: u64,
    /// `None` disables the topic filter.
    pub topics: Option<String>,
    pub feed_limit: u32,
    pub port: u16,
    pub prune_emitted: bool,
    pub filter: FilterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_chat_id: None,
            alpha_vantage_key: None,
            alpha_vantage_base: DEFAULT_ALPHA_VANTAGE_BASE.to_string(),
            telegram_api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            poll_secs: 60,
            topics: Some(DEFAULT_TOPICS.to_string()),
            feed_limit: 200,
            port: 10_000,
            prune_emitted: true,
            filter: FilterConfig::default(),
        }
    }
}

impl Config {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Config::default();
        let df = FilterConfig::default();

        let topics = match lookup("TOPICS") {
            Some(t) if t.trim().is_empty() => None,
            Some(t) => Some(t.trim().to_string()),
            None => d.topics,
        };
        let keyword_boost = lookup("KEYWORD_BOOST")
            .map(|k| parse_keywords(&k))
            .unwrap_or(df.keyword_boost);

        Self {
            telegram_token: first_set(&lookup, TELEGRAM_TOKEN_VARS),
            telegram_chat_id: first_set(&lookup, TELEGRAM_CHAT_VARS),
            alpha_vantage_key: first_set(&lookup, ALPHA_VANTAGE_KEY_VARS),
            alpha_vantage_base: lookup("ALPHA_VANTAGE_BASE_URL")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(d.alpha_vantage_base),
            telegram_api_base: lookup("TELEGRAM_API_BASE")
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(d.telegram_api_base),
            poll_secs: at_least(
                parse_or(&lookup, "POLL_SECONDS", d.poll_secs),
                1,
                "POLL_SECONDS",
            ),
            topics,
            feed_limit: parse_or(&lookup, "FEED_LIMIT", d.feed_limit),
            port: parse_or(&lookup, "PORT", d.port),
            prune_emitted: lookup("PRUNE_EMITTED")
                .map(|v| !matches!(v.trim(), "0" | "false" | "no" | "off"))
                .unwrap_or(d.prune_emitted),
            filter: FilterConfig {
                hours_window: parse_or(&lookup, "HOURS_WINDOW", df.hours_window),
                strong_score: parse_or(&lookup, "STRONG_SCORE", df.strong_score),
                min_ticker_relevance: parse_or(
                    &lookup,
                    "MIN_TICKER_RELEVANCE",
                    df.min_ticker_relevance,
                ),
                keyword_boost,
                tp_pct: parse_or(&lookup, "TP_PCT", df.tp_pct),
                sl_pct: parse_or(&lookup, "SL_PCT", df.sl_pct),
            },
        }
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_token.is_some() && self.telegram_chat_id.is_some()
    }

    /// Startup diagnostics. Secrets are masked.
    pub fn log_summary(&self) {
        info!(
            telegram_token = %mask(self.telegram_token.as_deref(), 4),
            telegram_chat_id = self.telegram_chat_id.as_deref().unwrap_or("None"),
            alpha_vantage_key = %mask(self.alpha_vantage_key.as_deref(), 4),
            poll_secs = self.poll_secs,
            hours_window = self.filter.hours_window,
            strong_score = self.filter.strong_score,
            min_ticker_relevance = self.filter.min_ticker_relevance,
            port = self.port,
            "config loaded"
        );
    }
}

fn first_set<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|n| lookup(n))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "unparseable value, using default");
            default
        }),
    }
}

fn at_least(value: u64, min: u64, name: &str) -> u64 {
    if value < min {
        warn!(var = name, value, min, "value below minimum, clamping");
        return min;
    }
    value
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Mask a secret for logs: keep `keep` chars at each end.
pub fn mask(secret: Option<&str>, keep: usize) -> String {
    let Some(s) = secret else {
        return "None".to_string();
    };
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= keep * 2 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}…{tail}")
}

/// Convenience for tests and tools: lookup backed by a map.
pub fn lookup_from_map(map: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |k| map.get(k).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(pairs: &[(&str, &str)]) -> Config {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(lookup_from_map(map))
    }

    #[test]
    fn defaults_when_nothing_set() {
        let c = cfg(&[]);
        assert_eq!(c.poll_secs, 60);
        assert_eq!(c.port, 10_000);
        assert_eq!(c.filter, FilterConfig::default());
        assert!(c.alpha_vantage_key.is_none());
        assert!(!c.telegram_configured());
        assert!(c.topics.as_deref().unwrap().contains("earnings"));
    }

    #[test]
    fn credential_aliases_first_non_empty_wins() {
        let c = cfg(&[
            ("ALPHA_VANTAGE_KEY", "  "),
            ("ALPHAVANTAGE_API_KEY", "abc123"),
            ("TG_BOT_TOKEN", "tok"),
            ("telegram_chat_id", "42"),
        ]);
        assert_eq!(c.alpha_vantage_key.as_deref(), Some("abc123"));
        assert!(c.telegram_configured());
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let c = cfg(&[("POLL_SECONDS", "soon"), ("STRONG_SCORE", "0.5")]);
        assert_eq!(c.poll_secs, 60);
        assert!((c.filter.strong_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        assert_eq!(cfg(&[("POLL_SECONDS", "0")]).poll_secs, 1);
        assert_eq!(cfg(&[("POLL_SECONDS", "5")]).poll_secs, 5);
    }

    #[test]
    fn keywords_are_trimmed_and_lowercased() {
        let c = cfg(&[("KEYWORD_BOOST", " Merger, ,SEC ,beats")]);
        assert_eq!(c.filter.keyword_boost, vec!["merger", "sec", "beats"]);
    }

    #[test]
    fn empty_topics_disable_topic_filter() {
        let c = cfg(&[("TOPICS", "")]);
        assert!(c.topics.is_none());
    }

    #[test]
    fn mask_keeps_edges() {
        assert_eq!(mask(None, 4), "None");
        assert_eq!(mask(Some("short"), 4), "*****");
        assert_eq!(mask(Some("ABCDEFGHIJKL"), 4), "ABCD…IJKL");
    }
}
