// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod poll;
pub mod price;
pub mod signal;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::{Config, FilterConfig};
pub use crate::dedup::EmittedSet;
pub use crate::notify::Notifier;
pub use crate::signal::{Action, Signal, SignalKey};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` drives the filter (default `info`); `LOG_FORMAT=json` switches
/// to JSON lines for log shippers.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}
