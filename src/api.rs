//! Liveness surface for the hosting platform. Stateless; never touches the
//! poll loop.

use axum::{routing::get, Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;

pub const SERVICE_NAME: &str = "strong-news-signals";

#[derive(Serialize)]
struct RootResp {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct HealthResp {
    ok: bool,
}

pub fn router(metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health));
    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    app.layer(CorsLayer::very_permissive())
}

async fn root() -> Json<RootResp> {
    Json(RootResp {
        ok: true,
        service: SERVICE_NAME,
    })
}

async fn health() -> Json<HealthResp> {
    Json(HealthResp { ok: true })
}
