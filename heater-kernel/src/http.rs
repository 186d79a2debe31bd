//! HTTP surface: Prometheus scrape endpoint plus a JSON status view.

use crate::engine::Mode;
use crate::metrics::Metrics;
use crate::models::DataPoint;
use crate::store::SharedStore;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub metrics: Metrics,
}

#[derive(Debug, Serialize)]
pub struct StatusView {
    /// `None` while a sensor still holds the startup sentinel.
    pub sensors: BTreeMap<&'static str, Option<f64>>,
    pub settings: BTreeMap<&'static str, f64>,
    pub heater_on: bool,
    pub switch_water: bool,
    pub sensors_ready: bool,
    pub mode: Option<Mode>,
    pub failsafe_total: u64,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(get_metrics))
        .route("/status", get(get_status))
        .with_state(app_state)
}

/// Binds `addr` now so a busy port fails startup, then serves in the background.
pub async fn spawn_http_server(addr: SocketAddr, app_state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("metrics listening on http://{addr}/metrics");
    let app = build_router(app_state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("metrics server stopped: {e}");
        }
    });
    Ok(())
}

// GET /metrics
async fn get_metrics(State(app): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        app.metrics.to_prometheus_text(),
    )
}

// GET /status
async fn get_status(State(app): State<AppState>) -> Json<StatusView> {
    let (sensors, settings) = {
        let store = app.store.lock();
        let sensors: BTreeMap<_, _> = store
            .sensors()
            .iter()
            .map(|(id, dp)| (id.name(), known_value(dp)))
            .collect();
        let settings: BTreeMap<_, _> = store.settings().iter().map(|(id, dp)| (id.name(), dp.value)).collect();
        (sensors, settings)
    };
    let m = app.metrics.snapshot();

    Json(StatusView {
        sensors,
        settings,
        heater_on: m.burner_on,
        switch_water: m.switch_water,
        sensors_ready: m.sensors_ready,
        mode: m.last_mode,
        failsafe_total: m.failsafe_total,
    })
}

fn known_value(dp: &DataPoint) -> Option<f64> {
    dp.is_known().then_some(dp.value)
}
