pub mod analytics;
pub mod gateway;
pub mod ledger;
pub mod requests;
pub mod responses;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::observability::{AggregatedHealth, HealthChecker};

/// Operational endpoints every service exposes next to its API:
/// `/health`, `/ready`, `/live`, and `/metrics`.
pub fn operational_router(
    health_checker: Arc<HealthChecker>,
    metrics_handle: PrometheusHandle,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
        .with_state(health_checker)
}

async fn health(State(checker): State<Arc<HealthChecker>>) -> Json<AggregatedHealth> {
    Json(checker.check().await)
}

async fn ready(State(checker): State<Arc<HealthChecker>>) -> StatusCode {
    if checker.is_ready().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn live() -> StatusCode {
    StatusCode::OK
}

/// Operational endpoints for the gateway, which holds no database: liveness
/// doubles as health, plus `/metrics`.
pub fn gateway_operational_router(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(live))
        .route("/live", get(live))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
}
