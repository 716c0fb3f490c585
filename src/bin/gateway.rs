use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use wallet_platform::api::{self, gateway::GatewayState};
use wallet_platform::clients::{HttpAnalyticsClient, HttpLedgerClient};
use wallet_platform::config::Settings;
use wallet_platform::observability::{init_logging, init_metrics, LogConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.gateway.log_level.clone(),
        format: LogFormat::from(
            std::env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str(),
        ),
        include_target: true,
    });

    let metrics_handle = init_metrics();
    info!("Configuration loaded, metrics initialized");

    let rpc_timeout = Duration::from_millis(settings.gateway.rpc_timeout_ms);
    let ledger = Arc::new(HttpLedgerClient::new(
        settings.gateway.ledger_url.clone(),
        rpc_timeout,
    )?);
    let analytics = Arc::new(HttpAnalyticsClient::new(
        settings.gateway.analytics_url.clone(),
        rpc_timeout,
    )?);

    let state = GatewayState { ledger, analytics };

    let x_request_id = http::HeaderName::from_static("x-request-id");
    let app = api::gateway::router(state)
        .merge(api::gateway_operational_router(metrics_handle))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr = format!("0.0.0.0:{}", settings.gateway.port);
    info!("Starting gateway on {addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
