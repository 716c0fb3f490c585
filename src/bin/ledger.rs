use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wallet_platform::api::{self, ledger::LedgerApiState};
use wallet_platform::config::Settings;
use wallet_platform::events::{EventProducer, OperationEventPublisher, ProducerConfig};
use wallet_platform::observability::{
    init_logging, init_metrics, HealthChecker, LogConfig, LogFormat,
};
use wallet_platform::services::LedgerService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.ledger.log_level.clone(),
        format: LogFormat::from(
            std::env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str(),
        ),
        include_target: true,
    });

    let metrics_handle = init_metrics();
    info!("Configuration loaded, metrics initialized");

    info!("Connecting to ledger database...");
    let pool = PgPoolOptions::new()
        .min_connections(settings.ledger_database.pool_min)
        .max_connections(settings.ledger_database.pool_max)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.ledger_database.url)
        .await?;

    info!("Running ledger migrations...");
    sqlx::migrate!("./migrations/ledger").run(&pool).await?;

    // The broker is optional at startup: transfers still commit without it,
    // events are simply dropped (at-most-once contract).
    info!("Connecting event producer...");
    let producer = match tokio::time::timeout(
        Duration::from_secs(3),
        EventProducer::connect(ProducerConfig {
            brokers: settings.broker.broker_list(),
            ..Default::default()
        }),
    )
    .await
    {
        Ok(Ok(producer)) => Some(Arc::new(producer)),
        Ok(Err(e)) => {
            warn!("Broker connection failed: {e}. Continuing without event publishing.");
            None
        }
        Err(_) => {
            warn!("Broker connection timed out. Continuing without event publishing.");
            None
        }
    };

    let broker_client = producer.as_ref().map(|p| p.client());
    let publisher = producer
        .map(|producer| Arc::new(OperationEventPublisher::new(producer, &settings.broker)));

    let service = Arc::new(LedgerService::new(pool.clone(), publisher));
    let health_checker = Arc::new(HealthChecker::new(pool, broker_client));

    let x_request_id = http::HeaderName::from_static("x-request-id");
    let app = api::ledger::router(LedgerApiState { service })
        .merge(api::operational_router(health_checker, metrics_handle))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr = format!("0.0.0.0:{}", settings.ledger.port);
    info!("Starting ledger server on {addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
