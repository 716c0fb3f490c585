use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use wallet_platform::api::{self, analytics::AnalyticsApiState};
use wallet_platform::config::Settings;
use wallet_platform::events::{ConsumerConfig, EventConsumer};
use wallet_platform::observability::{
    init_logging, init_metrics, HealthChecker, LogConfig, LogFormat,
};
use wallet_platform::services::{AnalyticsService, OperationIngestor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.analytics.log_level.clone(),
        format: LogFormat::from(
            std::env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .as_str(),
        ),
        include_target: true,
    });

    let metrics_handle = init_metrics();
    info!("Configuration loaded, metrics initialized");

    info!("Connecting to analytics database...");
    let pool = PgPoolOptions::new()
        .min_connections(settings.analytics_database.pool_min)
        .max_connections(settings.analytics_database.pool_max)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.analytics_database.url)
        .await?;

    info!("Running analytics migrations...");
    sqlx::migrate!("./migrations/analytics").run(&pool).await?;

    info!("Connecting event consumer...");
    let consumer = Arc::new(
        EventConsumer::connect(ConsumerConfig {
            brokers: settings.broker.broker_list(),
            topics: vec![
                settings.broker.transfer_completed_topic(),
                settings.broker.topup_completed_topic(),
            ],
            dead_letter_topic: Some(settings.broker.dead_letter_topic.clone()),
            ..Default::default()
        })
        .await?,
    );

    let ingestor = Arc::new(OperationIngestor::new(pool.clone()));
    {
        let consumer = consumer.clone();
        tokio::spawn(async move {
            if let Err(e) = consumer.start(ingestor).await {
                error!("Consumer stopped with error: {e}");
            }
        });
    }

    let service = Arc::new(AnalyticsService::new(pool.clone()));
    let health_checker = Arc::new(HealthChecker::new(pool, Some(consumer.client())));

    let x_request_id = http::HeaderName::from_static("x-request-id");
    let app = api::analytics::router(AnalyticsApiState { service })
        .merge(api::operational_router(health_checker, metrics_handle))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr = format!("0.0.0.0:{}", settings.analytics.port);
    info!("Starting analytics server on {addr}");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
