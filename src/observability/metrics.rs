use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and returns the render handle served at
/// `/metrics`. Safe to call more than once; the first call wins.
pub fn init_metrics() -> PrometheusHandle {
    let handle = METRICS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");

        describe_metrics();
        handle
    });

    handle.clone()
}

fn describe_metrics() {
    describe_counter!(
        "wallet_transfers_succeeded_total",
        Unit::Count,
        "Transfers committed in Success state"
    );
    describe_counter!(
        "wallet_transfers_failed_total",
        Unit::Count,
        "Transfers committed in Failed state"
    );
    describe_counter!(
        "wallet_transfers_replayed_total",
        Unit::Count,
        "Requests answered from an existing idempotency key"
    );
    describe_counter!(
        "wallet_topups_succeeded_total",
        Unit::Count,
        "Top-ups committed in Success state"
    );
    describe_counter!(
        "wallet_events_published_total",
        Unit::Count,
        "Operation events delivered to the broker"
    );
    describe_counter!(
        "wallet_events_publish_failures_total",
        Unit::Count,
        "Post-commit publishes dropped after a broker failure"
    );
    describe_counter!(
        "wallet_operations_ingested_total",
        Unit::Count,
        "Operation rows written by the analytics ingester"
    );
    describe_counter!(
        "wallet_operations_rejected_total",
        Unit::Count,
        "Events routed to the dead-letter topic"
    );
}
