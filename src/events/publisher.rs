use std::sync::Arc;

use tracing::{info, warn};

use crate::config::BrokerSettings;
use crate::error::Result;
use crate::events::producer::EventProducer;
use crate::events::types::OperationCompletedEvent;
use crate::models::{Transfer, TransferKind, TransferStatus};

/// Publishes operation-completed events after the owning ledger transaction
/// has committed.
///
/// Delivery is at-most-once best-effort: a failure is logged and dropped,
/// never retried, never persisted, and never alters the result already
/// returned to the caller.
#[derive(Clone)]
pub struct OperationEventPublisher {
    producer: Arc<EventProducer>,
    transfer_topic: String,
    topup_topic: String,
}

impl OperationEventPublisher {
    pub fn new(producer: Arc<EventProducer>, broker: &BrokerSettings) -> Self {
        Self {
            producer,
            transfer_topic: broker.transfer_completed_topic(),
            topup_topic: broker.topup_completed_topic(),
        }
    }

    /// Builds and sends the event for a committed Success transfer, keyed by
    /// operation id.
    pub async fn publish_operation_completed(&self, transfer: &Transfer) -> Result<()> {
        debug_assert_eq!(transfer.status, TransferStatus::Success);

        let topic = match transfer.kind {
            TransferKind::Transfer => &self.transfer_topic,
            TransferKind::Topup => &self.topup_topic,
        };

        let event = OperationCompletedEvent::from_transfer(transfer);
        self.producer
            .send(topic, &event.operation_id.to_string(), &event)
            .await?;

        metrics::counter!("wallet_events_published_total").increment(1);
        info!(
            operation_id = %event.operation_id,
            event_type = %event.event_type,
            "operation event published"
        );
        Ok(())
    }

    /// Fire-and-forget publish used on the post-commit path: runs on its own
    /// task so the client reply never waits on the broker.
    pub fn spawn_publish(&self, transfer: Transfer) {
        let publisher = self.clone();
        tokio::spawn(async move {
            if let Err(err) = publisher.publish_operation_completed(&transfer).await {
                metrics::counter!("wallet_events_publish_failures_total").increment(1);
                warn!(
                    operation_id = %transfer.id,
                    error = %err,
                    "post-commit event publish failed; ledger state is unaffected"
                );
            }
        });
    }
}
