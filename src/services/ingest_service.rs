use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::events::types::EVENT_STATUS_SUCCESS;
use crate::events::{ConsumedMessage, MessageHandler, OperationCompletedEvent};
use crate::models::Operation;
use crate::repositories::OperationRepository;

/// Consumes operation-completed events and writes the per-account history
/// rows.
///
/// A transfer fans out to two rows sharing the operation id, one per party,
/// inserted in a single transaction. Validation failures are poison (the
/// consumer dead-letters them without requeue); storage failures are
/// retryable and the message is redelivered, which is safe because the
/// store is append-only and queries deduplicate.
pub struct OperationIngestor {
    pool: PgPool,
}

impl OperationIngestor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parses and validates an event payload. Any failure here is a
    /// poison-message condition.
    pub fn parse_event(message: &ConsumedMessage) -> Result<OperationCompletedEvent> {
        let event: OperationCompletedEvent = message.deserialize()?;

        if event.status != EVENT_STATUS_SUCCESS {
            return Err(AppError::invalid_argument(format!(
                "unexpected event status '{}'",
                event.status
            )));
        }
        if event.is_transfer() && event.sender_id.is_none() {
            return Err(AppError::invalid_argument(
                "transfer event is missing senderId",
            ));
        }
        if !event.is_transfer() && !event.is_topup() {
            return Err(AppError::invalid_argument(format!(
                "unknown event type '{}'",
                event.event_type
            )));
        }
        if event.amount.value <= rust_decimal::Decimal::ZERO {
            return Err(AppError::invalid_argument("event amount must be positive"));
        }

        Ok(event)
    }

    /// Fans an event out to its operation rows.
    pub fn fan_out(event: &OperationCompletedEvent) -> Result<Vec<Operation>> {
        if event.is_transfer() {
            let sender_id = event
                .sender_id
                .ok_or_else(|| AppError::invalid_argument("transfer event is missing senderId"))?;
            Ok(Operation::transfer_rows(
                event.operation_id,
                sender_id,
                event.recipient_id,
                event.amount.value,
                &event.amount.currency_code,
                event.timestamp,
            )
            .to_vec())
        } else {
            Ok(vec![Operation::topup_row(
                event.operation_id,
                event.recipient_id,
                event.amount.value,
                &event.amount.currency_code,
                event.timestamp,
            )])
        }
    }

    async fn store(&self, operations: &[Operation]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        OperationRepository::insert_all(&mut tx, operations).await?;
        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for OperationIngestor {
    async fn handle(&self, message: &ConsumedMessage) -> Result<()> {
        let event = Self::parse_event(message)?;
        let operations = Self::fan_out(&event)?;

        self.store(&operations).await?;

        metrics::counter!("wallet_operations_ingested_total").increment(operations.len() as u64);
        info!(
            operation_id = %event.operation_id,
            rows = operations.len(),
            event_type = %event.event_type,
            "operation event ingested"
        );
        Ok(())
    }

    async fn on_dead_letter(&self, message: &ConsumedMessage, error: &AppError) {
        metrics::counter!("wallet_operations_rejected_total").increment(1);
        debug!(payload_len = message.value.len(), "rejected payload");
        tracing::error!(
            topic = %message.topic,
            offset = message.offset,
            error = %error,
            "operation event rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transfer::messages;
    use crate::models::{OperationKind, Transfer};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn message_from(event: &OperationCompletedEvent) -> ConsumedMessage {
        ConsumedMessage {
            topic: "bank.operations.transfer.completed".to_string(),
            offset: 0,
            key: Some(event.operation_id.to_string().into_bytes()),
            value: serde_json::to_vec(event).unwrap(),
            timestamp: Utc::now(),
        }
    }

    fn transfer_event() -> OperationCompletedEvent {
        let transfer = Transfer::transfer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(100.50),
            "RUB".to_string(),
            "K1".to_string(),
        )
        .succeed(messages::COMPLETED);
        OperationCompletedEvent::from_transfer(&transfer)
    }

    #[test]
    fn test_parse_accepts_success_transfer() {
        let event = transfer_event();
        let parsed = OperationIngestor::parse_event(&message_from(&event)).unwrap();
        assert_eq!(parsed.operation_id, event.operation_id);
    }

    #[test]
    fn test_parse_rejects_non_success_status() {
        let mut event = transfer_event();
        event.status = "UNSPECIFIED".to_string();
        let err = OperationIngestor::parse_event(&message_from(&event)).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let message = ConsumedMessage {
            topic: "bank.operations.transfer.completed".to_string(),
            offset: 0,
            key: None,
            value: b"{not json".to_vec(),
            timestamp: Utc::now(),
        };
        let err = OperationIngestor::parse_event(&message).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let event = transfer_event();
        let mut json = serde_json::to_value(&event).unwrap();
        json.as_object_mut().unwrap().remove("timestamp");

        let message = ConsumedMessage {
            topic: "bank.operations.transfer.completed".to_string(),
            offset: 0,
            key: None,
            value: serde_json::to_vec(&json).unwrap(),
            timestamp: Utc::now(),
        };
        let err = OperationIngestor::parse_event(&message).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_invalid_timestamp() {
        let event = transfer_event();
        let mut json = serde_json::to_value(&event).unwrap();
        json["timestamp"] = serde_json::json!("not-a-timestamp");

        let message = ConsumedMessage {
            topic: "bank.operations.transfer.completed".to_string(),
            offset: 0,
            key: None,
            value: serde_json::to_vec(&json).unwrap(),
            timestamp: Utc::now(),
        };
        let err = OperationIngestor::parse_event(&message).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_parse_rejects_unknown_event_type() {
        let mut event = transfer_event();
        event.event_type = "transfer.reversed".to_string();
        assert!(OperationIngestor::parse_event(&message_from(&event)).is_err());
    }

    #[test]
    fn test_fan_out_transfer_produces_two_rows() {
        let event = transfer_event();
        let rows = OperationIngestor::fan_out(&event).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, event.operation_id);
        assert_eq!(rows[1].id, event.operation_id);
        assert_eq!(rows[0].account_id, event.sender_id.unwrap());
        assert_eq!(rows[1].account_id, event.recipient_id);
        for row in &rows {
            assert_eq!(row.kind, OperationKind::Transfer);
            assert_eq!(row.sender_id, event.sender_id);
            assert_eq!(row.recipient_id, Some(event.recipient_id));
        }
    }

    #[test]
    fn test_fan_out_topup_produces_one_row() {
        let transfer = Transfer::topup(
            Uuid::new_v4(),
            dec!(25.00),
            "RUB".to_string(),
            "K2".to_string(),
        )
        .succeed(messages::TOPUP_COMPLETED);
        let event = OperationCompletedEvent::from_transfer(&transfer);

        let rows = OperationIngestor::fan_out(&event).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, OperationKind::Topup);
        assert_eq!(rows[0].account_id, event.recipient_id);
        assert!(rows[0].sender_id.is_none());
    }
}
