use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Transfer, TransferKind};

/// Event type discriminators carried in the envelope.
pub mod event_types {
    pub const TRANSFER_COMPLETED: &str = "transfer.completed";
    pub const TOPUP_COMPLETED: &str = "topup.completed";
}

/// Wire status carried by operation events. Only committed Success
/// transfers are ever published.
pub const EVENT_STATUS_SUCCESS: &str = "SUCCESS";

/// Monetary amount as it appears on the wire: a decimal string with two
/// fractional digits plus the currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyPayload {
    pub value: Decimal,
    pub currency_code: String,
}

/// Flat event envelope published after a ledger transaction commits with
/// its transfer in the Success state.
///
/// Field names and shapes are part of the published contract; consumers in
/// other services parse this byte-for-byte layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCompletedEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    pub operation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub amount: MoneyPayload,
    pub idempotency_key: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationCompletedEvent {
    /// Builds the event for a committed Success transfer or top-up.
    pub fn from_transfer(transfer: &Transfer) -> Self {
        let event_type = match transfer.kind {
            TransferKind::Transfer => event_types::TRANSFER_COMPLETED,
            TransferKind::Topup => event_types::TOPUP_COMPLETED,
        };
        let completed_at = transfer.completed_at.unwrap_or(transfer.created_at);

        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            event_timestamp: truncate_to_millis(Utc::now()),
            operation_id: transfer.id,
            sender_id: transfer.sender_id,
            recipient_id: transfer.recipient_id,
            amount: MoneyPayload {
                value: transfer.amount,
                currency_code: transfer.currency.clone(),
            },
            idempotency_key: transfer.idempotency_key.clone(),
            status: EVENT_STATUS_SUCCESS.to_string(),
            timestamp: truncate_to_millis(completed_at),
            message: transfer.message.clone(),
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.event_type == event_types::TRANSFER_COMPLETED
    }

    pub fn is_topup(&self) -> bool {
        self.event_type == event_types::TOPUP_COMPLETED
    }
}

/// Event timestamps carry millisecond precision on the wire.
pub fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
