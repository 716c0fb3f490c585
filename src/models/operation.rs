use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of operation a history row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Topup,
    Transfer,
}

/// One side of a completed transfer or top-up in the analytics store.
///
/// A transfer produces exactly two rows sharing `id`, one per affected
/// account; a top-up produces one. Rows are append-only: the ingester never
/// updates or deletes, and redelivered events simply add duplicates that
/// queries collapse by `(id, account_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Operation {
    /// Operation id, copied from the originating transfer.
    pub id: Uuid,
    /// Account this row belongs to.
    pub account_id: Uuid,
    pub kind: OperationKind,
    pub occurred_at: DateTime<Utc>,
    pub amount: Decimal,
    pub currency: String,
    /// Counterparty columns; populated for transfers, NULL for top-ups.
    pub sender_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
}

impl Operation {
    /// Builds the two rows a transfer event fans out to, one per party.
    pub fn transfer_rows(
        operation_id: Uuid,
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
        currency: &str,
        occurred_at: DateTime<Utc>,
    ) -> [Operation; 2] {
        let row = |account_id: Uuid| Operation {
            id: operation_id,
            account_id,
            kind: OperationKind::Transfer,
            occurred_at,
            amount,
            currency: currency.to_string(),
            sender_id: Some(sender_id),
            recipient_id: Some(recipient_id),
        };
        [row(sender_id), row(recipient_id)]
    }

    /// Builds the single row a top-up event produces.
    pub fn topup_row(
        operation_id: Uuid,
        account_id: Uuid,
        amount: Decimal,
        currency: &str,
        occurred_at: DateTime<Utc>,
    ) -> Operation {
        Operation {
            id: operation_id,
            account_id,
            kind: OperationKind::Topup,
            occurred_at,
            amount,
            currency: currency.to_string(),
            sender_id: None,
            recipient_id: None,
        }
    }
}
