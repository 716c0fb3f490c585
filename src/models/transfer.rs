use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of ledger operation a transfer row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferKind {
    /// Debit-credit pair between two wallet accounts.
    Transfer,
    /// Card-funded credit with no debit leg.
    Topup,
}

/// Lifecycle status of a transfer. Transitions are monotonic: Pending may
/// become Success or Failed; terminal rows never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transfer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Pending,
    Success,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Success | TransferStatus::Failed)
    }

    pub fn can_transition(from: TransferStatus, to: TransferStatus) -> bool {
        matches!(
            (from, to),
            (TransferStatus::Pending, TransferStatus::Success)
                | (TransferStatus::Pending, TransferStatus::Failed)
        )
    }
}

/// Outcome messages persisted with terminal transfers.
pub mod messages {
    pub const COMPLETED: &str = "Transfer completed successfully";
    pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds";
    pub const TOPUP_COMPLETED: &str = "Top-up completed successfully";
}

/// A debit-credit pair between two accounts (or a single credit for a
/// top-up), atomic and idempotent. `sender_id` is NULL exactly for top-ups.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub kind: TransferKind,
    pub sender_id: Option<Uuid>,
    pub recipient_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: TransferStatus,
    /// Client-chosen key that deduplicates retries; unique across all rows.
    pub idempotency_key: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Creates a pending transfer between two accounts.
    pub fn transfer(
        sender_id: Uuid,
        recipient_id: Uuid,
        amount: Decimal,
        currency: String,
        idempotency_key: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TransferKind::Transfer,
            sender_id: Some(sender_id),
            recipient_id,
            amount,
            currency,
            status: TransferStatus::Pending,
            idempotency_key,
            message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Creates a pending top-up credit for a single account.
    pub fn topup(
        recipient_id: Uuid,
        amount: Decimal,
        currency: String,
        idempotency_key: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: TransferKind::Topup,
            sender_id: None,
            recipient_id,
            amount,
            currency,
            status: TransferStatus::Pending,
            idempotency_key,
            message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Marks the transfer Success with its completion timestamp.
    pub fn succeed(mut self, message: &str) -> Self {
        self.status = TransferStatus::Success;
        self.message = Some(message.to_string());
        self.completed_at = Some(Utc::now());
        self
    }

    /// Marks the transfer Failed. `completed_at` is set: failure is a
    /// terminal outcome, not an open state.
    pub fn fail(mut self, message: &str) -> Self {
        self.status = TransferStatus::Failed;
        self.message = Some(message.to_string());
        self.completed_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_transitions_are_monotonic() {
        use TransferStatus::*;
        assert!(TransferStatus::can_transition(Pending, Success));
        assert!(TransferStatus::can_transition(Pending, Failed));
        assert!(!TransferStatus::can_transition(Success, Failed));
        assert!(!TransferStatus::can_transition(Success, Pending));
        assert!(!TransferStatus::can_transition(Failed, Success));
        assert!(!TransferStatus::can_transition(Failed, Pending));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(TransferStatus::Success.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
    }

    #[test]
    fn test_transfer_creation() {
        let sender = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let transfer = Transfer::transfer(
            sender,
            recipient,
            dec!(100.50),
            "RUB".to_string(),
            "key-1".to_string(),
        );

        assert_eq!(transfer.kind, TransferKind::Transfer);
        assert_eq!(transfer.sender_id, Some(sender));
        assert_eq!(transfer.recipient_id, recipient);
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert!(transfer.completed_at.is_none());
        assert!(transfer.message.is_none());
    }

    #[test]
    fn test_topup_has_no_sender() {
        let transfer = Transfer::topup(
            Uuid::new_v4(),
            dec!(50.00),
            "RUB".to_string(),
            "key-2".to_string(),
        );
        assert_eq!(transfer.kind, TransferKind::Topup);
        assert!(transfer.sender_id.is_none());
    }

    #[test]
    fn test_succeed_sets_terminal_state() {
        let transfer = Transfer::transfer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(10.00),
            "RUB".to_string(),
            "key-3".to_string(),
        )
        .succeed(messages::COMPLETED);

        assert_eq!(transfer.status, TransferStatus::Success);
        assert_eq!(transfer.message.as_deref(), Some(messages::COMPLETED));
        assert!(transfer.completed_at.is_some());
    }

    #[test]
    fn test_fail_sets_terminal_state() {
        let transfer = Transfer::transfer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(10.00),
            "RUB".to_string(),
            "key-4".to_string(),
        )
        .fail(messages::INSUFFICIENT_FUNDS);

        assert_eq!(transfer.status, TransferStatus::Failed);
        assert_eq!(
            transfer.message.as_deref(),
            Some(messages::INSUFFICIENT_FUNDS)
        );
        assert!(transfer.completed_at.is_some());
    }
}
