use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Account, Operation, OperationKind, Transfer, TransferStatus};

/// Terminal status as carried over the wire. Pending and Failed both map to
/// `Unspecified`; the message field is the only discriminator between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Unspecified,
    Success,
}

impl From<TransferStatus> for OperationStatus {
    fn from(status: TransferStatus) -> Self {
        match status {
            TransferStatus::Success => OperationStatus::Success,
            TransferStatus::Pending | TransferStatus::Failed => OperationStatus::Unspecified,
        }
    }
}

/// Operation kind as carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Topup,
    Transfer,
}

impl From<OperationKind> for OperationType {
    fn from(kind: OperationKind) -> Self {
        match kind {
            OperationKind::Topup => OperationType::Topup,
            OperationKind::Transfer => OperationType::Transfer,
        }
    }
}

/// Monetary amount on the internal wire; the value crosses as a decimal
/// string so precision survives JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyDto {
    pub value: Decimal,
    pub currency_code: String,
}

// ---------------------------------------------------------------------------
// Ledger service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMoneyRequest {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: MoneyDto,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRequest {
    pub account_id: Uuid,
    pub amount: MoneyDto,
    pub idempotency_key: String,
}

/// Outcome of `TransferMoney` and `TopUp`: the server-assigned operation id,
/// the wire status, the outcome message, and the completion timestamp in
/// ISO-8601 UTC at second precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub operation_id: Uuid,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<Transfer> for OperationOutcome {
    fn from(transfer: Transfer) -> Self {
        Self {
            operation_id: transfer.id,
            status: transfer.status.into(),
            message: transfer.message,
            completed_at: transfer
                .completed_at
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub opening_balance: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDto {
    pub id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountDto {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            currency: account.currency,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Analytics service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDto {
    pub id: Uuid,
    pub operation_type: OperationType,
    pub timestamp: DateTime<Utc>,
    pub amount: MoneyDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
}

impl From<Operation> for OperationDto {
    fn from(operation: Operation) -> Self {
        Self {
            id: operation.id,
            operation_type: operation.kind.into(),
            timestamp: operation.occurred_at,
            amount: MoneyDto {
                value: operation.amount,
                currency_code: operation.currency,
            },
            sender_id: operation.sender_id,
            recipient_id: operation.recipient_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAccountOperationsResponse {
    pub operations: Vec<OperationDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transfer::messages;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_wire_mapping() {
        assert_eq!(
            OperationStatus::from(TransferStatus::Success),
            OperationStatus::Success
        );
        assert_eq!(
            OperationStatus::from(TransferStatus::Pending),
            OperationStatus::Unspecified
        );
        assert_eq!(
            OperationStatus::from(TransferStatus::Failed),
            OperationStatus::Unspecified
        );
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&OperationStatus::Success).unwrap(),
            r#""SUCCESS""#
        );
        assert_eq!(
            serde_json::to_string(&OperationStatus::Unspecified).unwrap(),
            r#""UNSPECIFIED""#
        );
    }

    #[test]
    fn test_outcome_timestamp_second_precision() {
        let transfer = Transfer::transfer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(10.00),
            "RUB".to_string(),
            "K1".to_string(),
        )
        .succeed(messages::COMPLETED);

        let outcome = OperationOutcome::from(transfer);
        let completed_at = outcome.completed_at.unwrap();
        // e.g. 2025-01-01T12:00:00Z: no fractional seconds
        assert!(completed_at.ends_with('Z'));
        assert!(!completed_at.contains('.'));
    }

    #[test]
    fn test_pending_outcome_has_no_completion() {
        let transfer = Transfer::transfer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            dec!(10.00),
            "RUB".to_string(),
            "K1".to_string(),
        );
        let outcome = OperationOutcome::from(transfer);
        assert_eq!(outcome.status, OperationStatus::Unspecified);
        assert!(outcome.completed_at.is_none());
    }
}
