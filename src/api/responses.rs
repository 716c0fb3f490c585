use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contracts::v1::{AccountDto, OperationDto, OperationType};

/// 200 body of the transfer and top-up endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationAccepted {
    pub operation_id: Uuid,
}

/// 200 body of `GET /accounts/{accountId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBody {
    pub id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountDto> for AccountBody {
    fn from(account: AccountDto) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            currency: account.currency,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Amount as REST clients receive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountView {
    pub value: Decimal,
    pub currency_code: String,
}

/// One row of `GET /accounts/{accountId}/operations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub timestamp: DateTime<Utc>,
    pub amount: AmountView,
    #[serde(rename = "senderId", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<Uuid>,
    #[serde(rename = "recipientId", skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
}

impl From<OperationDto> for OperationItem {
    fn from(operation: OperationDto) -> Self {
        Self {
            id: operation.id,
            operation_type: operation.operation_type,
            timestamp: operation.timestamp,
            amount: AmountView {
                value: operation.amount.value,
                currency_code: operation.amount.currency_code,
            },
            sender_id: operation.sender_id,
            recipient_id: operation.recipient_id,
        }
    }
}

/// 200 body of `GET /accounts/{accountId}/operations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsPage {
    pub content: Vec<OperationItem>,
    #[serde(rename = "afterId", skip_serializing_if = "Option::is_none")]
    pub after_id: Option<Uuid>,
}
