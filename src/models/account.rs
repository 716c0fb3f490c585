use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A holder of a single-currency balance, the unit of ownership and locking.
///
/// The balance is never negative between transactions and the currency is
/// immutable after creation; both are also enforced by the schema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new account with the given opening balance.
    pub fn new(id: Uuid, balance: Decimal, currency: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            balance,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks whether the balance covers a debit of `amount`.
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}
