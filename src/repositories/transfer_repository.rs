use crate::error::{AppError, Result};
use crate::models::Transfer;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const TRANSFER_COLUMNS: &str = "id, kind, sender_id, recipient_id, amount, currency, status, idempotency_key, message, created_at, completed_at";

/// Repository for transfer rows. Inserts run inside the transfer
/// transaction; lookups run lock-free against the pool.
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a transfer under the enclosing transaction. A collision on
    /// the idempotency-key unique index surfaces as `AppError::DuplicateKey`
    /// so callers can re-read the winning row.
    pub async fn create(conn: &mut PgConnection, transfer: &Transfer) -> Result<Transfer> {
        let row = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            INSERT INTO transfers ({TRANSFER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TRANSFER_COLUMNS}
            "#,
        ))
        .bind(transfer.id)
        .bind(transfer.kind)
        .bind(transfer.sender_id)
        .bind(transfer.recipient_id)
        .bind(transfer.amount)
        .bind(&transfer.currency)
        .bind(transfer.status)
        .bind(&transfer.idempotency_key)
        .bind(&transfer.message)
        .bind(transfer.created_at)
        .bind(transfer.completed_at)
        .fetch_one(conn)
        .await
        .map_err(AppError::from_insert)?;

        Ok(row)
    }

    /// Looks up a transfer by its idempotency key. Absence is not an error:
    /// it simply means the key has never been executed.
    pub async fn find_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<Transfer>> {
        let row = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE idempotency_key = $1
            "#,
        ))
        .bind(idempotency_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Finds a transfer by id.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Transfer>> {
        let row = sqlx::query_as::<_, Transfer>(&format!(
            r#"
            SELECT {TRANSFER_COLUMNS}
            FROM transfers
            WHERE id = $1
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
