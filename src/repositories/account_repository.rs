use crate::error::{AppError, Result};
use crate::models::Account;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Repository for account rows.
///
/// Query-path reads go through the pool and take no locks. Mutation-path
/// methods take an open transaction connection: `lock` acquires the
/// row-level exclusive lock that serializes concurrent transfers touching
/// the same account, released on commit or rollback.
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new account.
    pub async fn create(&self, account: &Account) -> Result<Account> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, balance, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, balance, currency, created_at, updated_at
            "#,
        )
        .bind(account.id)
        .bind(account.balance)
        .bind(&account.currency)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Point read without locking; the balance-lookup path.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, currency, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Reads an account declaring intent to update, acquiring its row lock
    /// for the enclosing transaction.
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, balance, currency, created_at, updated_at
            FROM accounts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Persists a new balance under the enclosing transaction. Returns false
    /// when no row was affected.
    pub async fn update_balance(
        conn: &mut PgConnection,
        id: Uuid,
        balance: rust_decimal::Decimal,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(balance)
        .execute(conn)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected() > 0)
    }
}
