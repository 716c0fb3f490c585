use crate::error::{AppError, Result};
use crate::models::Operation;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const OPERATION_COLUMNS: &str =
    "id, account_id, kind, occurred_at, amount, currency, sender_id, recipient_id";

/// Repository for the append-only operation history.
///
/// Rows are only ever inserted; redelivered events create duplicates that
/// the query path collapses by `(id, account_id)`. Per-account scans are
/// sequential thanks to the `(account_id, occurred_at DESC, id DESC)` index.
pub struct OperationRepository {
    pool: PgPool,
}

impl OperationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts every row under the enclosing transaction; a transfer's two
    /// legs land atomically or not at all.
    pub async fn insert_all(conn: &mut PgConnection, operations: &[Operation]) -> Result<()> {
        for operation in operations {
            sqlx::query(&format!(
                r#"
                INSERT INTO operations ({OPERATION_COLUMNS})
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            ))
            .bind(operation.id)
            .bind(operation.account_id)
            .bind(operation.kind)
            .bind(operation.occurred_at)
            .bind(operation.amount)
            .bind(&operation.currency)
            .bind(operation.sender_id)
            .bind(operation.recipient_id)
            .execute(&mut *conn)
            .await
            .map_err(AppError::Database)?;
        }
        Ok(())
    }

    /// Pages an account's history newest-first.
    ///
    /// The cursor names a previously returned operation id; the page
    /// restricts to rows strictly after that row in
    /// `(occurred_at DESC, id DESC)` order, so consecutive pages are
    /// disjoint even when timestamps collide. A cursor matching no row for
    /// the account yields an empty page. `limit = 0` means no cap.
    pub async fn list_for_account(
        &self,
        account_id: Uuid,
        limit: i64,
        after: Option<Uuid>,
    ) -> Result<Vec<Operation>> {
        let cursor = match after {
            None => None,
            Some(after_id) => {
                let row: Option<(chrono::DateTime<chrono::Utc>,)> = sqlx::query_as(
                    r#"
                    SELECT occurred_at
                    FROM operations
                    WHERE account_id = $1 AND id = $2
                    ORDER BY occurred_at DESC
                    LIMIT 1
                    "#,
                )
                .bind(account_id)
                .bind(after_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::Database)?;

                match row {
                    Some((occurred_at,)) => Some((occurred_at, after_id)),
                    None => return Ok(Vec::new()),
                }
            }
        };

        // Deduplicate redelivered rows by id before ordering and paging;
        // LIMIT NULLIF(_, 0) turns a zero limit into "no cap".
        let rows = match cursor {
            None => {
                sqlx::query_as::<_, Operation>(&format!(
                    r#"
                    SELECT {OPERATION_COLUMNS}
                    FROM (
                        SELECT DISTINCT ON (id) {OPERATION_COLUMNS}
                        FROM operations
                        WHERE account_id = $1
                        ORDER BY id, occurred_at DESC
                    ) AS history
                    ORDER BY occurred_at DESC, id DESC
                    LIMIT NULLIF($2::bigint, 0)
                    "#,
                ))
                .bind(account_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            Some((cursor_ts, cursor_id)) => {
                sqlx::query_as::<_, Operation>(&format!(
                    r#"
                    SELECT {OPERATION_COLUMNS}
                    FROM (
                        SELECT DISTINCT ON (id) {OPERATION_COLUMNS}
                        FROM operations
                        WHERE account_id = $1 AND (occurred_at, id) < ($3, $4)
                        ORDER BY id, occurred_at DESC
                    ) AS history
                    ORDER BY occurred_at DESC, id DESC
                    LIMIT NULLIF($2::bigint, 0)
                    "#,
                ))
                .bind(account_id)
                .bind(limit)
                .bind(cursor_ts)
                .bind(cursor_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
