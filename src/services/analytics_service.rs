use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Operation;
use crate::repositories::OperationRepository;

/// A page of account history plus the cursor that continues it.
#[derive(Debug, Clone)]
pub struct OperationPage {
    pub operations: Vec<Operation>,
    /// Id of the last returned row; `None` when the page is empty. Passing
    /// it back yields strictly later rows.
    pub after: Option<Uuid>,
}

/// Read side of the analytics store: validates query arguments and shapes
/// the paginated history response.
pub struct AnalyticsService {
    operation_repo: OperationRepository,
}

impl AnalyticsService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            operation_repo: OperationRepository::new(pool),
        }
    }

    /// Lists an account's operations newest-first.
    ///
    /// `limit = 0` returns every matching row; a negative limit is an
    /// argument error. The returned cursor is the id of the last row.
    pub async fn list_account_operations(
        &self,
        account_id: Uuid,
        limit: i64,
        after: Option<Uuid>,
    ) -> Result<OperationPage> {
        if limit < 0 {
            return Err(AppError::invalid_argument("limit cannot be negative"));
        }

        let operations = self
            .operation_repo
            .list_for_account(account_id, limit, after)
            .await?;

        let after = operations.last().map(|op| op.id);
        Ok(OperationPage { operations, after })
    }
}
