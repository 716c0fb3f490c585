use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::contracts::v1::ListAccountOperationsResponse;
use crate::error::{AppError, Result};
use crate::services::AnalyticsService;

/// RPC facade of the analytics service: the paginated history query.
#[derive(Clone)]
pub struct AnalyticsApiState {
    pub service: Arc<AnalyticsService>,
}

pub fn router(state: AnalyticsApiState) -> Router {
    Router::new()
        .route("/v1/accounts/:id/operations", get(list_account_operations))
        .with_state(state)
}

#[derive(Debug, Deserialize, Default)]
struct OperationsQuery {
    limit: Option<i64>,
    after: Option<Uuid>,
}

async fn list_account_operations(
    State(state): State<AnalyticsApiState>,
    Path(id): Path<String>,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<ListAccountOperationsResponse>> {
    let account_id: Uuid = id
        .parse()
        .map_err(|_| AppError::invalid_argument("account id must be a UUID"))?;

    let page = state
        .service
        .list_account_operations(account_id, query.limit.unwrap_or(0), query.after)
        .await?;

    Ok(Json(ListAccountOperationsResponse {
        operations: page.operations.into_iter().map(Into::into).collect(),
        after: page.after,
    }))
}
