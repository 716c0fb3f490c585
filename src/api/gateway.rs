use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::requests::{parse_uuid, CreateTransferBody, OperationsQuery, TopUpBody};
use crate::api::responses::{AccountBody, OperationAccepted, OperationsPage};
use crate::clients::{AnalyticsApi, LedgerApi};
use crate::contracts::v1::{MoneyDto, TopUpRequest, TransferMoneyRequest};
use crate::error::{AppError, Result};
use crate::models::Money;

/// Header carrying the client-chosen idempotency key, forwarded verbatim to
/// the ledger. The gateway keeps no idempotency state of its own.
pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";

/// The gateway is a stateless REST-to-RPC adapter: it validates the HTTP
/// request, derives the internal call, invokes the right client, and maps
/// the result back. It never retries; retries belong to the caller,
/// disambiguated by the idempotency key.
#[derive(Clone)]
pub struct GatewayState {
    pub ledger: Arc<dyn LedgerApi>,
    pub analytics: Arc<dyn AnalyticsApi>,
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/accounts/:account_id/transfers", post(create_transfer))
        .route("/accounts/:account_id/topup", post(top_up))
        .route("/accounts/:account_id/operations", get(list_operations))
        .route("/accounts/:account_id", get(get_account))
        .with_state(state)
}

fn idempotency_key(headers: &HeaderMap) -> Result<String> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if key.is_empty() {
        return Err(AppError::invalid_argument(
            "X-Idempotency-Key header is required",
        ));
    }
    Ok(key.to_string())
}

async fn create_transfer(
    State(state): State<GatewayState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CreateTransferBody>,
) -> Result<Json<OperationAccepted>> {
    let sender_id = parse_uuid(&account_id, "accountId")?;
    let recipient_id = parse_uuid(&body.recipient_id, "recipient_id")?;
    let idempotency_key = idempotency_key(&headers)?;
    let amount = Money::parse(&body.amount.value, body.amount.currency_code)?;

    let outcome = state
        .ledger
        .transfer_money(TransferMoneyRequest {
            sender_id,
            recipient_id,
            amount: MoneyDto {
                value: amount.value,
                currency_code: amount.currency,
            },
            idempotency_key,
        })
        .await?;

    Ok(Json(OperationAccepted {
        operation_id: outcome.operation_id,
    }))
}

async fn top_up(
    State(state): State<GatewayState>,
    Path(account_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<TopUpBody>,
) -> Result<Json<OperationAccepted>> {
    let account_id = parse_uuid(&account_id, "accountId")?;
    let idempotency_key = idempotency_key(&headers)?;
    let amount = Money::parse(&body.amount.value, body.amount.currency_code)?;

    let outcome = state
        .ledger
        .top_up(TopUpRequest {
            account_id,
            amount: MoneyDto {
                value: amount.value,
                currency_code: amount.currency,
            },
            idempotency_key,
        })
        .await?;

    Ok(Json(OperationAccepted {
        operation_id: outcome.operation_id,
    }))
}

async fn list_operations(
    State(state): State<GatewayState>,
    Path(account_id): Path<String>,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<OperationsPage>> {
    let account_id = parse_uuid(&account_id, "accountId")?;
    let limit = query.parsed_limit()?;
    let after = query.parsed_after()?;

    let response = state
        .analytics
        .list_account_operations(account_id, limit, after)
        .await?;

    Ok(Json(OperationsPage {
        content: response.operations.into_iter().map(Into::into).collect(),
        after_id: response.after,
    }))
}

async fn get_account(
    State(state): State<GatewayState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountBody>> {
    let account_id = parse_uuid(&account_id, "accountId")?;
    let account = state.ledger.get_account(account_id).await?;
    Ok(Json(account.into()))
}
