use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::contracts::v1::{
    AccountDto, CreateAccountRequest, OperationOutcome, TopUpRequest, TransferMoneyRequest,
};
use crate::error::{AppError, Result};
use crate::models::Money;
use crate::services::{DepositCommand, LedgerService, TransferCommand};

/// RPC facade of the ledger service: validates requests, translates them
/// into domain commands, and maps domain errors onto transport codes.
#[derive(Clone)]
pub struct LedgerApiState {
    pub service: Arc<LedgerService>,
}

pub fn router(state: LedgerApiState) -> Router {
    Router::new()
        .route("/v1/transfers", post(transfer_money))
        .route("/v1/topups", post(top_up))
        .route("/v1/accounts", post(create_account))
        .route("/v1/accounts/:id", get(get_account))
        .route("/v1/transfers/:id", get(get_transfer))
        .with_state(state)
}

async fn transfer_money(
    State(state): State<LedgerApiState>,
    Json(request): Json<TransferMoneyRequest>,
) -> Result<Json<OperationOutcome>> {
    let amount = Money::new(request.amount.value, request.amount.currency_code)?;
    let transfer = state
        .service
        .execute_transfer(TransferCommand {
            sender_id: request.sender_id,
            recipient_id: request.recipient_id,
            amount,
            idempotency_key: request.idempotency_key,
        })
        .await?;

    Ok(Json(transfer.into()))
}

async fn top_up(
    State(state): State<LedgerApiState>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<OperationOutcome>> {
    let amount = Money::new(request.amount.value, request.amount.currency_code)?;
    let transfer = state
        .service
        .deposit(DepositCommand {
            account_id: request.account_id,
            amount,
            idempotency_key: request.idempotency_key,
        })
        .await?;

    Ok(Json(transfer.into()))
}

async fn create_account(
    State(state): State<LedgerApiState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<AccountDto>> {
    let account = state
        .service
        .create_account(request.opening_balance, request.currency)
        .await?;
    Ok(Json(account.into()))
}

async fn get_account(
    State(state): State<LedgerApiState>,
    Path(id): Path<String>,
) -> Result<Json<AccountDto>> {
    let id: Uuid = id
        .parse()
        .map_err(|_| AppError::invalid_argument("account id must be a UUID"))?;
    let account = state.service.get_account(id).await?;
    Ok(Json(account.into()))
}

async fn get_transfer(
    State(state): State<LedgerApiState>,
    Path(id): Path<String>,
) -> Result<Json<OperationOutcome>> {
    let id: Uuid = id
        .parse()
        .map_err(|_| AppError::invalid_argument("transfer id must be a UUID"))?;
    let transfer = state.service.get_transfer(id).await?;
    Ok(Json(transfer.into()))
}
