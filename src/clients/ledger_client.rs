use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::clients::{decode, transport_error};
use crate::contracts::v1::{AccountDto, OperationOutcome, TopUpRequest, TransferMoneyRequest};
use crate::error::{AppError, Result};

/// The ledger service surface as the gateway sees it.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    async fn transfer_money(&self, request: TransferMoneyRequest) -> Result<OperationOutcome>;
    async fn top_up(&self, request: TopUpRequest) -> Result<OperationOutcome>;
    async fn get_account(&self, account_id: Uuid) -> Result<AccountDto>;
}

/// HTTP client for the ledger service.
pub struct HttpLedgerClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLedgerClient {
    /// `timeout` is the per-request deadline propagated to the ledger.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LedgerApi for HttpLedgerClient {
    async fn transfer_money(&self, request: TransferMoneyRequest) -> Result<OperationOutcome> {
        let response = self
            .http
            .post(format!("{}/v1/transfers", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn top_up(&self, request: TopUpRequest) -> Result<OperationOutcome> {
        let response = self
            .http
            .post(format!("{}/v1/topups", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }

    async fn get_account(&self, account_id: Uuid) -> Result<AccountDto> {
        let response = self
            .http
            .get(format!("{}/v1/accounts/{account_id}", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}
