use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use uuid::Uuid;

use crate::clients::{decode, transport_error};
use crate::contracts::v1::ListAccountOperationsResponse;
use crate::error::{AppError, Result};

/// The analytics service surface as the gateway sees it.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    async fn list_account_operations(
        &self,
        account_id: Uuid,
        limit: i64,
        after: Option<Uuid>,
    ) -> Result<ListAccountOperationsResponse>;
}

/// HTTP client for the analytics service.
pub struct HttpAnalyticsClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalyticsClient {
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
impl AnalyticsApi for HttpAnalyticsClient {
    async fn list_account_operations(
        &self,
        account_id: Uuid,
        limit: i64,
        after: Option<Uuid>,
    ) -> Result<ListAccountOperationsResponse> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(format!(
                "{}/v1/accounts/{account_id}/operations",
                self.base_url
            ))
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        decode(response).await
    }
}
