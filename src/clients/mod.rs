//! HTTP clients for the internal service APIs.
//!
//! The gateway talks to the ledger and analytics services through the
//! `LedgerApi`/`AnalyticsApi` traits; the reqwest implementations here carry
//! the request deadline and translate upstream error bodies back into
//! `AppError` kinds. Transport failures (connect errors, expired deadlines)
//! surface as `Internal` — the gateway never retries.

pub mod analytics_client;
pub mod ledger_client;

pub use analytics_client::{AnalyticsApi, HttpAnalyticsClient};
pub use ledger_client::{HttpLedgerClient, LedgerApi};

use anyhow::anyhow;
use serde::de::DeserializeOwned;

use crate::error::{AppError, ErrorBody, Result};

/// Decodes an upstream response: 2xx bodies parse into `T`, anything else
/// parses as an error body and maps back to the matching error kind.
pub(crate) async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow!("unreadable upstream response: {e}")));
    }

    let body = response
        .json::<ErrorBody>()
        .await
        .unwrap_or_else(|_| ErrorBody::new("INTERNAL", format!("upstream returned {status}")));
    Err(remote_error(body))
}

fn remote_error(body: ErrorBody) -> AppError {
    match body.code.as_str() {
        "INVALID_ARGUMENT" => AppError::InvalidArgument(body.description),
        "NOT_FOUND" => AppError::NotFound(body.description),
        "FAILED_PRECONDITION" => AppError::InsufficientFunds,
        "ALREADY_EXISTS" => AppError::DuplicateKey,
        _ => AppError::Internal(anyhow!("upstream error: {}", body.description)),
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> AppError {
    AppError::Internal(anyhow!("upstream request failed: {err}"))
}
