use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use rust_decimal_macros::dec;
use tower::ServiceExt;
use uuid::Uuid;

use wallet_platform::api::gateway::{self, GatewayState};
use wallet_platform::clients::{AnalyticsApi, LedgerApi};
use wallet_platform::contracts::v1::{
    AccountDto, ListAccountOperationsResponse, MoneyDto, OperationDto, OperationOutcome,
    OperationStatus, OperationType, TopUpRequest, TransferMoneyRequest,
};
use wallet_platform::error::{AppError, Result};

const ACCOUNT_ID: &str = "11111111-1111-1111-1111-111111111111";
const RECIPIENT_ID: &str = "22222222-2222-2222-2222-222222222222";

/// In-process ledger stub: scripted responses, no network.
struct StubLedger {
    outcome: fn() -> Result<OperationOutcome>,
}

#[async_trait]
impl LedgerApi for StubLedger {
    async fn transfer_money(&self, _request: TransferMoneyRequest) -> Result<OperationOutcome> {
        (self.outcome)()
    }

    async fn top_up(&self, _request: TopUpRequest) -> Result<OperationOutcome> {
        (self.outcome)()
    }

    async fn get_account(&self, account_id: Uuid) -> Result<AccountDto> {
        Ok(AccountDto {
            id: account_id,
            balance: dec!(899.50),
            currency: "RUB".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }
}

struct StubAnalytics {
    response: fn() -> Result<ListAccountOperationsResponse>,
}

#[async_trait]
impl AnalyticsApi for StubAnalytics {
    async fn list_account_operations(
        &self,
        _account_id: Uuid,
        _limit: i64,
        _after: Option<Uuid>,
    ) -> Result<ListAccountOperationsResponse> {
        (self.response)()
    }
}

fn success_outcome() -> Result<OperationOutcome> {
    Ok(OperationOutcome {
        operation_id: "33333333-3333-3333-3333-333333333333".parse().unwrap(),
        status: OperationStatus::Success,
        message: Some("Transfer completed successfully".to_string()),
        completed_at: Some("2025-06-01T12:00:00Z".to_string()),
    })
}

fn router_with(
    outcome: fn() -> Result<OperationOutcome>,
    response: fn() -> Result<ListAccountOperationsResponse>,
) -> axum::Router {
    gateway::router(GatewayState {
        ledger: Arc::new(StubLedger { outcome }),
        analytics: Arc::new(StubAnalytics { response }),
    })
}

fn empty_operations() -> Result<ListAccountOperationsResponse> {
    Ok(ListAccountOperationsResponse {
        operations: vec![],
        after: None,
    })
}

fn transfer_request(account_id: &str, body: &str, with_key: bool) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(format!("/accounts/{account_id}/transfers"))
        .header("content-type", "application/json");
    let builder = if with_key {
        builder.header("X-Idempotency-Key", "550e8400-e29b-41d4-a716-446655440000")
    } else {
        builder
    };
    builder.body(Body::from(body.to_string())).unwrap()
}

fn transfer_body(recipient: &str, value: &str, currency: &str) -> String {
    format!(
        r#"{{"recipient_id":"{recipient}","amount":{{"value":"{value}","currency_code":"{currency}"}}}}"#
    )
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_transfer_returns_operation_id() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "100.50", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({"operation_id": "33333333-3333-3333-3333-333333333333"})
    );
}

#[tokio::test]
async fn test_transfer_without_idempotency_key_is_rejected() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "100.50", "RUB"),
            false,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
    assert!(json["id"].as_str().unwrap().parse::<Uuid>().is_ok());
}

#[tokio::test]
async fn test_non_uuid_path_value_is_rejected() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            "not-a-uuid",
            &transfer_body(RECIPIENT_ID, "100.50", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_non_uuid_recipient_is_rejected() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body("99999", "100.50", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_zero_amount_is_rejected_before_rpc() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "0.00", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_malformed_amount_is_rejected() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "ten rubles", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_insufficient_funds_maps_to_failed_precondition() {
    let app = router_with(|| Err(AppError::InsufficientFunds), empty_operations);

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "10.00", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["code"], "FAILED_PRECONDITION");
    assert_eq!(json["description"], "Insufficient funds");
}

#[tokio::test]
async fn test_unknown_account_maps_to_not_found() {
    let app = router_with(
        || Err(AppError::not_found("Account not found")),
        empty_operations,
    );

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "10.00", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = response_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upstream_failure_maps_to_opaque_internal() {
    let app = router_with(
        || Err(AppError::Internal(anyhow::anyhow!("connection refused"))),
        empty_operations,
    );

    let response = app
        .oneshot(transfer_request(
            ACCOUNT_ID,
            &transfer_body(RECIPIENT_ID, "10.00", "RUB"),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = response_json(response).await;
    assert_eq!(json["code"], "INTERNAL");
    assert_eq!(json["description"], "An internal error occurred");
}

#[tokio::test]
async fn test_operations_page_shape() {
    fn one_page() -> Result<ListAccountOperationsResponse> {
        let id: Uuid = "44444444-4444-4444-4444-444444444444".parse().unwrap();
        Ok(ListAccountOperationsResponse {
            operations: vec![OperationDto {
                id,
                operation_type: OperationType::Transfer,
                timestamp: "2025-06-01T12:00:00.123Z".parse().unwrap(),
                amount: MoneyDto {
                    value: dec!(100.50),
                    currency_code: "RUB".to_string(),
                },
                sender_id: Some("11111111-1111-1111-1111-111111111111".parse().unwrap()),
                recipient_id: Some("22222222-2222-2222-2222-222222222222".parse().unwrap()),
            }],
            after: Some(id),
        })
    }

    let app = router_with(success_outcome, one_page);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/accounts/{ACCOUNT_ID}/operations?limit=2"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["afterId"], "44444444-4444-4444-4444-444444444444");
    let item = &json["content"][0];
    assert_eq!(item["type"], "TRANSFER");
    assert_eq!(item["amount"]["value"], "100.50");
    assert_eq!(item["amount"]["currency_code"], "RUB");
    assert_eq!(item["senderId"], "11111111-1111-1111-1111-111111111111");
    assert_eq!(item["recipientId"], "22222222-2222-2222-2222-222222222222");
}

#[tokio::test]
async fn test_operations_query_validation() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/accounts/{ACCOUNT_ID}/operations?limit=abc"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/accounts/{ACCOUNT_ID}/operations?afterId=zzz"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_account_passes_through() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/accounts/{ACCOUNT_ID}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["id"], ACCOUNT_ID);
    assert_eq!(json["balance"], "899.50");
    assert_eq!(json["currency"], "RUB");
}

#[tokio::test]
async fn test_topup_returns_operation_id() {
    let app = router_with(success_outcome, empty_operations);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/accounts/{ACCOUNT_ID}/topup"))
                .header("content-type", "application/json")
                .header("X-Idempotency-Key", "550e8400-e29b-41d4-a716-446655440001")
                .body(Body::from(
                    r#"{"amount":{"value":"25.00","currency_code":"RUB"}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(
        json["operation_id"],
        "33333333-3333-3333-3333-333333333333"
    );
}
