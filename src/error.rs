use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error taxonomy for the wallet platform.
///
/// Every failure a service surfaces belongs to one of these kinds; transport
/// layers map them to HTTP statuses and stable error codes, so new failure
/// modes must be folded into an existing kind or added here deliberately.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or ill-formed input, rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Sender balance cannot cover the transfer amount. The failed transfer
    /// row is persisted before this is surfaced, and replays of its
    /// idempotency key surface it again, so the rendered message must stay
    /// identical to the persisted row message.
    #[error("Insufficient funds")]
    InsufficientFunds,

    /// Account currency differs from the transfer currency.
    #[error("currency mismatch: account holds {held}, transfer is {requested}")]
    CurrencyMismatch { held: String, requested: String },

    /// Unique-index collision on an idempotency key. Recovered inside the
    /// ledger service by re-reading the winner's row; never escapes it.
    #[error("duplicate idempotency key")]
    DuplicateKey,

    /// Post-commit event delivery failed. Logged, never surfaced to callers.
    #[error("event publish failed: {0}")]
    Publish(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// Stable error code carried in every error response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidArgument(_) | AppError::CurrencyMismatch { .. } => "INVALID_ARGUMENT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientFunds => "FAILED_PRECONDITION",
            AppError::DuplicateKey => "ALREADY_EXISTS",
            AppError::Publish(_) | AppError::Database(_) | AppError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_)
            | AppError::CurrencyMismatch { .. }
            | AppError::InsufficientFunds => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey => StatusCode::CONFLICT,
            AppError::Publish(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// True when a consumer should retry the message instead of routing it
    /// to the dead-letter topic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Internal(_) | AppError::Publish(_)
        )
    }

    /// Folds a unique-index violation into the distinct `DuplicateKey` kind;
    /// every other database error passes through as `Database`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::DuplicateKey;
            }
        }
        AppError::Database(err)
    }
}

/// Wire shape shared by the RPC facades and the gateway:
/// a stable code, a human-readable description, and an opaque error id
/// that links the response to server logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub description: String,
    pub id: Uuid,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            id: Uuid::new_v4(),
        }
    }
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        let description = match err {
            // Internal causes stay in the logs; clients get the opaque id.
            AppError::Publish(_) | AppError::Database(_) | AppError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };
        ErrorBody::new(err.code(), description)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody::from(&self);
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, error_id = %body.id, "request failed");
        }
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::invalid_argument("x").code(), "INVALID_ARGUMENT");
        assert_eq!(AppError::not_found("x").code(), "NOT_FOUND");
        assert_eq!(AppError::InsufficientFunds.code(), "FAILED_PRECONDITION");
        assert_eq!(AppError::DuplicateKey.code(), "ALREADY_EXISTS");
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).code(),
            "INTERNAL"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::invalid_argument("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientFunds.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::DuplicateKey.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Publish("broker down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(AppError::Internal(anyhow::anyhow!("boom")).is_retryable());
        assert!(!AppError::invalid_argument("x").is_retryable());
        assert!(!AppError::DuplicateKey.is_retryable());
    }

    #[test]
    fn test_internal_description_is_opaque() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let body = ErrorBody::from(&err);
        assert_eq!(body.code, "INTERNAL");
        assert_eq!(body.description, "An internal error occurred");
    }
}
