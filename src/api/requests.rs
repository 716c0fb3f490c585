use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Monetary amount as REST clients send it: a decimal string plus currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountBody {
    pub value: String,
    pub currency_code: String,
}

/// Body of `POST /accounts/{accountId}/transfers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransferBody {
    pub recipient_id: String,
    pub amount: AmountBody,
}

/// Body of `POST /accounts/{accountId}/topup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpBody {
    pub amount: AmountBody,
}

/// Query string of `GET /accounts/{accountId}/operations`.
///
/// Values arrive as raw strings so a malformed `limit` or `afterId` maps to
/// the REST error shape instead of the framework's default rejection.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OperationsQuery {
    pub limit: Option<String>,
    #[serde(rename = "afterId")]
    pub after_id: Option<String>,
}

impl OperationsQuery {
    pub fn parsed_limit(&self) -> Result<i64> {
        match &self.limit {
            None => Ok(0),
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::invalid_argument("limit must be an integer")),
        }
    }

    pub fn parsed_after(&self) -> Result<Option<uuid::Uuid>> {
        match &self.after_id {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::invalid_argument("afterId must be a UUID")),
        }
    }
}

/// Parses a UUID from a path or body value, mapping failure to the REST
/// error shape.
pub fn parse_uuid(value: &str, field: &str) -> Result<uuid::Uuid> {
    value
        .parse()
        .map_err(|_| AppError::invalid_argument(format!("{field} must be a UUID")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(parse_uuid("not-a-uuid", "accountId").is_err());
        assert!(parse_uuid("", "accountId").is_err());
        assert!(parse_uuid("11111111-1111-1111-1111-111111111111", "accountId").is_ok());
    }

    #[test]
    fn test_operations_query_limit_parsing() {
        let query = OperationsQuery {
            limit: Some("25".to_string()),
            after_id: None,
        };
        assert_eq!(query.parsed_limit().unwrap(), 25);

        let query = OperationsQuery {
            limit: Some("abc".to_string()),
            after_id: None,
        };
        assert!(query.parsed_limit().is_err());

        assert_eq!(OperationsQuery::default().parsed_limit().unwrap(), 0);
    }

    #[test]
    fn test_operations_query_after_parsing() {
        let query = OperationsQuery {
            limit: None,
            after_id: Some("22222222-2222-2222-2222-222222222222".to_string()),
        };
        assert!(query.parsed_after().unwrap().is_some());

        let query = OperationsQuery {
            limit: None,
            after_id: Some("nope".to_string()),
        };
        assert!(query.parsed_after().is_err());
    }
}
