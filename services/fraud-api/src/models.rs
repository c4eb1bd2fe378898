use fraud_engine::Transaction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// ===== Scoring Request =====
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransactionRequest {
    #[validate(length(min = 1, max = 128))]
    pub transaction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    pub location: String,
    pub device_id: String,
    pub ip_address: String,
    #[validate(range(min = 0.0))]
    pub timestamp: f64,
}

fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

impl From<TransactionRequest> for Transaction {
    fn from(req: TransactionRequest) -> Self {
        Transaction {
            transaction_id: Some(req.transaction_id),
            amount: req.amount,
            user_id: req.user_id,
            location: req.location,
            device_id: req.device_id,
            ip_address: req.ip_address,
            timestamp: req.timestamp,
        }
    }
}

// ===== Service Status =====
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub model_version: String,
}

// ===== Health Check =====
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

// ===== Error Response =====
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: &str) -> TransactionRequest {
        serde_json::from_str(&format!(
            r#"{{
                "transaction_id": "tx-1",
                "amount": {},
                "user_id": "user-1",
                "location": "US",
                "device_id": "dev-1",
                "ip_address": "10.0.0.1",
                "timestamp": 1700000000
            }}"#,
            amount
        ))
        .unwrap()
    }

    #[test]
    fn test_valid_request() {
        let req = request("1200");
        assert!(req.validate().is_ok());

        let txn = Transaction::from(req);
        assert_eq!(txn.transaction_id.as_deref(), Some("tx-1"));
        assert_eq!(txn.amount, Decimal::from(1200));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(request("-5.5").validate().is_err());
    }

    #[test]
    fn test_empty_ids_rejected() {
        let mut req = request("10");
        req.transaction_id.clear();
        assert!(req.validate().is_err());

        let mut req = request("10");
        req.user_id.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_missing_field_fails_to_parse() {
        let result: Result<TransactionRequest, _> =
            serde_json::from_str(r#"{"transaction_id": "tx", "amount": 10}"#);
        assert!(result.is_err());
    }
}
