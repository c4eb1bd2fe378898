//! Core types for the fraud engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction submitted for scoring
///
/// Fields missing from the payload deserialize to empty values; rules treat
/// them as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Caller-assigned transaction ID
    #[serde(default)]
    pub transaction_id: Option<String>,

    /// Transaction amount (non-negative)
    #[serde(default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,

    /// Paying user
    #[serde(default)]
    pub user_id: String,

    /// Billing location reported by the merchant
    #[serde(default)]
    pub location: String,

    /// Device fingerprint
    #[serde(default)]
    pub device_id: String,

    /// Originating IP address
    #[serde(default)]
    pub ip_address: String,

    /// Seconds since the Unix epoch
    #[serde(default)]
    pub timestamp: f64,
}

impl Transaction {
    /// Create a transaction with the given ID and amount, other fields empty
    pub fn new(transaction_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            amount,
            ..Default::default()
        }
    }

    /// Transaction ID for log lines, `-` when absent
    pub fn id_or_placeholder(&self) -> &str {
        self.transaction_id.as_deref().unwrap_or("-")
    }
}

/// Outcome of a single rule evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct RuleVerdict {
    /// Whether the rule fired
    pub triggered: bool,

    /// Risk contributed when triggered (0-1)
    pub risk_weight: f64,

    /// Human-readable reason, present iff triggered
    pub reason: Option<String>,
}

impl RuleVerdict {
    /// Verdict for a rule that fired
    pub fn triggered(risk_weight: f64, reason: impl Into<String>) -> Self {
        Self {
            triggered: true,
            risk_weight,
            reason: Some(reason.into()),
        }
    }

    /// Verdict for a rule that did not fire
    pub fn clear() -> Self {
        Self {
            triggered: false,
            risk_weight: 0.0,
            reason: None,
        }
    }
}

/// Enforcement decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Let the transaction through
    Approved,
    /// Hold for manual review
    Review,
    /// Decline the transaction
    Block,
}

impl Action {
    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approved => "APPROVED",
            Action::Review => "REVIEW",
            Action::Block => "BLOCK",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring verdict returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Echo of the input transaction ID
    pub transaction_id: Option<String>,

    /// Combined risk score (0-100, two decimals)
    pub risk_score: f64,

    /// Enforcement decision
    pub action: Action,

    /// Reasons of triggered rules, in rule registration order
    pub factors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        assert_eq!(serde_json::to_string(&Action::Approved).unwrap(), "\"APPROVED\"");
        assert_eq!(serde_json::to_string(&Action::Block).unwrap(), "\"BLOCK\"");
        let action: Action = serde_json::from_str("\"REVIEW\"").unwrap();
        assert_eq!(action, Action::Review);
    }

    #[test]
    fn test_transaction_tolerates_missing_fields() {
        let txn: Transaction = serde_json::from_str(r#"{"amount": 1200.5}"#).unwrap();
        assert_eq!(txn.transaction_id, None);
        assert_eq!(txn.amount, Decimal::new(12005, 1));
        assert!(txn.user_id.is_empty());
        assert_eq!(txn.id_or_placeholder(), "-");
    }

    #[test]
    fn test_verdict_constructors() {
        let hit = RuleVerdict::triggered(0.4, "High Amount Transaction");
        assert!(hit.triggered);
        assert_eq!(hit.reason.as_deref(), Some("High Amount Transaction"));

        let miss = RuleVerdict::clear();
        assert!(!miss.triggered);
        assert!(miss.reason.is_none());
    }
}
