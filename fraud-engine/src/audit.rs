//! Transaction log
//!
//! After scoring, the caller hands a [`TransactionLogRecord`] to a
//! [`TransactionLog`]. Logging never fails from the caller's point of view:
//! durable stores sit behind [`FallbackLog`], which falls back to a structured
//! log line when the store rejects the record.

use crate::{Action, Result, ScoreResult, Transaction};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Record persisted for every scored transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogRecord {
    /// Transaction ID, if the caller sent one
    pub transaction_id: Option<String>,
    /// Paying user
    pub user_id: String,
    /// Transaction amount
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Combined risk score (0-100)
    pub risk_score: f64,
    /// Enforcement decision
    pub action: Action,
    /// Seconds since the Unix epoch, as submitted
    pub timestamp: f64,
}

impl TransactionLogRecord {
    /// Build the record for a scored transaction
    pub fn new(txn: &Transaction, result: &ScoreResult) -> Self {
        Self {
            transaction_id: result.transaction_id.clone(),
            user_id: txn.user_id.clone(),
            amount: txn.amount,
            risk_score: result.risk_score,
            action: result.action,
            timestamp: txn.timestamp,
        }
    }
}

/// Durable store that may fail
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Persist a record
    async fn store(&self, record: &TransactionLogRecord) -> Result<()>;
}

/// Sink for scored transactions; never reports failure to the caller
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Accept a record
    async fn record(&self, record: &TransactionLogRecord);
}

/// Writes records as structured log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

#[async_trait]
impl TransactionLog for TracingLog {
    async fn record(&self, record: &TransactionLogRecord) {
        info!(
            target: "transaction_log",
            transaction_id = record.transaction_id.as_deref().unwrap_or("-"),
            user_id = %record.user_id,
            amount = %record.amount,
            risk_score = record.risk_score,
            action = record.action.as_str(),
            timestamp = record.timestamp,
            "Transaction logged"
        );
    }
}

/// Primary store with a fallback log
pub struct FallbackLog<S, F = TracingLog> {
    primary: S,
    fallback: F,
}

impl<S: TransactionStore> FallbackLog<S, TracingLog> {
    /// Fall back to log lines when `primary` fails
    pub fn new(primary: S) -> Self {
        Self {
            primary,
            fallback: TracingLog,
        }
    }
}

impl<S: TransactionStore, F: TransactionLog> FallbackLog<S, F> {
    /// Fall back to a custom log
    pub fn with_fallback(primary: S, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<S: TransactionStore, F: TransactionLog> TransactionLog for FallbackLog<S, F> {
    async fn record(&self, record: &TransactionLogRecord) {
        if let Err(e) = self.primary.store(record).await {
            warn!(
                "Failed to store transaction {}: {}, writing to fallback log",
                record.transaction_id.as_deref().unwrap_or("-"),
                e
            );
            self.fallback.record(record).await;
        }
    }
}
