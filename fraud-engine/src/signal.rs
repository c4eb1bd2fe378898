//! Probabilistic signal sources
//!
//! The signal is the model half of the score: a fraud probability in [0,1]
//! computed outside the rule set. The engine only depends on [`SignalSource`].

use crate::circuit::CircuitBreaker;
use crate::{Error, Result, Transaction};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Supplier of the external fraud probability
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Fraud probability for the transaction, in [0,1]
    async fn signal(&self, txn: &Transaction) -> Result<f64>;
}

/// Uniform random signal, the stand-in for an untrained model
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSignal;

#[async_trait]
impl SignalSource for RandomSignal {
    async fn signal(&self, _txn: &Transaction) -> Result<f64> {
        Ok(rand::thread_rng().gen::<f64>())
    }
}

/// Constant signal
#[derive(Debug, Clone, Copy)]
pub struct FixedSignal(pub f64);

#[async_trait]
impl SignalSource for FixedSignal {
    async fn signal(&self, _txn: &Transaction) -> Result<f64> {
        Ok(self.0)
    }
}

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    transaction_id: Option<&'a str>,
    #[serde(with = "rust_decimal::serde::float")]
    amount: rust_decimal::Decimal,
    user_id: &'a str,
    location: &'a str,
    device_id: &'a str,
    ip_address: &'a str,
    timestamp: f64,
}

impl<'a> From<&'a Transaction> for ModelRequest<'a> {
    fn from(txn: &'a Transaction) -> Self {
        Self {
            transaction_id: txn.transaction_id.as_deref(),
            amount: txn.amount,
            user_id: &txn.user_id,
            location: &txn.location,
            device_id: &txn.device_id,
            ip_address: &txn.ip_address,
            timestamp: txn.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    probability: f64,
}

/// Model-serving endpoint reached over HTTP
///
/// POSTs the transaction as JSON and expects `{"probability": <f64>}` back.
/// Calls go through a circuit breaker so a dead scorer fails fast instead of
/// eating the request timeout on every transaction.
pub struct HttpSignalSource {
    endpoint: String,
    client: Client,
    breaker: Arc<CircuitBreaker>,
}

impl HttpSignalSource {
    /// Create source for `endpoint` with a per-request timeout
    ///
    /// Keep `timeout` below the engine's signal timeout, otherwise a hung
    /// request is cancelled before the breaker records the failure.
    pub fn new(endpoint: impl Into<String>, timeout: Duration, breaker: Arc<CircuitBreaker>) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            breaker,
        })
    }

    /// Breaker guarding this source
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        self.breaker.clone()
    }

    async fn fetch(&self, txn: &Transaction) -> Result<f64> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ModelRequest::from(txn))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::SignalUnavailable(format!(
                "model endpoint returned {}",
                response.status()
            )));
        }

        let body: ModelResponse = response.json().await?;
        debug!(
            "Model probability {:.4} for transaction {}",
            body.probability,
            txn.id_or_placeholder()
        );
        Ok(body.probability)
    }
}

#[async_trait]
impl SignalSource for HttpSignalSource {
    async fn signal(&self, txn: &Transaction) -> Result<f64> {
        self.breaker.call(|| self.fetch(txn)).await
    }
}
