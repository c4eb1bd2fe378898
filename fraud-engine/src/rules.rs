//! Fraud rules
//!
//! Each rule looks at one pattern of the transaction and reports a verdict.
//! Rules are independent: none sees another's outcome, and registration order
//! only decides the order of reasons in the final result.

use crate::lookup::{GeoLookup, VelocityLookup};
use crate::{RuleVerdict, Transaction};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

/// Reason reported by [`AmountAnomalyRule`]
pub const HIGH_AMOUNT_REASON: &str = "High Amount Transaction";

/// Reason reported by [`VelocityRule`]
pub const HIGH_VELOCITY_REASON: &str = "High Velocity user";

/// Reason reported by [`GeoMismatchRule`]
pub const GEO_MISMATCH_REASON: &str = "IP vs Billing Geo Mismatch";

/// A single fraud rule
#[async_trait]
pub trait Rule: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Evaluate the rule against a transaction
    async fn evaluate(&self, txn: &Transaction) -> RuleVerdict;
}

// ===== Amount anomaly =====

/// Flags transactions above a fixed amount
#[derive(Debug, Clone)]
pub struct AmountAnomalyRule {
    threshold: Decimal,
    weight: f64,
}

impl AmountAnomalyRule {
    /// Default threshold ($1000)
    pub const DEFAULT_THRESHOLD: i64 = 1_000;
    /// Default risk weight
    pub const DEFAULT_WEIGHT: f64 = 0.4;

    /// Create rule with explicit threshold and weight
    pub fn new(threshold: Decimal, weight: f64) -> Self {
        Self { threshold, weight }
    }
}

impl Default for AmountAnomalyRule {
    fn default() -> Self {
        Self::new(Decimal::from(Self::DEFAULT_THRESHOLD), Self::DEFAULT_WEIGHT)
    }
}

#[async_trait]
impl Rule for AmountAnomalyRule {
    fn name(&self) -> &str {
        "amount_anomaly"
    }

    async fn evaluate(&self, txn: &Transaction) -> RuleVerdict {
        if txn.amount > self.threshold {
            RuleVerdict::triggered(self.weight, HIGH_AMOUNT_REASON)
        } else {
            RuleVerdict::clear()
        }
    }
}

// ===== Velocity =====

/// Flags users transacting faster than their velocity lookup allows
pub struct VelocityRule {
    lookup: Arc<dyn VelocityLookup>,
    weight: f64,
}

impl VelocityRule {
    /// Default risk weight
    pub const DEFAULT_WEIGHT: f64 = 0.6;

    /// Create rule backed by `lookup`
    pub fn new(lookup: Arc<dyn VelocityLookup>, weight: f64) -> Self {
        Self { lookup, weight }
    }
}

#[async_trait]
impl Rule for VelocityRule {
    fn name(&self) -> &str {
        "velocity"
    }

    async fn evaluate(&self, txn: &Transaction) -> RuleVerdict {
        match self.lookup.is_high_velocity(txn).await {
            Ok(true) => RuleVerdict::triggered(self.weight, HIGH_VELOCITY_REASON),
            Ok(false) => RuleVerdict::clear(),
            Err(e) => {
                warn!(
                    "Velocity lookup failed for transaction {}: {}",
                    txn.id_or_placeholder(),
                    e
                );
                RuleVerdict::clear()
            }
        }
    }
}

// ===== Geo mismatch =====

/// Flags transactions whose IP region disagrees with the billing location
pub struct GeoMismatchRule {
    lookup: Arc<dyn GeoLookup>,
    weight: f64,
}

impl GeoMismatchRule {
    /// Default risk weight
    pub const DEFAULT_WEIGHT: f64 = 0.8;

    /// Create rule backed by `lookup`
    pub fn new(lookup: Arc<dyn GeoLookup>, weight: f64) -> Self {
        Self { lookup, weight }
    }
}

#[async_trait]
impl Rule for GeoMismatchRule {
    fn name(&self) -> &str {
        "geo_mismatch"
    }

    async fn evaluate(&self, txn: &Transaction) -> RuleVerdict {
        match self.lookup.is_geo_mismatch(txn).await {
            Ok(true) => RuleVerdict::triggered(self.weight, GEO_MISMATCH_REASON),
            Ok(false) => RuleVerdict::clear(),
            Err(e) => {
                warn!(
                    "Geo lookup failed for transaction {}: {}",
                    txn.id_or_placeholder(),
                    e
                );
                RuleVerdict::clear()
            }
        }
    }
}
