//! Score combination

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Blends rule risk and the model signal into a 0-100 score
///
/// `raw = rule_risk * rule_weight + signal * signal_weight`, clamped to
/// [0, 1], scaled by 100 and rounded to two decimals. Rounding is
/// half-away-from-zero (`f64::round`), so 50.125 becomes 50.13.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreCombiner {
    /// Weight of the summed rule risk
    pub rule_weight: f64,
    /// Weight of the model signal
    pub signal_weight: f64,
}

impl Default for ScoreCombiner {
    fn default() -> Self {
        Self {
            rule_weight: 0.4,
            signal_weight: 0.6,
        }
    }
}

impl ScoreCombiner {
    /// Create combiner with explicit weights
    pub fn new(rule_weight: f64, signal_weight: f64) -> Result<Self> {
        let combiner = Self {
            rule_weight,
            signal_weight,
        };
        combiner.validate()?;
        Ok(combiner)
    }

    /// Check weights are finite and non-negative
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("rule_weight", self.rule_weight), ("signal_weight", self.signal_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }

    /// Combine summed rule risk and signal into a 0-100 score
    pub fn combine(&self, total_rule_risk: f64, signal: f64) -> f64 {
        let raw = total_rule_risk * self.rule_weight + signal * self.signal_weight;
        let clamped = raw.clamp(0.0, 1.0);
        round_to_cents(clamped * 100.0)
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_rule_only_zero_signal() {
        let combiner = ScoreCombiner::default();
        assert_eq!(combiner.combine(0.4, 0.0), 16.0);
    }

    #[test]
    fn test_combined_risk_is_clamped() {
        let combiner = ScoreCombiner::default();
        // amount + geo + velocity with a certain signal
        assert_eq!(combiner.combine(1.8, 1.0), 100.0);
        assert_eq!(combiner.combine(1.2, 1.0), 100.0);
        assert_eq!(combiner.combine(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_two_decimal_rounding() {
        let combiner = ScoreCombiner::default();
        // 0.6 * 0.123456 = 0.0740736 -> 7.41
        assert_eq!(combiner.combine(0.0, 0.123456), 7.41);
        assert_eq!(round_to_cents(50.125), 50.13);
    }

    #[test]
    fn test_combine_is_idempotent() {
        let combiner = ScoreCombiner::default();
        let first = combiner.combine(0.6, 0.42);
        let second = combiner.combine(0.6, 0.42);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_negative_weight() {
        assert!(ScoreCombiner::new(-0.1, 0.6).is_err());
        assert!(ScoreCombiner::new(0.4, f64::NAN).is_err());
        assert!(ScoreCombiner::new(0.5, 0.5).is_ok());
    }
}
