//! Engine configuration
//!
//! One immutable description of the scoring policy: rule set, weights,
//! thresholds and where the model signal comes from. Every section has
//! defaults matching the baseline policy, so a partial TOML file is enough.

use crate::lookup::VelocityWindowConfig;
use crate::{ActionClassifier, Error, Result, ScoreCombiner};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Scoring engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rule / signal blend
    pub combiner: ScoreCombiner,

    /// Action thresholds on the 0-100 score
    pub thresholds: ActionClassifier,

    /// Rule set
    pub rules: RulesConfig,

    /// Model signal
    pub signal: SignalConfig,
}

/// Rule set configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Amount anomaly rule
    pub amount: AmountRuleConfig,
    /// Velocity rule
    pub velocity: VelocityRuleConfig,
    /// Geo mismatch rule
    pub geo: GeoRuleConfig,
}

/// Amount anomaly rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmountRuleConfig {
    /// Register the rule
    pub enabled: bool,
    /// Amounts strictly above this trigger
    #[serde(with = "rust_decimal::serde::float")]
    pub threshold: Decimal,
    /// Risk weight when triggered
    pub weight: f64,
}

impl Default for AmountRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: Decimal::from(1_000),
            weight: 0.4,
        }
    }
}

/// Where velocity verdicts come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityMode {
    /// Fixed-probability placeholder
    Probabilistic,
    /// In-memory sliding window per user
    Window,
}

/// Velocity rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityRuleConfig {
    /// Register the rule
    pub enabled: bool,
    /// Risk weight when triggered
    pub weight: f64,
    /// Lookup backing the rule
    pub mode: VelocityMode,
    /// Trigger probability in probabilistic mode
    pub probability: f64,
    /// Window settings in window mode
    pub window: VelocityWindowConfig,
}

impl Default for VelocityRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.6,
            mode: VelocityMode::Probabilistic,
            probability: 0.15,
            window: VelocityWindowConfig::default(),
        }
    }
}

/// Where geo verdicts come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoMode {
    /// Fixed-probability placeholder
    Probabilistic,
    /// Static IP prefix table
    Table,
}

/// Geo mismatch rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoRuleConfig {
    /// Register the rule
    pub enabled: bool,
    /// Risk weight when triggered
    pub weight: f64,
    /// Lookup backing the rule
    pub mode: GeoMode,
    /// Trigger probability in probabilistic mode
    pub probability: f64,
    /// IP prefix -> region, used in table mode
    pub table: BTreeMap<String, String>,
}

impl Default for GeoRuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 0.8,
            mode: GeoMode::Probabilistic,
            probability: 0.05,
            table: BTreeMap::new(),
        }
    }
}

/// Where the model signal comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// Uniform random stand-in
    Random,
    /// Constant value
    Fixed,
    /// External model endpoint
    Http,
}

/// Signal configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Signal source
    pub mode: SignalMode,
    /// Value returned in fixed mode
    pub fixed_value: f64,
    /// Model endpoint URL in http mode
    pub endpoint: Option<String>,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
    /// Value used when the signal fails or times out
    pub neutral_value: f64,
    /// Failures that open the breaker
    pub failure_threshold: u32,
    /// Half-open successes that close the breaker
    pub recovery_threshold: u32,
    /// Seconds the breaker stays open
    pub circuit_timeout_seconds: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            mode: SignalMode::Random,
            fixed_value: 0.5,
            endpoint: None,
            timeout_ms: 500,
            neutral_value: 0.5,
            failure_threshold: 5,
            recovery_threshold: 3,
            circuit_timeout_seconds: 30,
        }
    }
}

impl SignalConfig {
    /// Deadline for the whole signal fetch
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Timeout for a single model request
    ///
    /// Four fifths of [`timeout`](Self::timeout), so the request fails and is
    /// counted by the breaker before the fetch deadline cancels it.
    pub fn request_timeout(&self) -> Duration {
        (self.timeout() * 4 / 5).max(Duration::from_millis(1))
    }
}

impl EngineConfig {
    /// Parse from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check the configuration is internally consistent
    pub fn validate(&self) -> Result<()> {
        self.combiner.validate()?;
        self.thresholds.validate()?;

        let unit = |name: &str, value: f64| -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{} must lie in [0, 1], got {}", name, value)))
            }
        };

        unit("rules.amount.weight", self.rules.amount.weight)?;
        unit("rules.velocity.weight", self.rules.velocity.weight)?;
        unit("rules.velocity.probability", self.rules.velocity.probability)?;
        unit("rules.geo.weight", self.rules.geo.weight)?;
        unit("rules.geo.probability", self.rules.geo.probability)?;
        unit("signal.fixed_value", self.signal.fixed_value)?;
        unit("signal.neutral_value", self.signal.neutral_value)?;

        if self.rules.amount.threshold.is_sign_negative() {
            return Err(Error::InvalidConfig(
                "rules.amount.threshold must not be negative".to_string(),
            ));
        }

        if self.signal.mode == SignalMode::Http && self.signal.endpoint.is_none() {
            return Err(Error::InvalidConfig(
                "signal.endpoint is required in http mode".to_string(),
            ));
        }

        if self.signal.timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "signal.timeout_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_baseline_policy() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.combiner, ScoreCombiner::default());
        assert_eq!(config.thresholds.block_above, 80.0);
        assert_eq!(config.rules.amount.threshold, Decimal::from(1000));
        assert_eq!(config.rules.velocity.probability, 0.15);
        assert_eq!(config.rules.geo.probability, 0.05);
        assert_eq!(config.signal.mode, SignalMode::Random);
        assert_eq!(config.signal.neutral_value, 0.5);
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [thresholds]
            review_above = 40.0
            block_above = 70.0

            [rules.velocity]
            mode = "window"

            [rules.velocity.window]
            max_transactions = 5
            window_seconds = 600

            [rules.geo]
            mode = "table"

            [rules.geo.table]
            "81.2." = "GB"

            [signal]
            mode = "fixed"
            fixed_value = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholds.review_above, 40.0);
        assert_eq!(config.rules.velocity.mode, VelocityMode::Window);
        assert_eq!(config.rules.velocity.window.max_transactions, 5);
        assert_eq!(config.rules.geo.table.get("81.2.").map(String::as_str), Some("GB"));
        assert_eq!(config.signal.mode, SignalMode::Fixed);
        // Untouched sections keep their defaults
        assert_eq!(config.rules.amount, AmountRuleConfig::default());
    }

    #[test]
    fn test_http_mode_requires_endpoint() {
        let result = EngineConfig::from_toml_str("[signal]\nmode = \"http\"\n");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_request_timeout_fires_before_fetch_deadline() {
        let mut signal = SignalConfig::default();
        assert_eq!(signal.timeout(), Duration::from_millis(500));
        assert_eq!(signal.request_timeout(), Duration::from_millis(400));

        signal.timeout_ms = 1;
        assert_eq!(signal.request_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut config = EngineConfig::default();
        config.rules.geo.probability = 2.0;
        assert!(config.validate().is_err());
    }
}
