//! Scoring engine facade

use crate::circuit::CircuitBreaker;
use crate::config::{EngineConfig, GeoMode, SignalMode, VelocityMode};
use crate::lookup::{GeoLookup, ProbabilisticFlag, SlidingWindowVelocity, StaticGeoTable, VelocityLookup};
use crate::rules::{AmountAnomalyRule, GeoMismatchRule, Rule, VelocityRule};
use crate::signal::{FixedSignal, HttpSignalSource, RandomSignal, SignalSource};
use crate::{ActionClassifier, Error, Result, ScoreCombiner, ScoreResult, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scores transactions
///
/// Built once and shared behind an `Arc`; scoring takes `&self` and keeps no
/// per-call state, so any number of requests may score concurrently.
pub struct ScoringEngine {
    rules: Vec<Arc<dyn Rule>>,
    signal: Arc<dyn SignalSource>,
    combiner: ScoreCombiner,
    classifier: ActionClassifier,
    neutral_signal: f64,
    signal_timeout: Duration,
    signal_breaker: Option<Arc<CircuitBreaker>>,
}

impl ScoringEngine {
    /// Start building an engine
    pub fn builder() -> ScoringEngineBuilder {
        ScoringEngineBuilder::default()
    }

    /// Build the engine described by `config`
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Self::builder()
            .combiner(config.combiner)
            .classifier(config.thresholds)
            .neutral_signal(config.signal.neutral_value)
            .signal_timeout(config.signal.timeout());

        let rules = &config.rules;
        if rules.amount.enabled {
            builder = builder.rule(AmountAnomalyRule::new(rules.amount.threshold, rules.amount.weight));
        }

        if rules.velocity.enabled {
            let lookup: Arc<dyn VelocityLookup> = match rules.velocity.mode {
                VelocityMode::Probabilistic => Arc::new(ProbabilisticFlag::new(rules.velocity.probability)?),
                VelocityMode::Window => Arc::new(SlidingWindowVelocity::new(rules.velocity.window.clone())?),
            };
            builder = builder.rule(VelocityRule::new(lookup, rules.velocity.weight));
        }

        if rules.geo.enabled {
            let lookup: Arc<dyn GeoLookup> = match rules.geo.mode {
                GeoMode::Probabilistic => Arc::new(ProbabilisticFlag::new(rules.geo.probability)?),
                GeoMode::Table => Arc::new(StaticGeoTable::from_entries(rules.geo.table.clone())),
            };
            builder = builder.rule(GeoMismatchRule::new(lookup, rules.geo.weight));
        }

        let signal = &config.signal;
        builder = match signal.mode {
            SignalMode::Random => builder.signal(RandomSignal),
            SignalMode::Fixed => builder.signal(FixedSignal(signal.fixed_value)),
            SignalMode::Http => {
                let endpoint = signal.endpoint.clone().ok_or_else(|| {
                    Error::InvalidConfig("signal.endpoint is required in http mode".to_string())
                })?;
                let breaker = Arc::new(CircuitBreaker::with_config(
                    "model_signal",
                    signal.failure_threshold,
                    signal.recovery_threshold,
                    signal.circuit_timeout_seconds,
                ));
                let source = HttpSignalSource::new(endpoint, signal.request_timeout(), breaker.clone())?;
                builder.signal(source).signal_breaker(breaker)
            }
        };

        builder.build()
    }

    /// Score a transaction
    ///
    /// Never fails: lookup errors clear the affected rule and signal errors
    /// fall back to the neutral signal.
    pub async fn score(&self, txn: &Transaction) -> ScoreResult {
        let mut total_rule_risk = 0.0;
        let mut factors = Vec::new();

        for rule in &self.rules {
            let verdict = rule.evaluate(txn).await;
            if !verdict.triggered {
                continue;
            }
            debug!(
                "Rule {} triggered for transaction {} (weight {})",
                rule.name(),
                txn.id_or_placeholder(),
                verdict.risk_weight
            );
            total_rule_risk += verdict.risk_weight;
            factors.push(verdict.reason.unwrap_or_else(|| rule.name().to_string()));
        }

        let signal = self.fetch_signal(txn).await;
        let risk_score = self.combiner.combine(total_rule_risk, signal);
        let action = self.classifier.classify(risk_score);

        info!(
            "Risk score calculated: {:.2} (action: {}) for transaction {}",
            risk_score,
            action,
            txn.id_or_placeholder()
        );

        ScoreResult {
            transaction_id: txn.transaction_id.clone(),
            risk_score,
            action,
            factors,
        }
    }

    /// Breaker guarding the model endpoint, when one is configured
    pub fn signal_breaker(&self) -> Option<Arc<CircuitBreaker>> {
        self.signal_breaker.clone()
    }

    /// Names of registered rules in evaluation order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    async fn fetch_signal(&self, txn: &Transaction) -> f64 {
        match tokio::time::timeout(self.signal_timeout, self.signal.signal(txn)).await {
            Ok(Ok(value)) if value.is_finite() => value,
            Ok(Ok(value)) => {
                warn!(
                    "Signal returned non-finite value {} for transaction {}, using neutral {}",
                    value,
                    txn.id_or_placeholder(),
                    self.neutral_signal
                );
                self.neutral_signal
            }
            Ok(Err(e)) => {
                warn!(
                    "Signal unavailable for transaction {}: {}, using neutral {}",
                    txn.id_or_placeholder(),
                    e,
                    self.neutral_signal
                );
                self.neutral_signal
            }
            Err(_) => {
                warn!(
                    "{} for transaction {}, using neutral {}",
                    Error::SignalTimeout(self.signal_timeout.as_millis() as u64),
                    txn.id_or_placeholder(),
                    self.neutral_signal
                );
                self.neutral_signal
            }
        }
    }
}

/// Builder for [`ScoringEngine`]
pub struct ScoringEngineBuilder {
    rules: Vec<Arc<dyn Rule>>,
    signal: Option<Arc<dyn SignalSource>>,
    combiner: ScoreCombiner,
    classifier: ActionClassifier,
    neutral_signal: f64,
    signal_timeout: Duration,
    signal_breaker: Option<Arc<CircuitBreaker>>,
}

impl Default for ScoringEngineBuilder {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            signal: None,
            combiner: ScoreCombiner::default(),
            classifier: ActionClassifier::default(),
            neutral_signal: 0.5,
            signal_timeout: Duration::from_millis(500),
            signal_breaker: None,
        }
    }
}

impl ScoringEngineBuilder {
    /// Append a rule; rules run in the order they are added
    pub fn rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Append an already shared rule
    pub fn shared_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the signal source
    pub fn signal(mut self, signal: impl SignalSource + 'static) -> Self {
        self.signal = Some(Arc::new(signal));
        self
    }

    /// Set the score combiner
    pub fn combiner(mut self, combiner: ScoreCombiner) -> Self {
        self.combiner = combiner;
        self
    }

    /// Set the action classifier
    pub fn classifier(mut self, classifier: ActionClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Signal used when the source fails or times out
    pub fn neutral_signal(mut self, value: f64) -> Self {
        self.neutral_signal = value;
        self
    }

    /// Upper bound on a single signal call
    pub fn signal_timeout(mut self, timeout: Duration) -> Self {
        self.signal_timeout = timeout;
        self
    }

    /// Expose the breaker guarding the signal source
    pub fn signal_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.signal_breaker = Some(breaker);
        self
    }

    /// Finish building
    pub fn build(self) -> Result<ScoringEngine> {
        let signal = self
            .signal
            .ok_or_else(|| Error::InvalidConfig("a signal source is required".to_string()))?;

        self.combiner.validate()?;
        self.classifier.validate()?;

        if !(0.0..=1.0).contains(&self.neutral_signal) {
            return Err(Error::InvalidConfig(format!(
                "neutral signal {} outside [0, 1]",
                self.neutral_signal
            )));
        }

        Ok(ScoringEngine {
            rules: self.rules,
            signal,
            combiner: self.combiner,
            classifier: self.classifier,
            neutral_signal: self.neutral_signal,
            signal_timeout: self.signal_timeout,
            signal_breaker: self.signal_breaker,
        })
    }
}
