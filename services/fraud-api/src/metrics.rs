use fraud_engine::ScoreResult;
use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    // Business metrics - fraud scoring
    pub static ref TRANSACTIONS_SCORED: IntCounterVec = IntCounterVec::new(
        Opts::new("fraud_transactions_scored_total", "Transactions scored by action"),
        &["action"]
    ).expect("metric can be created");

    pub static ref RISK_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("fraud_risk_score", "Distribution of risk scores")
            .buckets(vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0])
    ).expect("metric can be created");

    pub static ref RULE_TRIGGERS: IntCounterVec = IntCounterVec::new(
        Opts::new("fraud_rule_triggers_total", "Triggered rules by reason"),
        &["reason"]
    ).expect("metric can be created");

    pub static ref SCORING_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("fraud_scoring_duration_seconds", "Time spent scoring a transaction")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).expect("metric can be created");

    // Transaction log metrics
    pub static ref LOG_FALLBACKS: IntCounter = IntCounter::new(
        "fraud_log_fallbacks_total",
        "Transaction log records written to the fallback sink"
    ).expect("metric can be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        register_metrics(&registry).expect("metrics can be registered");
        registry
    };
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(TRANSACTIONS_SCORED.clone()))?;
    registry.register(Box::new(RISK_SCORE.clone()))?;
    registry.register(Box::new(RULE_TRIGGERS.clone()))?;
    registry.register(Box::new(SCORING_DURATION.clone()))?;
    registry.register(Box::new(LOG_FALLBACKS.clone()))?;
    Ok(())
}

/// Count a scoring outcome
pub fn record_score(result: &ScoreResult) {
    TRANSACTIONS_SCORED
        .with_label_values(&[result.action.as_str()])
        .inc();
    RISK_SCORE.observe(result.risk_score);
    for reason in &result.factors {
        RULE_TRIGGERS.with_label_values(&[reason.as_str()]).inc();
    }
}

/// Generate metrics output in Prometheus text format
pub fn metrics_handler() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraud_engine::Action;

    #[test]
    fn test_metrics_registration() {
        let registry = Registry::new();
        assert!(register_metrics(&registry).is_ok());
    }

    #[test]
    fn test_record_score_is_exported() {
        record_score(&ScoreResult {
            transaction_id: Some("tx-metrics".to_string()),
            risk_score: 16.0,
            action: Action::Approved,
            factors: vec!["High Amount Transaction".to_string()],
        });

        let output = metrics_handler().unwrap();
        assert!(output.contains("fraud_transactions_scored_total"));
        assert!(output.contains("action=\"APPROVED\""));
        assert!(output.contains("fraud_rule_triggers_total"));
    }
}
