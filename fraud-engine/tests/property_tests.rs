//! Property-based tests for scoring invariants
//!
//! - Score bounds: 0 <= risk_score <= 100 for any rule/signal mix
//! - Action is a pure function of risk_score
//! - One factor per triggered rule, in registration order
//! - Amount rule depends only on the amount

use fraud_engine::lookup::ProbabilisticFlag;
use fraud_engine::rules::{
    AmountAnomalyRule, GeoMismatchRule, Rule, VelocityRule, GEO_MISMATCH_REASON,
    HIGH_AMOUNT_REASON, HIGH_VELOCITY_REASON,
};
use fraud_engine::signal::FixedSignal;
use fraud_engine::{Action, ActionClassifier, ScoreCombiner, ScoringEngine, Transaction};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Strategy for generating amounts (cents up to $1M)
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0u64..100_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
}

/// Strategy for generating transactions
fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (
        "[a-z0-9]{0,12}",
        amount_strategy(),
        "[a-z]{0,8}",
        "[A-Z]{2}",
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        0u32..2_000_000_000u32,
    )
        .prop_map(|(id, amount, user_id, location, ip_address, ts)| Transaction {
            transaction_id: if id.is_empty() { None } else { Some(id) },
            amount,
            user_id,
            location,
            device_id: "device".to_string(),
            ip_address,
            timestamp: ts as f64,
        })
}

fn expected_action(score: f64) -> Action {
    if score > 80.0 {
        Action::Block
    } else if score > 50.0 {
        Action::Review
    } else {
        Action::Approved
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_combined_score_is_bounded(rule_risk in 0.0f64..5.0, signal in 0.0f64..=1.0) {
        let score = ScoreCombiner::default().combine(rule_risk, signal);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn prop_score_has_two_decimals(rule_risk in 0.0f64..2.0, signal in 0.0f64..=1.0) {
        let score = ScoreCombiner::default().combine(rule_risk, signal);
        let cents = score * 100.0;
        prop_assert!((cents - cents.round()).abs() < 1e-6);
    }

    #[test]
    fn prop_action_is_function_of_score(score in 0.0f64..=100.0) {
        let classifier = ActionClassifier::default();
        prop_assert_eq!(classifier.classify(score), expected_action(score));
        prop_assert_eq!(classifier.classify(score), classifier.classify(score));
    }

    #[test]
    fn prop_amount_rule_depends_only_on_amount(txn in transaction_strategy()) {
        let rule = AmountAnomalyRule::default();
        let verdict = runtime().block_on(rule.evaluate(&txn));
        prop_assert_eq!(verdict.triggered, txn.amount > Decimal::from(1000));
    }

    #[test]
    fn prop_engine_result_invariants(
        txn in transaction_strategy(),
        velocity in any::<bool>(),
        geo in any::<bool>(),
        signal in 0.0f64..=1.0,
    ) {
        let flag = |on: bool| Arc::new(ProbabilisticFlag::new(if on { 1.0 } else { 0.0 }).unwrap());
        let engine = ScoringEngine::builder()
            .rule(AmountAnomalyRule::default())
            .rule(VelocityRule::new(flag(velocity), VelocityRule::DEFAULT_WEIGHT))
            .rule(GeoMismatchRule::new(flag(geo), GeoMismatchRule::DEFAULT_WEIGHT))
            .signal(FixedSignal(signal))
            .build()
            .unwrap();

        let result = runtime().block_on(engine.score(&txn));

        prop_assert!((0.0..=100.0).contains(&result.risk_score));
        prop_assert_eq!(result.action, expected_action(result.risk_score));
        prop_assert_eq!(&result.transaction_id, &txn.transaction_id);

        let mut expected = Vec::new();
        if txn.amount > Decimal::from(1000) {
            expected.push(HIGH_AMOUNT_REASON.to_string());
        }
        if velocity {
            expected.push(HIGH_VELOCITY_REASON.to_string());
        }
        if geo {
            expected.push(GEO_MISMATCH_REASON.to_string());
        }
        prop_assert_eq!(result.factors, expected);
    }
}
