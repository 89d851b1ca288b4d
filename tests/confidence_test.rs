use multibrain::confidence::*;
use multibrain::*;
use std::collections::BTreeMap;

fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[test]
fn test_empty_scores_default() {
    assert_eq!(ConfidenceAggregator::aggregate(&BTreeMap::new()), 0.3);
    assert_eq!(ConfidenceAggregator::try_aggregate(&BTreeMap::new()), Ok(0.3));
}

#[test]
fn test_uniform_scores_with_sme_split() {
    let s = scores(&[
        ("intent", 1.0),
        ("technical", 1.0),
        ("sme_a", 1.0),
        ("sme_b", 1.0),
    ]);
    assert!((ConfidenceAggregator::aggregate(&s) - 1.0).abs() < 1e-12);
}

#[test]
fn test_weighted_average() {
    let s = scores(&[
        ("intent", 0.9),
        ("technical", 0.85),
        ("sme_networking", 0.8),
        ("sme_linux", 0.8),
    ]);
    assert!((ConfidenceAggregator::aggregate(&s) - 0.85).abs() < 1e-9);
}

#[test]
fn test_sme_budget_split_evenly() {
    assert!((ConfidenceAggregator::weight_for("sme_a", 1) - 0.3).abs() < 1e-12);
    assert!((ConfidenceAggregator::weight_for("sme_a", 3) - 0.1).abs() < 1e-12);
    assert_eq!(ConfidenceAggregator::weight_for("intent", 3), 0.3);
    assert_eq!(ConfidenceAggregator::weight_for("technical", 0), 0.4);
    assert_eq!(ConfidenceAggregator::weight_for("validator", 2), 0.1);
}

#[test]
fn test_single_expert_takes_whole_budget() {
    let s = scores(&[("intent", 0.5), ("technical", 0.5), ("sme_linux", 1.0)]);
    let expected = 0.5 * 0.3 + 0.5 * 0.4 + 1.0 * 0.3;
    assert!((ConfidenceAggregator::aggregate(&s) - expected).abs() < 1e-9);
}

#[test]
fn test_no_sme_scores_uses_fixed_weights_only() {
    let s = scores(&[("intent", 1.0), ("technical", 0.5)]);
    let expected = (0.3 + 0.2) / 0.7;
    assert!((ConfidenceAggregator::aggregate(&s) - expected).abs() < 1e-9);
}

#[test]
fn test_unknown_key_weight() {
    let s = scores(&[("intent", 1.0), ("reviewer", 0.0)]);
    let expected = 0.3 / 0.4;
    assert!((ConfidenceAggregator::aggregate(&s) - expected).abs() < 1e-9);
}

#[test]
fn test_aggregate_stays_in_bounds() {
    let values = [0.0, 0.01, 0.25, 0.5, 0.75, 0.99, 1.0];
    for &a in &values {
        for &b in &values {
            for &c in &values {
                let s = scores(&[("intent", a), ("technical", b), ("sme_x", c), ("other", a)]);
                let result = ConfidenceAggregator::aggregate(&s);
                assert!((0.0..=1.0).contains(&result), "{} out of bounds", result);
            }
        }
    }
}

#[test]
fn test_invalid_scores_fall_back() {
    let s = scores(&[("intent", f64::NAN), ("technical", 0.9)]);
    assert_eq!(
        ConfidenceAggregator::try_aggregate(&s),
        Err(ConfidenceError::NonFinite {
            key: "intent".to_string()
        })
    );
    assert_eq!(ConfidenceAggregator::aggregate(&s), DEFAULT_CONFIDENCE);

    let s = scores(&[("technical", 1.5)]);
    assert!(matches!(
        ConfidenceAggregator::try_aggregate(&s),
        Err(ConfidenceError::OutOfRange { .. })
    ));
    assert_eq!(ConfidenceAggregator::aggregate(&s), DEFAULT_CONFIDENCE);
}

#[test]
fn test_aggregate_is_repeatable() {
    let s = scores(&[("intent", 0.42), ("technical", 0.77), ("sme_db", 0.13)]);
    assert_eq!(
        ConfidenceAggregator::aggregate(&s),
        ConfidenceAggregator::aggregate(&s)
    );
    assert_eq!(
        StrategySelector::select_strategy(0.61),
        StrategySelector::select_strategy(0.61)
    );
}

#[test]
fn test_strategy_boundaries() {
    assert_eq!(StrategySelector::select_strategy(0.8), ExecutionStrategy::Parallel);
    assert_eq!(StrategySelector::select_strategy(0.79999), ExecutionStrategy::Sequential);
    assert_eq!(StrategySelector::select_strategy(0.6), ExecutionStrategy::Sequential);
    assert_eq!(StrategySelector::select_strategy(0.59999), ExecutionStrategy::Phased);
    assert_eq!(StrategySelector::select_strategy(0.4), ExecutionStrategy::Phased);
    assert_eq!(StrategySelector::select_strategy(0.39999), ExecutionStrategy::ManualReview);
    assert_eq!(StrategySelector::select_strategy(0.0), ExecutionStrategy::ManualReview);
    assert_eq!(StrategySelector::select_strategy(1.0), ExecutionStrategy::Parallel);
}

#[test]
fn test_strategy_fallback_on_nan() {
    assert_eq!(
        StrategySelector::try_select_strategy(f64::NAN),
        Err(ConfidenceError::NotANumber)
    );
    assert_eq!(StrategySelector::select_strategy(f64::NAN), ExecutionStrategy::ManualReview);
}

#[test]
fn test_sanitize_confidence() {
    assert_eq!(sanitize_confidence(0.4), (0.4, false));
    assert_eq!(sanitize_confidence(f64::NAN), (0.0, true));
    assert_eq!(sanitize_confidence(f64::INFINITY), (0.0, true));
    assert_eq!(sanitize_confidence(-0.2), (0.0, true));
    assert_eq!(sanitize_confidence(1.2), (1.0, true));
}

fn expert(domain: &str, high: &[&str], criteria: &[&str]) -> DomainExpertResult {
    DomainExpertResult {
        domain: domain.to_string(),
        confidence: 0.8,
        risk_assessment: RiskAssessment {
            high_risk: high.iter().map(|s| s.to_string()).collect(),
            medium_risk: vec![format!("{} medium", domain)],
            low_risk: vec![],
            mitigation_strategies: vec!["rollback".to_string()],
        },
        validation_criteria: criteria.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn test_risk_merge_concatenates_in_order() {
    let a = expert("networking", &["packet loss"], &[]);
    let b = expert("linux", &["kernel panic", "packet loss"], &[]);

    let merged = merge_risk_assessments([&a, &b]);

    assert_eq!(merged.high_risk, vec!["packet loss", "kernel panic", "packet loss"]);
    assert_eq!(merged.medium_risk, vec!["networking medium", "linux medium"]);
    assert!(merged.low_risk.is_empty());
    // duplicates are kept
    assert_eq!(merged.mitigation_strategies, vec!["rollback", "rollback"]);
}

#[test]
fn test_validation_merge_is_a_set() {
    let a = expert("networking", &[], &["ping succeeds", "port open"]);
    let b = expert("linux", &[], &["port open", "load below 2"]);

    let merged = merge_validation_criteria([&a, &b]);

    assert_eq!(merged.len(), 3);
    assert!(merged.contains("ping succeeds"));
    assert!(merged.contains("port open"));
    assert!(merged.contains("load below 2"));
}
