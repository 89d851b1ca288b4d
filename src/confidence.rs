//! Pure scoring steps: weighted confidence aggregation, strategy selection
//! and the risk/validation rollup over domain-expert results.

use crate::error::ConfidenceError;
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet};

pub mod weights {
    pub const INTENT: f64 = 0.30;
    pub const TECHNICAL: f64 = 0.40;
    /// Split evenly across however many `sme_` scores are present.
    pub const SME_BUDGET: f64 = 0.30;
    pub const UNKNOWN: f64 = 0.10;
}

/// Used for empty input and whenever aggregation cannot produce a number.
pub const DEFAULT_CONFIDENCE: f64 = 0.3;
pub const FALLBACK_STRATEGY: ExecutionStrategy = ExecutionStrategy::ManualReview;

pub const PARALLEL_THRESHOLD: f64 = 0.8;
pub const SEQUENTIAL_THRESHOLD: f64 = 0.6;
pub const PHASED_THRESHOLD: f64 = 0.4;

const SME_PREFIX: &str = "sme_";

pub struct ConfidenceAggregator;

impl ConfidenceAggregator {
    pub fn weight_for(key: &str, sme_count: usize) -> f64 {
        match key {
            "intent" => weights::INTENT,
            "technical" => weights::TECHNICAL,
            k if k.starts_with(SME_PREFIX) && sme_count > 0 => {
                weights::SME_BUDGET / sme_count as f64
            }
            _ => weights::UNKNOWN,
        }
    }

    pub fn try_aggregate(scores: &BTreeMap<String, f64>) -> Result<f64, ConfidenceError> {
        if scores.is_empty() {
            return Ok(DEFAULT_CONFIDENCE);
        }

        let sme_count = scores.keys().filter(|k| k.starts_with(SME_PREFIX)).count();

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for (key, &score) in scores {
            if !score.is_finite() {
                return Err(ConfidenceError::NonFinite { key: key.clone() });
            }
            if !(0.0..=1.0).contains(&score) {
                return Err(ConfidenceError::OutOfRange {
                    key: key.clone(),
                    value: score,
                });
            }
            let weight = Self::weight_for(key, sme_count);
            weighted_sum += score * weight;
            total_weight += weight;
        }

        if !(total_weight.is_finite() && total_weight > 0.0) {
            return Err(ConfidenceError::InvalidWeight(total_weight));
        }

        // rounding can land a hair outside [0, 1]
        Ok((weighted_sum / total_weight).clamp(0.0, 1.0))
    }

    pub fn aggregate(scores: &BTreeMap<String, f64>) -> f64 {
        Self::try_aggregate(scores).unwrap_or(DEFAULT_CONFIDENCE)
    }
}

pub struct StrategySelector;

impl StrategySelector {
    /// Half-open bands, lower bound inclusive.
    pub fn try_select_strategy(aggregate: f64) -> Result<ExecutionStrategy, ConfidenceError> {
        if aggregate.is_nan() {
            return Err(ConfidenceError::NotANumber);
        }

        let strategy = if aggregate >= PARALLEL_THRESHOLD {
            ExecutionStrategy::Parallel
        } else if aggregate >= SEQUENTIAL_THRESHOLD {
            ExecutionStrategy::Sequential
        } else if aggregate >= PHASED_THRESHOLD {
            ExecutionStrategy::Phased
        } else {
            ExecutionStrategy::ManualReview
        };

        Ok(strategy)
    }

    pub fn select_strategy(aggregate: f64) -> ExecutionStrategy {
        Self::try_select_strategy(aggregate).unwrap_or(FALLBACK_STRATEGY)
    }
}

/// Concatenates every expert's risk buckets in the order given.
pub fn merge_risk_assessments<'a, I>(results: I) -> RiskAssessment
where
    I: IntoIterator<Item = &'a DomainExpertResult>,
{
    let mut merged = RiskAssessment::default();
    for result in results {
        merged.extend_from(&result.risk_assessment);
    }
    merged
}

pub fn merge_validation_criteria<'a, I>(results: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a DomainExpertResult>,
{
    results
        .into_iter()
        .flat_map(|r| r.validation_criteria.iter().cloned())
        .collect()
}

/// Returns the usable confidence and whether it had to be altered.
pub fn sanitize_confidence(value: f64) -> (f64, bool) {
    if !value.is_finite() {
        (0.0, true)
    } else if !(0.0..=1.0).contains(&value) {
        (value.clamp(0.0, 1.0), true)
    } else {
        (value, false)
    }
}
